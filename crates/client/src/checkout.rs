//! Checkout step progression.
//!
//! A linear three-state machine: `address -> payment -> review`. Each step
//! renders only if its prerequisite data exists in [`CheckoutState`];
//! otherwise the guard redirects to the first unmet step. The terminal
//! success and cancel pages sit outside step progression (the backend
//! redirects to them) and are gated on authentication alone.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use marketfront_core::{AddressId, OrderId};

use crate::auth::AuthStatus;

/// Steps of the checkout flow, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    Address,
    Payment,
    Review,
}

impl CheckoutStep {
    /// Route path for this step.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Address => "/checkout/address",
            Self::Payment => "/checkout/payment",
            Self::Review => "/checkout/review",
        }
    }
}

/// Payment methods the storefront offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Paypal,
    CashOnDelivery,
}

/// Everything needed to place the order, assembled by the review step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    /// Selected shipping address.
    pub address: AddressId,
    /// Chosen payment method.
    pub payment_method: PaymentMethod,
}

/// Decision from the step guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDecision {
    /// The step's prerequisites are met; render it.
    Render,
    /// Redirect to the first unmet step.
    Redirect(CheckoutStep),
}

/// Decision for the terminal success/cancel pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalDecision {
    /// Authenticated session; render the page.
    Render,
    /// No authenticated session; send to login.
    RedirectToLogin,
}

/// Errors from explicit step-advance actions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// Payment was chosen before an address was selected.
    #[error("no address selected")]
    MissingAddress,
    /// An order draft was requested before a payment method was chosen.
    #[error("no payment method chosen")]
    MissingPayment,
}

/// Accumulated checkout context.
///
/// Mutated only by the explicit step-advance actions below; reset on
/// abandonment or completion.
#[derive(Debug, Clone, Default)]
pub struct CheckoutState {
    address: Option<AddressId>,
    payment_method: Option<PaymentMethod>,
}

impl CheckoutState {
    /// Fresh checkout with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate rendering of a step on its prerequisites.
    ///
    /// Redirects always target the *first* unmet step, so a jump straight to
    /// review with nothing selected lands on the address step.
    #[must_use]
    pub const fn guard(&self, requested: CheckoutStep) -> StepDecision {
        match requested {
            CheckoutStep::Address => StepDecision::Render,
            CheckoutStep::Payment => {
                if self.address.is_some() {
                    StepDecision::Render
                } else {
                    StepDecision::Redirect(CheckoutStep::Address)
                }
            }
            CheckoutStep::Review => {
                if self.address.is_none() {
                    StepDecision::Redirect(CheckoutStep::Address)
                } else if self.payment_method.is_none() {
                    StepDecision::Redirect(CheckoutStep::Payment)
                } else {
                    StepDecision::Render
                }
            }
        }
    }

    /// Select the shipping address (completes the address step).
    pub const fn select_address(&mut self, address: AddressId) {
        self.address = Some(address);
    }

    /// Choose the payment method (completes the payment step).
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::MissingAddress`] if no address is selected;
    /// the payment step is unreachable without one.
    pub const fn choose_payment(&mut self, method: PaymentMethod) -> Result<(), CheckoutError> {
        if self.address.is_none() {
            return Err(CheckoutError::MissingAddress);
        }
        self.payment_method = Some(method);
        Ok(())
    }

    /// Assemble the order draft for placement from the review step.
    ///
    /// # Errors
    ///
    /// Returns the first unmet prerequisite as a [`CheckoutError`].
    pub const fn draft(&self) -> Result<OrderDraft, CheckoutError> {
        let Some(address) = self.address else {
            return Err(CheckoutError::MissingAddress);
        };
        let Some(payment_method) = self.payment_method else {
            return Err(CheckoutError::MissingPayment);
        };
        Ok(OrderDraft {
            address,
            payment_method,
        })
    }

    /// Reset on abandonment or completion.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Gate the terminal success/cancel pages on authentication.
///
/// Step completion is irrelevant here; these pages are reached via a server
/// redirect, not client-side progression. A still-loading auth state does
/// not render (the redirect target re-evaluates once auth resolves).
#[must_use]
pub fn terminal_guard(auth: &AuthStatus, _order_id: Option<OrderId>) -> TerminalDecision {
    if auth.is_authenticated() {
        TerminalDecision::Render
    } else {
        TerminalDecision::RedirectToLogin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CurrentUser, UserRole};
    use marketfront_core::UserId;

    fn authenticated() -> AuthStatus {
        AuthStatus::Authenticated(CurrentUser {
            id: UserId::new(1),
            email: "a@example.com".to_string(),
            role: UserRole::Customer,
        })
    }

    #[test]
    fn test_payment_redirects_to_address_when_unset() {
        let state = CheckoutState::new();
        assert_eq!(
            state.guard(CheckoutStep::Payment),
            StepDecision::Redirect(CheckoutStep::Address)
        );
    }

    #[test]
    fn test_review_redirects_to_payment_when_method_unset() {
        let mut state = CheckoutState::new();
        state.select_address(AddressId::new(3));
        assert_eq!(
            state.guard(CheckoutStep::Review),
            StepDecision::Redirect(CheckoutStep::Payment)
        );
    }

    #[test]
    fn test_review_redirects_to_first_unmet_step() {
        let state = CheckoutState::new();
        assert_eq!(
            state.guard(CheckoutStep::Review),
            StepDecision::Redirect(CheckoutStep::Address)
        );
    }

    #[test]
    fn test_address_always_renders() {
        assert_eq!(
            CheckoutState::new().guard(CheckoutStep::Address),
            StepDecision::Render
        );
    }

    #[test]
    fn test_full_progression_renders_review() {
        let mut state = CheckoutState::new();
        state.select_address(AddressId::new(3));
        assert!(state.choose_payment(PaymentMethod::Card).is_ok());
        assert_eq!(state.guard(CheckoutStep::Review), StepDecision::Render);

        let draft = state.draft();
        assert!(draft.is_ok());
    }

    #[test]
    fn test_payment_choice_requires_address() {
        let mut state = CheckoutState::new();
        assert_eq!(
            state.choose_payment(PaymentMethod::Paypal),
            Err(CheckoutError::MissingAddress)
        );
    }

    #[test]
    fn test_reset_clears_progress() {
        let mut state = CheckoutState::new();
        state.select_address(AddressId::new(3));
        state.reset();
        assert_eq!(
            state.guard(CheckoutStep::Payment),
            StepDecision::Redirect(CheckoutStep::Address)
        );
    }

    #[test]
    fn test_terminal_requires_authentication() {
        assert_eq!(
            terminal_guard(&AuthStatus::Anonymous, Some(OrderId::new(9))),
            TerminalDecision::RedirectToLogin
        );
        assert_eq!(
            terminal_guard(&AuthStatus::Loading, None),
            TerminalDecision::RedirectToLogin
        );
        assert_eq!(
            terminal_guard(&authenticated(), Some(OrderId::new(9))),
            TerminalDecision::Render
        );
    }

    #[test]
    fn test_step_paths() {
        assert_eq!(CheckoutStep::Address.path(), "/checkout/address");
        assert_eq!(CheckoutStep::Payment.path(), "/checkout/payment");
        assert_eq!(CheckoutStep::Review.path(), "/checkout/review");
    }
}
