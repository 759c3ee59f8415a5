//! Route guards: gate rendering on authentication state.
//!
//! Three variants of the same capability, expressed as pure decision
//! functions over an [`AuthStatus`] snapshot. The embedding shell performs
//! the actual navigation; nothing here does I/O.

use crate::auth::{AuthStatus, UserRole};

/// Where a guard sends the user instead of rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    /// Destination path.
    pub to: String,
    /// Originating path, carried for post-login return.
    pub from: Option<String>,
    /// Error annotation to surface at the destination.
    pub error: Option<&'static str>,
}

impl RedirectTarget {
    fn to(path: &str) -> Self {
        Self {
            to: path.to_string(),
            from: None,
            error: None,
        }
    }
}

/// Outcome of evaluating a guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the guarded children.
    Render,
    /// Auth state is still loading; render a placeholder, not a redirect.
    Placeholder,
    /// Navigate away.
    Redirect(RedirectTarget),
}

/// Guard for routes that require any authenticated session.
///
/// While auth is loading this renders a placeholder rather than redirecting;
/// once loading resolves anonymous, it redirects to `/login` carrying the
/// attempted location for post-login return.
#[must_use]
pub fn private_route(auth: &AuthStatus, attempted: &str) -> GuardDecision {
    match auth {
        AuthStatus::Loading => GuardDecision::Placeholder,
        AuthStatus::Anonymous => GuardDecision::Redirect(RedirectTarget {
            to: "/login".to_string(),
            from: Some(attempted.to_string()),
            error: None,
        }),
        AuthStatus::Authenticated(_) => GuardDecision::Render,
    }
}

/// Guard for routes that only make sense for anonymous visitors (login,
/// registration). Authenticated users are sent to their role's landing page.
#[must_use]
pub fn public_route(auth: &AuthStatus) -> GuardDecision {
    match auth {
        // A login page can render while auth is still resolving.
        AuthStatus::Loading | AuthStatus::Anonymous => GuardDecision::Render,
        AuthStatus::Authenticated(user) => {
            GuardDecision::Redirect(RedirectTarget::to(user.role.landing_page()))
        }
    }
}

/// Guard for the admin back-office.
///
/// Anonymous visitors go to the admin login; authenticated non-admins are
/// sent home with an error annotation.
#[must_use]
pub fn admin_route(auth: &AuthStatus) -> GuardDecision {
    match auth {
        AuthStatus::Loading => GuardDecision::Placeholder,
        AuthStatus::Anonymous => GuardDecision::Redirect(RedirectTarget::to("/admin/login")),
        AuthStatus::Authenticated(user) => match user.role {
            UserRole::Admin => GuardDecision::Render,
            UserRole::Customer => GuardDecision::Redirect(RedirectTarget {
                to: "/".to_string(),
                from: None,
                error: Some("admin access required"),
            }),
        },
    }
}
