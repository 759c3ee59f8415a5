//! Cart synchronization against the storefront REST API.
//!
//! # Consistency model
//!
//! The server is the source of truth. Every successful mutation re-fetches
//! the entire cart and replaces local state wholesale; there is no optimistic
//! patching and no client-side merge. Overlapping user-triggered mutations
//! are not serialized: responses may land out of order and the last re-fetch
//! to resolve wins.
//!
//! # Endpoints
//!
//! - `GET    /api/cart`
//! - `POST   /api/cart/items`
//! - `PUT    /api/cart/items`
//! - `DELETE /api/cart/items/{productId}?variationId=`
//!
//! All requests carry the session cookies; mutations carry `X-XSRF-TOKEN`.

pub mod decode;
pub mod types;

use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::instrument;
use url::Url;

use marketfront_core::{CartItemId, ProductId, VariationId};

use crate::auth::TokenStore;
use crate::config::StorefrontConfig;
use crate::error::{ApiError, Result};
use crate::http::{HeaderBuilder, Transport, execute_with_csrf_retry};

use decode::decode_cart;
pub use types::{Cart, CartItem, ProductSnapshot, Variation};

/// Request body for add and update calls.
///
/// `variationId` is omitted entirely when absent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CartItemRequest {
    product_id: ProductId,
    quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    variation_id: Option<VariationId>,
}

/// Owns cart state and synchronizes it with the backend.
///
/// Cheaply cloneable via `Arc`; only this type ever mutates the cart, always
/// by full replacement, which removes the need for any finer-grained locking.
#[derive(Clone)]
pub struct CartSynchronizer {
    inner: Arc<CartSynchronizerInner>,
}

struct CartSynchronizerInner {
    http: reqwest::Client,
    base_url: Url,
    headers: HeaderBuilder,
    min_quantity: u32,
    state: RwLock<Option<Cart>>,
    initial_fetch_started: AtomicBool,
}

impl CartSynchronizer {
    /// Create a synchronizer over a shared transport.
    #[must_use]
    pub fn new(
        transport: &Transport,
        config: &StorefrontConfig,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let headers = HeaderBuilder::new(tokens, transport.csrf().clone());

        Self {
            inner: Arc::new(CartSynchronizerInner {
                http: transport.http().clone(),
                base_url: transport.base_url().clone(),
                headers,
                min_quantity: config.min_quantity,
                state: RwLock::new(None),
                initial_fetch_started: AtomicBool::new(false),
            }),
        }
    }

    /// Current cart state, if a fetch has completed.
    #[must_use]
    pub fn cart(&self) -> Option<Cart> {
        self.inner
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Fetch the cart on application mount.
    ///
    /// A guard flag makes this idempotent: a second invocation (e.g. a
    /// double-mounted view) returns the current state without issuing
    /// another request.
    ///
    /// # Errors
    ///
    /// Returns an error if the first fetch fails; the guard stays set, so
    /// callers retry via [`fetch_cart`](Self::fetch_cart).
    #[instrument(skip(self))]
    pub async fn ensure_initial_fetch(&self) -> Result<Option<Cart>> {
        if self.inner.initial_fetch_started.swap(true, Ordering::SeqCst) {
            return Ok(self.cart());
        }
        self.fetch_cart().await.map(Some)
    }

    /// Fetch the canonical cart and replace local state.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload does not decode.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) -> Result<Cart> {
        let url = self.cart_url()?;
        let response = execute_with_csrf_retry(&self.inner.headers, |headers| {
            self.inner.http.get(url.clone()).headers(headers).send()
        })
        .await?;

        let body = response.text().await?;
        let cart = decode_cart(&body)?;
        self.publish(cart.clone());
        Ok(cart)
    }

    /// Add a product to the cart, then re-fetch canonical state.
    ///
    /// # Errors
    ///
    /// Returns `Validation` below the minimum quantity (no request issued),
    /// or any transport/decode failure from the mutation and re-fetch.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        product_id: ProductId,
        quantity: u32,
        variation_id: Option<VariationId>,
    ) -> Result<Cart> {
        self.check_quantity(quantity)?;

        let body = CartItemRequest {
            product_id,
            quantity,
            variation_id,
        };
        let url = self.items_url()?;
        let response = execute_with_csrf_retry(&self.inner.headers, |headers| {
            self.inner
                .http
                .post(url.clone())
                .headers(headers)
                .json(&body)
                .send()
        })
        .await?;
        // The mutation response body is ignored; the re-fetch is canonical.
        drop(response);

        self.fetch_cart().await
    }

    /// Set the quantity of an existing line item, then re-fetch.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` (zero network I/O) if `item_id` is absent from
    /// local state, `Validation` below the minimum quantity, or any
    /// transport/decode failure.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, item_id: &CartItemId, quantity: u32) -> Result<Cart> {
        self.check_quantity(quantity)?;
        let (product_id, variation_id) = self.resolve_item(item_id)?;

        let body = CartItemRequest {
            product_id,
            quantity,
            variation_id,
        };
        let url = self.items_url()?;
        let response = execute_with_csrf_retry(&self.inner.headers, |headers| {
            self.inner
                .http
                .put(url.clone())
                .headers(headers)
                .json(&body)
                .send()
        })
        .await?;
        drop(response);

        self.fetch_cart().await
    }

    /// Remove a line item, then re-fetch.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` (zero network I/O) if `item_id` is absent from
    /// local state, or any transport/decode failure.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, item_id: &CartItemId) -> Result<Cart> {
        let (product_id, variation_id) = self.resolve_item(item_id)?;

        let mut url = self
            .inner
            .base_url
            .join(&format!("/api/cart/items/{product_id}"))?;
        if let Some(variation_id) = variation_id {
            url.query_pairs_mut()
                .append_pair("variationId", &variation_id.to_string());
        }

        let response = execute_with_csrf_retry(&self.inner.headers, |headers| {
            self.inner.http.delete(url.clone()).headers(headers).send()
        })
        .await?;
        drop(response);

        self.fetch_cart().await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn check_quantity(&self, quantity: u32) -> Result<()> {
        if quantity < self.inner.min_quantity {
            return Err(ApiError::Validation(format!(
                "quantity {quantity} is below the minimum of {}",
                self.inner.min_quantity
            )));
        }
        Ok(())
    }

    /// Resolve a line item to its product/variation pair from local state.
    fn resolve_item(&self, item_id: &CartItemId) -> Result<(ProductId, Option<VariationId>)> {
        let state = self
            .inner
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        state
            .as_ref()
            .and_then(|cart| cart.item(item_id))
            .map(|item| (item.product.id, item.variation.as_ref().map(|v| v.id)))
            .ok_or_else(|| ApiError::ItemNotFound(item_id.clone()))
    }

    fn publish(&self, cart: Cart) {
        *self
            .inner
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(cart);
    }

    fn cart_url(&self) -> Result<Url> {
        Ok(self.inner.base_url.join("/api/cart")?)
    }

    fn items_url(&self) -> Result<Url> {
        Ok(self.inner.base_url.join("/api/cart/items")?)
    }
}

impl std::fmt::Debug for CartSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSynchronizer")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_item_request_omits_absent_variation() {
        let body = CartItemRequest {
            product_id: ProductId::new(42),
            quantity: 2,
            variation_id: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"productId": 42, "quantity": 2}));
    }

    #[test]
    fn test_item_request_includes_variation() {
        let body = CartItemRequest {
            product_id: ProductId::new(42),
            quantity: 1,
            variation_id: Some(VariationId::new(7)),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"productId": 42, "quantity": 1, "variationId": 7})
        );
    }
}
