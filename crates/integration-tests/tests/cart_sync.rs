//! End-to-end cart synchronization tests against the in-process mock backend.
//!
//! These exercise the full stack: cookie jar, CSRF bootstrap and retry,
//! request shapes, and schema-validated decoding of the loose cart dialect.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;

use marketfront_client::ApiError;
use marketfront_client::auth::{MemoryTokenStore, TokenStore};
use marketfront_client::cart::CartSynchronizer;
use marketfront_client::config::StorefrontConfig;
use marketfront_client::http::Transport;
use marketfront_core::{CartItemId, ProductId, VariationId};
use marketfront_integration_tests::backend::MockBackend;

fn synchronizer(backend: &MockBackend) -> CartSynchronizer {
    let config = StorefrontConfig::for_base_url(backend.base_url());
    let transport = Transport::new(&config).expect("failed to build transport");
    let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
    CartSynchronizer::new(&transport, &config, tokens)
}

#[tokio::test]
async fn test_guest_add_to_cart_round_trip() {
    let backend = MockBackend::spawn().await;
    let cart = synchronizer(&backend);

    let initial = cart.ensure_initial_fetch().await.expect("initial fetch");
    assert!(initial.expect("cart state").items.is_empty());

    let state = cart
        .add_item(ProductId::new(42), 2, None)
        .await
        .expect("add item");

    // Exact wire shape: no variationId key when no variation is selected.
    assert_eq!(
        backend.last_add_body(),
        Some(json!({"productId": 42, "quantity": 2}))
    );

    assert_eq!(state.items.len(), 1);
    let item = state.items.first().expect("line item");
    assert_eq!(item.id, CartItemId::from("item-42-0"));
    assert_eq!(item.quantity, 2);
    assert_eq!(item.line_total, item.product.price * Decimal::from(2u32));
    assert_eq!(state.item_count, 2);
    assert_eq!(state.total, item.line_total);
}

#[tokio::test]
async fn test_variation_included_in_add_body() {
    let backend = MockBackend::spawn().await;
    let cart = synchronizer(&backend);
    cart.fetch_cart().await.expect("fetch");

    let state = cart
        .add_item(ProductId::new(5), 1, Some(VariationId::new(7)))
        .await
        .expect("add item");

    assert_eq!(
        backend.last_add_body(),
        Some(json!({"productId": 5, "quantity": 1, "variationId": 7}))
    );
    let item = state.items.first().expect("line item");
    assert_eq!(item.id, CartItemId::from("item-5-7"));
    assert_eq!(
        item.variation.as_ref().map(|v| v.id),
        Some(VariationId::new(7))
    );
}

#[tokio::test]
async fn test_valid_token_is_reused_without_retry() {
    let backend = MockBackend::spawn().await;
    let cart = synchronizer(&backend);
    cart.fetch_cart().await.expect("fetch");

    cart.add_item(ProductId::new(1), 1, None)
        .await
        .expect("first add");
    cart.add_item(ProductId::new(2), 1, None)
        .await
        .expect("second add");

    // One request per mutation; the cookie token stayed valid throughout.
    assert_eq!(backend.mutation_attempts(), 2);
}

#[tokio::test]
async fn test_stale_csrf_token_retries_once() {
    let backend = MockBackend::spawn().await;
    let cart = synchronizer(&backend);
    cart.fetch_cart().await.expect("fetch");

    backend.rotate_csrf_token();

    let state = cart
        .add_item(ProductId::new(7), 1, None)
        .await
        .expect("add after rotation");

    assert_eq!(state.item_count, 1);
    // First attempt 403s on the stale token; the retry carries the fresh one.
    assert_eq!(backend.mutation_attempts(), 2);
}

#[tokio::test]
async fn test_persistent_rejection_fails_after_second_attempt() {
    let backend = MockBackend::spawn().await;
    let cart = synchronizer(&backend);
    cart.fetch_cart().await.expect("fetch");

    backend.reject_mutations(true);

    let err = cart
        .add_item(ProductId::new(7), 1, None)
        .await
        .expect_err("mutations are rejected");

    assert!(matches!(err, ApiError::CsrfRejected(_)));
    // Exactly one retry, never more.
    assert_eq!(backend.mutation_attempts(), 2);
    assert!(cart.cart().expect("local state").items.is_empty());
}

#[tokio::test]
async fn test_remove_unknown_item_issues_no_request() {
    let backend = MockBackend::spawn().await;
    let cart = synchronizer(&backend);
    cart.fetch_cart().await.expect("fetch");

    let fetches = backend.cart_fetches();
    let err = cart
        .remove_item(&CartItemId::from("item-99-0"))
        .await
        .expect_err("item is not in local state");

    assert!(matches!(err, ApiError::ItemNotFound(_)));
    assert_eq!(backend.mutation_attempts(), 0);
    assert_eq!(backend.cart_fetches(), fetches);
}

#[tokio::test]
async fn test_below_minimum_quantity_rejected_locally() {
    let backend = MockBackend::spawn().await;
    let cart = synchronizer(&backend);
    cart.fetch_cart().await.expect("fetch");

    let err = cart
        .add_item(ProductId::new(42), 0, None)
        .await
        .expect_err("zero quantity");

    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(backend.mutation_attempts(), 0);
}

#[tokio::test]
async fn test_update_below_minimum_quantity_rejected_locally() {
    let backend = MockBackend::spawn().await;
    let cart = synchronizer(&backend);
    cart.fetch_cart().await.expect("fetch");

    cart.add_item(ProductId::new(1), 1, None)
        .await
        .expect("add item");
    let attempts = backend.mutation_attempts();

    let err = cart
        .update_quantity(&CartItemId::from("item-1-0"), 0)
        .await
        .expect_err("zero quantity");

    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(backend.mutation_attempts(), attempts);
    // The existing line is untouched.
    let item_id = CartItemId::from("item-1-0");
    let local = cart.cart().expect("local state");
    assert_eq!(local.item(&item_id).expect("line item").quantity, 1);
}

#[tokio::test]
async fn test_mutation_sequence_converges_on_server_state() {
    let backend = MockBackend::spawn().await;
    let cart = synchronizer(&backend);
    cart.fetch_cart().await.expect("fetch");

    cart.add_item(ProductId::new(1), 2, None)
        .await
        .expect("add product 1");
    cart.add_item(ProductId::new(2), 1, Some(VariationId::new(7)))
        .await
        .expect("add product 2");
    cart.update_quantity(&CartItemId::from("item-1-0"), 5)
        .await
        .expect("update product 1");
    let state = cart
        .remove_item(&CartItemId::from("item-2-7"))
        .await
        .expect("remove product 2");

    assert_eq!(backend.server_items(), vec![(1, 5, None)]);
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items.first().expect("line item").quantity, 5);

    // Local state is the decoded server cart, not a patched copy.
    let local = cart.cart().expect("local state");
    assert_eq!(local.item_count, state.item_count);
    assert_eq!(local.total, state.total);
}

#[tokio::test]
async fn test_initial_fetch_runs_once() {
    let backend = MockBackend::spawn().await;
    let cart = synchronizer(&backend);

    let first = cart.ensure_initial_fetch().await.expect("first call");
    assert!(first.is_some());
    let fetches = backend.cart_fetches();

    let second = cart.ensure_initial_fetch().await.expect("second call");
    assert!(second.is_some());
    assert_eq!(backend.cart_fetches(), fetches);
}
