//! End-to-end auth and checkout tests against the in-process mock backend.
//!
//! Cover the GraphQL surface: login (token storage and auth resolution),
//! initial user load including the documented 401 degradation, and order
//! placement from a completed checkout.

use std::sync::Arc;

use secrecy::ExposeSecret;

use marketfront_client::ApiError;
use marketfront_client::auth::{AuthContext, AuthStatus, MemoryTokenStore, TokenStore};
use marketfront_client::checkout::{CheckoutState, CheckoutStep, PaymentMethod, StepDecision};
use marketfront_client::config::StorefrontConfig;
use marketfront_client::graphql::GraphQlClient;
use marketfront_client::http::Transport;
use marketfront_core::AddressId;
use marketfront_integration_tests::backend::{
    MockBackend, TEST_BEARER_TOKEN, TEST_ORDER_ID, WRONG_PASSWORD,
};

fn graphql(backend: &MockBackend) -> (GraphQlClient, Arc<dyn TokenStore>) {
    let config = StorefrontConfig::for_base_url(backend.base_url());
    let transport = Transport::new(&config).expect("failed to build transport");
    let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
    let client =
        GraphQlClient::new(&transport, &config, Arc::clone(&tokens)).expect("graphql client");
    (client, tokens)
}

#[tokio::test]
async fn test_login_stores_bearer_token_and_resolves_auth() {
    let backend = MockBackend::spawn().await;
    let (client, tokens) = graphql(&backend);
    let auth = AuthContext::new();

    let user = client
        .login(&auth, "shopper@example.com", "hunter2")
        .await
        .expect("login");

    assert_eq!(user.email, "shopper@example.com");
    assert!(auth.snapshot().is_authenticated());
    assert_eq!(
        tokens.bearer_token().expect("stored token").expose_secret(),
        TEST_BEARER_TOKEN
    );
}

#[tokio::test]
async fn test_login_validation_precedes_any_request() {
    let backend = MockBackend::spawn().await;
    let (client, tokens) = graphql(&backend);
    let auth = AuthContext::new();

    let err = client
        .login(&auth, "not-an-email", "hunter2")
        .await
        .expect_err("malformed email");
    assert!(matches!(err, ApiError::Validation(_)));

    let err = client
        .login(&auth, "shopper@example.com", "")
        .await
        .expect_err("empty password");
    assert!(matches!(err, ApiError::Validation(_)));

    assert_eq!(backend.graphql_requests(), 0);
    assert!(tokens.bearer_token().is_none());
}

#[tokio::test]
async fn test_login_failure_surfaces_graphql_errors() {
    let backend = MockBackend::spawn().await;
    let (client, tokens) = graphql(&backend);
    let auth = AuthContext::new();

    let err = client
        .login(&auth, "shopper@example.com", WRONG_PASSWORD)
        .await
        .expect_err("bad password");

    match err {
        ApiError::GraphQl(errors) => {
            assert_eq!(
                errors.first().map(|e| e.message.as_str()),
                Some("invalid credentials")
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(tokens.bearer_token().is_none());
    assert!(matches!(auth.snapshot(), AuthStatus::Loading));
}

#[tokio::test]
async fn test_unauthorized_user_load_degrades_to_anonymous() {
    let backend = MockBackend::spawn().await;
    let (client, _tokens) = graphql(&backend);
    let auth = AuthContext::new();

    let user = client.load_current_user(&auth).await.expect("user load");

    assert!(user.is_none());
    assert!(matches!(auth.snapshot(), AuthStatus::Anonymous));
}

#[tokio::test]
async fn test_user_load_after_login() {
    let backend = MockBackend::spawn().await;
    let (client, _tokens) = graphql(&backend);
    let auth = AuthContext::new();

    client
        .login(&auth, "shopper@example.com", "hunter2")
        .await
        .expect("login");

    let user = client
        .load_current_user(&auth)
        .await
        .expect("user load")
        .expect("authenticated user");
    assert_eq!(user.email, "shopper@example.com");
    assert!(auth.snapshot().is_authenticated());
}

#[tokio::test]
async fn test_place_order_resets_checkout() {
    let backend = MockBackend::spawn().await;
    let (client, _tokens) = graphql(&backend);
    let auth = AuthContext::new();

    client
        .login(&auth, "shopper@example.com", "hunter2")
        .await
        .expect("login");

    let mut checkout = CheckoutState::new();
    checkout.select_address(AddressId::new(3));
    checkout
        .choose_payment(PaymentMethod::Card)
        .expect("payment after address");
    assert_eq!(checkout.guard(CheckoutStep::Review), StepDecision::Render);

    let order_id = client
        .place_order_from(&mut checkout)
        .await
        .expect("place order");

    assert_eq!(order_id.as_i64(), TEST_ORDER_ID);
    assert_eq!(
        checkout.guard(CheckoutStep::Payment),
        StepDecision::Redirect(CheckoutStep::Address)
    );
}

#[tokio::test]
async fn test_place_order_requires_authentication() {
    let backend = MockBackend::spawn().await;
    let (client, _tokens) = graphql(&backend);

    let mut checkout = CheckoutState::new();
    checkout.select_address(AddressId::new(3));
    checkout
        .choose_payment(PaymentMethod::Paypal)
        .expect("payment after address");

    let err = client
        .place_order_from(&mut checkout)
        .await
        .expect_err("anonymous order placement");

    assert!(matches!(
        err,
        ApiError::Status { status, .. } if status == reqwest::StatusCode::UNAUTHORIZED
    ));
    // Checkout progress is preserved on failure.
    assert_eq!(checkout.guard(CheckoutStep::Review), StepDecision::Render);
}

#[tokio::test]
async fn test_logout_clears_session() {
    let backend = MockBackend::spawn().await;
    let (client, tokens) = graphql(&backend);
    let auth = AuthContext::new();

    client
        .login(&auth, "shopper@example.com", "hunter2")
        .await
        .expect("login");

    auth.logout(tokens.as_ref());

    assert!(tokens.bearer_token().is_none());
    let user = client.load_current_user(&auth).await.expect("user load");
    assert!(user.is_none());
    assert!(matches!(auth.snapshot(), AuthStatus::Anonymous));
}
