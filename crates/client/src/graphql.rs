//! GraphQL client for auth, profile, and checkout mutations.
//!
//! REST handles the cart; everything identity- and order-shaped goes through
//! `POST /graphql`. A fixed 30-second timeout applies to GraphQL operations
//! only, and every failure is logged uniformly (operation name, status,
//! truncated body) before propagating.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use marketfront_core::OrderId;

use crate::auth::{AuthContext, AuthStatus, CurrentUser, TokenStore};
use crate::checkout::{CheckoutState, OrderDraft};
use crate::config::StorefrontConfig;
use crate::error::{ApiError, GraphQlError, Result};
use crate::http::{Transport, truncate_body};

const LOGIN_MUTATION: &str = "mutation Login($email: String!, $password: String!) { \
     login(email: $email, password: $password) { token user { id email role } } }";

const CURRENT_USER_QUERY: &str = "query CurrentUser { currentUser { id email role } }";

const PLACE_ORDER_MUTATION: &str = "mutation PlaceOrder($addressId: ID!, $paymentMethod: String!) { \
     placeOrder(addressId: $addressId, paymentMethod: $paymentMethod) { orderId } }";

/// Client for the storefront GraphQL endpoint.
#[derive(Clone)]
pub struct GraphQlClient {
    inner: Arc<GraphQlClientInner>,
}

struct GraphQlClientInner {
    http: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
    tokens: Arc<dyn TokenStore>,
}

impl GraphQlClient {
    /// Create a client over the shared transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the GraphQL path cannot be joined to the base URL.
    pub fn new(
        transport: &Transport,
        config: &StorefrontConfig,
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(GraphQlClientInner {
                http: transport.http().clone(),
                endpoint: config.graphql_endpoint()?,
                timeout: config.graphql_timeout,
                tokens,
            }),
        })
    }

    /// Execute a GraphQL operation.
    async fn execute<D: DeserializeOwned>(
        &self,
        operation: &'static str,
        query: &'static str,
        variables: serde_json::Value,
    ) -> Result<D> {
        let mut request = self
            .inner
            .http
            .post(self.inner.endpoint.clone())
            .timeout(self.inner.timeout)
            .json(&json!({ "query": query, "variables": variables }));

        if let Some(token) = self.inner.tokens.bearer_token() {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                operation,
                status = %status,
                body = %truncate_body(&body),
                "GraphQL endpoint returned non-success status"
            );
            return Err(ApiError::Status {
                status,
                body: truncate_body(&body),
            });
        }

        let envelope: Envelope<D> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                operation,
                error = %e,
                body = %truncate_body(&body),
                "failed to parse GraphQL response"
            );
            ApiError::GraphQl(vec![GraphQlError {
                message: format!("malformed response: {e}"),
                path: vec![],
            }])
        })?;

        if !envelope.errors.is_empty() {
            tracing::error!(operation, errors = ?envelope.errors, "GraphQL errors in response");
            return Err(ApiError::GraphQl(envelope.errors));
        }

        envelope.data.ok_or_else(|| {
            tracing::error!(operation, "GraphQL response has no data and no errors");
            ApiError::GraphQl(vec![GraphQlError {
                message: "no data in response".to_string(),
                path: vec![],
            }])
        })
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Log in with email and password, storing the bearer token and resolving
    /// the auth context.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for malformed form input before any request is
    /// issued, or any transport/GraphQL failure.
    #[instrument(skip(self, auth, password))]
    pub async fn login(
        &self,
        auth: &AuthContext,
        email: &str,
        password: &str,
    ) -> Result<CurrentUser> {
        if email.trim().is_empty() || !email.contains('@') {
            return Err(ApiError::Validation("invalid email address".to_string()));
        }
        if password.is_empty() {
            return Err(ApiError::Validation("password must not be empty".to_string()));
        }

        let data: LoginData = self
            .execute(
                "login",
                LOGIN_MUTATION,
                json!({ "email": email, "password": password }),
            )
            .await?;

        self.inner
            .tokens
            .set_bearer_token(SecretString::from(data.login.token));
        auth.resolve(AuthStatus::Authenticated(data.login.user.clone()));
        Ok(data.login.user)
    }

    /// Load the current user during application start and resolve the auth
    /// context.
    ///
    /// This is the one documented swallowed failure: an unauthorized response
    /// here degrades to an anonymous view instead of surfacing an error.
    ///
    /// # Errors
    ///
    /// Returns transport or GraphQL failures other than unauthorized.
    #[instrument(skip(self, auth))]
    pub async fn load_current_user(&self, auth: &AuthContext) -> Result<Option<CurrentUser>> {
        let result: Result<CurrentUserData> =
            self.execute("currentUser", CURRENT_USER_QUERY, json!({})).await;

        let user = match result {
            Ok(data) => data.current_user,
            Err(ApiError::Status { status, .. }) if status == reqwest::StatusCode::UNAUTHORIZED => {
                debug!("session rejected during initial user load, degrading to anonymous");
                None
            }
            Err(e) => return Err(e),
        };

        auth.resolve(match &user {
            Some(user) => AuthStatus::Authenticated(user.clone()),
            None => AuthStatus::Anonymous,
        });
        Ok(user)
    }

    /// Place an order from a completed draft.
    ///
    /// # Errors
    ///
    /// Returns any transport/GraphQL failure.
    #[instrument(skip(self))]
    pub async fn place_order(&self, draft: &OrderDraft) -> Result<OrderId> {
        let data: PlaceOrderData = self
            .execute(
                "placeOrder",
                PLACE_ORDER_MUTATION,
                json!({
                    "addressId": draft.address.as_i64(),
                    "paymentMethod": draft.payment_method,
                }),
            )
            .await?;
        Ok(data.place_order.order_id)
    }

    /// Place the order assembled in a checkout, resetting it on completion.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if checkout prerequisites are unmet (no request
    /// issued), or any failure from [`place_order`](Self::place_order).
    pub async fn place_order_from(&self, checkout: &mut CheckoutState) -> Result<OrderId> {
        let draft = checkout
            .draft()
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        let order_id = self.place_order(&draft).await?;
        checkout.reset();
        Ok(order_id)
    }
}

// =============================================================================
// Wire Shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<D> {
    data: Option<D>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    login: LoginPayload,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    token: String,
    user: CurrentUser,
}

#[derive(Debug, Deserialize)]
struct CurrentUserData {
    #[serde(rename = "currentUser")]
    current_user: Option<CurrentUser>,
}

#[derive(Debug, Deserialize)]
struct PlaceOrderData {
    #[serde(rename = "placeOrder")]
    place_order: PlaceOrderPayload,
}

#[derive(Debug, Deserialize)]
struct PlaceOrderPayload {
    #[serde(rename = "orderId")]
    order_id: OrderId,
}
