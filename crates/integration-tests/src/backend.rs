//! In-process mock storefront backend.
//!
//! Implements just enough of the server contract to exercise the client:
//! cookie-issued CSRF tokens, token validation on every mutation, the loose
//! cart JSON dialect (money as strings, counts omitted), and a minimal
//! GraphQL endpoint for login, current user, and order placement.
//!
//! Tests observe the backend through counters and snapshots rather than by
//! intercepting requests, so assertions stay on the wire contract.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

/// Bearer token issued by the mock login mutation.
pub const TEST_BEARER_TOKEN: &str = "integration-test-token";

/// Password the mock login mutation rejects.
pub const WRONG_PASSWORD: &str = "wrong-password";

/// Order ID returned by the mock place-order mutation.
pub const TEST_ORDER_ID: i64 = 9001;

type Shared = Arc<BackendState>;

struct ServerItem {
    product_id: i64,
    quantity: u32,
    variation_id: Option<i64>,
}

struct BackendState {
    items: Mutex<Vec<ServerItem>>,
    csrf_token: Mutex<String>,
    csrf_generation: AtomicUsize,
    reject_mutations: AtomicBool,
    cart_fetches: AtomicUsize,
    mutation_attempts: AtomicUsize,
    graphql_requests: AtomicUsize,
    last_add_body: Mutex<Option<Value>>,
}

/// Handle to a running mock backend.
pub struct MockBackend {
    addr: SocketAddr,
    state: Shared,
}

impl MockBackend {
    /// Bind to an ephemeral port and serve in a background task.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> Self {
        let state = Arc::new(BackendState {
            items: Mutex::new(Vec::new()),
            csrf_token: Mutex::new("csrf-token-1".to_string()),
            csrf_generation: AtomicUsize::new(1),
            reject_mutations: AtomicBool::new(false),
            cart_fetches: AtomicUsize::new(0),
            mutation_attempts: AtomicUsize::new(0),
            graphql_requests: AtomicUsize::new(0),
            last_add_body: Mutex::new(None),
        });

        let app = Router::new()
            .route("/api/cart", get(get_cart))
            .route("/api/cart/items", post(add_item).put(update_item))
            .route("/api/cart/items/{product_id}", delete(remove_item))
            .route("/graphql", post(graphql))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock backend");
        let addr = listener.local_addr().expect("mock backend has no address");
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("mock backend crashed");
        });

        Self { addr, state }
    }

    /// Base URL of the running backend.
    ///
    /// # Panics
    ///
    /// Panics if the bound address does not form a valid URL.
    #[must_use]
    pub fn base_url(&self) -> Url {
        format!("http://{}", self.addr)
            .parse()
            .expect("invalid mock backend URL")
    }

    /// Invalidate the current CSRF token.
    ///
    /// Cookies issued earlier stop validating; the next cart GET sets the
    /// replacement token.
    pub fn rotate_csrf_token(&self) {
        let generation = self.state.csrf_generation.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.state.csrf_token) = format!("csrf-token-{generation}");
    }

    /// Reject every mutation with 403 regardless of the presented token.
    pub fn reject_mutations(&self, reject: bool) {
        self.state.reject_mutations.store(reject, Ordering::SeqCst);
    }

    /// Number of `GET /api/cart` requests served (bootstrap GETs included).
    #[must_use]
    pub fn cart_fetches(&self) -> usize {
        self.state.cart_fetches.load(Ordering::SeqCst)
    }

    /// Number of mutation requests received, rejected ones included.
    #[must_use]
    pub fn mutation_attempts(&self) -> usize {
        self.state.mutation_attempts.load(Ordering::SeqCst)
    }

    /// Number of GraphQL requests received.
    #[must_use]
    pub fn graphql_requests(&self) -> usize {
        self.state.graphql_requests.load(Ordering::SeqCst)
    }

    /// Body of the most recent accepted `POST /api/cart/items`.
    #[must_use]
    pub fn last_add_body(&self) -> Option<Value> {
        lock(&self.state.last_add_body).clone()
    }

    /// Canonical server lines as (product, quantity, variation) triples.
    #[must_use]
    pub fn server_items(&self) -> Vec<(i64, u32, Option<i64>)> {
        lock(&self.state.items)
            .iter()
            .map(|item| (item.product_id, item.quantity, item.variation_id))
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// =============================================================================
// Cart Dialect
// =============================================================================

/// Deterministic unit price in cents for a product.
const fn unit_price_cents(product_id: i64) -> i64 {
    500 + product_id * 25
}

fn cents(total: i64) -> String {
    format!("{}.{:02}", total / 100, total % 100)
}

fn line_id(item: &ServerItem) -> String {
    format!("item-{}-{}", item.product_id, item.variation_id.unwrap_or(0))
}

/// Render the cart the way the real backend does: money fields as strings,
/// `itemCount` omitted so clients recompute it.
fn cart_json(items: &[ServerItem]) -> Value {
    let lines: Vec<Value> = items
        .iter()
        .map(|item| {
            let unit = unit_price_cents(item.product_id);
            let line_total = unit * i64::from(item.quantity);
            json!({
                "id": line_id(item),
                "product": {
                    "id": item.product_id,
                    "title": format!("Product {}", item.product_id),
                    "price": cents(unit),
                },
                "quantity": item.quantity,
                "variation": item.variation_id.map(|id| json!({
                    "id": id,
                    "sku": format!("SKU-{id}"),
                })),
                "totalPrice": cents(line_total),
            })
        })
        .collect();

    let total: i64 = items
        .iter()
        .map(|item| unit_price_cents(item.product_id) * i64::from(item.quantity))
        .sum();

    json!({
        "id": "cart-1",
        "items": lines,
        "total": cents(total),
        "currency": "USD",
        "updatedAt": "2026-08-01T12:00:00Z",
    })
}

// =============================================================================
// REST Handlers
// =============================================================================

async fn get_cart(State(state): State<Shared>) -> Response {
    state.cart_fetches.fetch_add(1, Ordering::SeqCst);
    let cookie = format!("XSRF-TOKEN={}; Path=/", lock(&state.csrf_token));
    let body = cart_json(&lock(&state.items));
    ([(header::SET_COOKIE, cookie)], Json(body)).into_response()
}

/// Count the attempt and validate the presented CSRF token.
fn check_csrf(state: &BackendState, headers: &HeaderMap) -> Result<(), Response> {
    state.mutation_attempts.fetch_add(1, Ordering::SeqCst);

    if state.reject_mutations.load(Ordering::SeqCst) {
        return Err((StatusCode::FORBIDDEN, "CSRF token mismatch").into_response());
    }
    let presented = headers
        .get("x-xsrf-token")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if presented != lock(&state.csrf_token).as_str() {
        return Err((StatusCode::FORBIDDEN, "CSRF token mismatch").into_response());
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemPayload {
    product_id: i64,
    quantity: u32,
    #[serde(default)]
    variation_id: Option<i64>,
}

async fn add_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = check_csrf(&state, &headers) {
        return rejection;
    }
    *lock(&state.last_add_body) = Some(body.clone());

    let payload: ItemPayload = match serde_json::from_value(body) {
        Ok(payload) => payload,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let mut items = lock(&state.items);
    if let Some(existing) = items.iter_mut().find(|item| {
        item.product_id == payload.product_id && item.variation_id == payload.variation_id
    }) {
        existing.quantity += payload.quantity;
    } else {
        items.push(ServerItem {
            product_id: payload.product_id,
            quantity: payload.quantity,
            variation_id: payload.variation_id,
        });
    }
    Json(cart_json(&items)).into_response()
}

async fn update_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = check_csrf(&state, &headers) {
        return rejection;
    }

    let payload: ItemPayload = match serde_json::from_value(body) {
        Ok(payload) => payload,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let mut items = lock(&state.items);
    let Some(existing) = items.iter_mut().find(|item| {
        item.product_id == payload.product_id && item.variation_id == payload.variation_id
    }) else {
        return (StatusCode::NOT_FOUND, "no such line item").into_response();
    };
    existing.quantity = payload.quantity;
    Json(cart_json(&items)).into_response()
}

#[derive(Debug, Deserialize)]
struct RemoveQuery {
    #[serde(rename = "variationId")]
    variation_id: Option<i64>,
}

async fn remove_item(
    State(state): State<Shared>,
    Path(product_id): Path<i64>,
    Query(query): Query<RemoveQuery>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = check_csrf(&state, &headers) {
        return rejection;
    }

    let mut items = lock(&state.items);
    items.retain(|item| {
        !(item.product_id == product_id && item.variation_id == query.variation_id)
    });
    Json(cart_json(&items)).into_response()
}

// =============================================================================
// GraphQL Handler
// =============================================================================

async fn graphql(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.graphql_requests.fetch_add(1, Ordering::SeqCst);

    let query = body
        .get("query")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let variables = body.get("variables").cloned().unwrap_or(Value::Null);
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {TEST_BEARER_TOKEN}"));

    if query.contains("mutation Login") {
        let email = variables
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let password = variables
            .get("password")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if password == WRONG_PASSWORD {
            return Json(json!({
                "data": null,
                "errors": [{"message": "invalid credentials"}],
            }))
            .into_response();
        }
        return Json(json!({
            "data": {
                "login": {
                    "token": TEST_BEARER_TOKEN,
                    "user": {"id": 7, "email": email, "role": "customer"},
                }
            }
        }))
        .into_response();
    }

    if query.contains("query CurrentUser") {
        if !authorized {
            return (StatusCode::UNAUTHORIZED, "missing or invalid bearer token").into_response();
        }
        return Json(json!({
            "data": {
                "currentUser": {"id": 7, "email": "shopper@example.com", "role": "customer"},
            }
        }))
        .into_response();
    }

    if query.contains("mutation PlaceOrder") {
        if !authorized {
            return (StatusCode::UNAUTHORIZED, "missing or invalid bearer token").into_response();
        }
        return Json(json!({
            "data": {"placeOrder": {"orderId": TEST_ORDER_ID}},
        }))
        .into_response();
    }

    (StatusCode::BAD_REQUEST, "unknown operation").into_response()
}
