//! Integration test harness for the ShopLive client SDK.
//!
//! Spins up an in-process mock of the ShopLive backend - REST routes plus
//! the order events WebSocket topic - on an ephemeral port, and exposes
//! switches for the failure modes the SDK must handle: expired access
//! tokens, a rejecting refresh endpoint, a failing orders endpoint,
//! checkout throttling, and a connection-dropping push channel.
//!
//! Tests drive the real SDK over real HTTP and WebSocket against this
//! backend; nothing in the client is stubbed.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header::CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use url::Url;

use shoplive_client::ClientConfig;
use shoplive_core::{AdminStats, Customer, NewReview, Order, OrderItem, OrderStatus, Product, Review};

const REFRESH_TOKEN: &str = "refresh-token-1";
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// One recorded product upload.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    /// The request's `Content-Type` header, boundary included.
    pub content_type: String,
    /// Multipart field names, in order.
    pub fields: Vec<String>,
    /// File name of the image part, if any.
    pub file_name: Option<String>,
}

/// Shared state of the mock backend.
pub struct BackendState {
    token_counter: AtomicUsize,
    valid_access_tokens: Mutex<HashSet<String>>,
    valid_refresh_tokens: Mutex<HashSet<String>>,
    refresh_calls: AtomicUsize,
    refresh_should_fail: AtomicBool,
    refresh_delay: Mutex<Duration>,
    orders: Mutex<Vec<Order>>,
    orders_should_fail: AtomicBool,
    placed: Mutex<Vec<Vec<OrderItem>>>,
    throttle_orders: AtomicBool,
    products: Mutex<Vec<Product>>,
    products_requests: AtomicUsize,
    image_requests: AtomicUsize,
    reviews: Mutex<HashMap<String, Vec<Review>>>,
    uploads: Mutex<Vec<UploadRecord>>,
    last_authorization: Mutex<Option<String>>,
    events: broadcast::Sender<String>,
    subscribers: AtomicUsize,
    drop_next_ws: AtomicBool,
    reject_bearer: AtomicBool,
}

impl BackendState {
    fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            token_counter: AtomicUsize::new(0),
            valid_access_tokens: Mutex::new(HashSet::new()),
            valid_refresh_tokens: Mutex::new(HashSet::new()),
            refresh_calls: AtomicUsize::new(0),
            refresh_should_fail: AtomicBool::new(false),
            refresh_delay: Mutex::new(Duration::ZERO),
            orders: Mutex::new(Vec::new()),
            orders_should_fail: AtomicBool::new(false),
            placed: Mutex::new(Vec::new()),
            throttle_orders: AtomicBool::new(false),
            products: Mutex::new(Vec::new()),
            products_requests: AtomicUsize::new(0),
            image_requests: AtomicUsize::new(0),
            reviews: Mutex::new(HashMap::new()),
            uploads: Mutex::new(Vec::new()),
            last_authorization: Mutex::new(None),
            events,
            subscribers: AtomicUsize::new(0),
            drop_next_ws: AtomicBool::new(false),
            reject_bearer: AtomicBool::new(false),
        }
    }

    fn issue_access_token(&self) -> String {
        let n = self.token_counter.fetch_add(1, Ordering::SeqCst);
        let token = format!("access-{n}");
        self.valid_access_tokens.lock().insert(token.clone());
        token
    }

    fn is_authorized(&self, headers: &HeaderMap) -> bool {
        let bearer = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(ToString::to_string);

        *self.last_authorization.lock() = bearer.clone();

        if self.reject_bearer.load(Ordering::SeqCst) {
            return false;
        }
        bearer.is_some_and(|token| self.valid_access_tokens.lock().contains(&token))
    }
}

/// Handle to a running mock backend.
pub struct MockBackend {
    addr: SocketAddr,
    pub state: Arc<BackendState>,
    task: JoinHandle<()>,
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl MockBackend {
    /// Bind an ephemeral port and serve the mock routes.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot bind (test environment failure).
    pub async fn spawn() -> Self {
        let state = Arc::new(BackendState::new());
        let app = router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend local addr");
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state, task }
    }

    /// SDK configuration pointed at this backend, with a short reconnect
    /// delay so push-channel tests run quickly.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let base = Url::parse(&format!("http://{}/", self.addr)).unwrap();
        let mut config = ClientConfig::new(base).unwrap();
        config.reconnect_delay = Duration::from_millis(50);
        config
    }

    // ── Failure switches ────────────────────────────────────────────────────

    /// Invalidate every outstanding access token; the next authenticated
    /// request will 401.
    pub fn expire_access_tokens(&self) {
        self.state.valid_access_tokens.lock().clear();
    }

    /// Make the refresh endpoint reject with 401.
    pub fn fail_refresh(&self) {
        self.state.refresh_should_fail.store(true, Ordering::SeqCst);
    }

    /// Delay refresh responses so concurrent 401s pile up on one refresh.
    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.state.refresh_delay.lock() = delay;
    }

    /// Make `GET /customer/my/orders` answer 500.
    pub fn fail_orders(&self) {
        self.state.orders_should_fail.store(true, Ordering::SeqCst);
    }

    /// Make `POST /orders` answer 429.
    pub fn throttle_orders(&self) {
        self.state.throttle_orders.store(true, Ordering::SeqCst);
    }

    /// Drop the next WebSocket connection right after the upgrade.
    pub fn drop_next_ws(&self) {
        self.state.drop_next_ws.store(true, Ordering::SeqCst);
    }

    /// Reject every bearer token, refreshed ones included. A request then
    /// 401s on the attempt and again on its single retry.
    pub fn reject_bearer(&self) {
        self.state.reject_bearer.store(true, Ordering::SeqCst);
    }

    // ── Seeding and inspection ──────────────────────────────────────────────

    pub fn set_orders(&self, orders: Vec<Order>) {
        *self.state.orders.lock() = orders;
    }

    pub fn set_products(&self, products: Vec<Product>) {
        *self.state.products.lock() = products;
    }

    /// Broadcast an order status event on the push topic.
    pub fn push_event(&self, order_id: &str, status: OrderStatus) {
        let event = serde_json::json!({ "orderId": order_id, "status": status }).to_string();
        let _ = self.state.events.send(event);
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn products_requests(&self) -> usize {
        self.state.products_requests.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn image_requests(&self) -> usize {
        self.state.image_requests.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn placed_orders(&self) -> Vec<Vec<OrderItem>> {
        self.state.placed.lock().clone()
    }

    #[must_use]
    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.state.uploads.lock().clone()
    }

    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.state.orders.lock().clone()
    }

    /// The bearer token presented on the most recent protected request.
    #[must_use]
    pub fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().clone()
    }

    /// Wait until a push subscriber has completed its subscribe handshake.
    ///
    /// # Panics
    ///
    /// Panics if no subscriber appears within two seconds.
    pub async fn wait_for_subscriber(&self) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while self.state.subscribers.load(Ordering::SeqCst) == 0 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "no push subscriber within 2s"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Build a seeded order for tests.
#[must_use]
pub fn sample_order(id: &str, status: OrderStatus) -> Order {
    Order {
        id: id.to_string(),
        product_id: format!("product-{id}"),
        name: format!("Order {id}"),
        count: 1,
        price: Decimal::from(25),
        status,
        created_at: Utc::now(),
    }
}

/// Build a seeded product for tests.
#[must_use]
pub fn sample_product(id: &str) -> Product {
    Product {
        id: id.to_string(),
        name: format!("Product {id}"),
        description: "A fine product".to_string(),
        price: Decimal::from(25),
        category: "GENERAL".to_string(),
        image: None,
    }
}

// =============================================================================
// Routes
// =============================================================================

fn router(state: Arc<BackendState>) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/register", post(register))
        .route("/products", get(products))
        .route("/products/{id}/image", get(product_image))
        .route("/orders", post(place_order))
        .route("/customer/my/orders", get(my_orders))
        .route("/reviews/{id}", get(list_reviews).post(submit_review))
        .route("/admin/stats", get(admin_stats))
        .route("/admin/customers", get(admin_customers))
        .route("/admin/customers/{id}/orders", get(my_orders))
        .route("/admin/customers/{id}", delete(admin_delete))
        .route("/admin/orders/{id}/status", put(admin_update_status))
        .route("/admin/orders/{id}", delete(admin_delete))
        .route("/admin/products", get(products))
        .route("/admin/products/upload", post(admin_upload))
        .route("/admin/products/{id}", delete(admin_delete))
        .route("/ws/orders", get(ws_orders))
        .with_state(state)
}

async fn login(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let name = body
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("customer")
        .to_string();
    let password = body.get("password").and_then(|v| v.as_str()).unwrap_or("");

    if password.is_empty() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "message": "Invalid credentials" })),
        )
            .into_response();
    }

    let access = state.issue_access_token();
    state
        .valid_refresh_tokens
        .lock()
        .insert(REFRESH_TOKEN.to_string());

    Json(serde_json::json!({
        "accessToken": access,
        "refreshToken": REFRESH_TOKEN,
        "customerId": "c1",
        "username": name,
    }))
    .into_response()
}

async fn register(Json(body): Json<serde_json::Value>) -> Response {
    if body.get("email").and_then(|v| v.as_str()).unwrap_or("").is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "message": "Email required" })),
        )
            .into_response();
    }
    Json(serde_json::json!({ "message": "Account created" })).into_response()
}

async fn refresh(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let delay = *state.refresh_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let token = body
        .get("refreshToken")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    if state.refresh_should_fail.load(Ordering::SeqCst)
        || !state.valid_refresh_tokens.lock().contains(&token)
    {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let access = state.issue_access_token();
    Json(serde_json::json!({ "accessToken": access })).into_response()
}

async fn products(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if !state.is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.products_requests.fetch_add(1, Ordering::SeqCst);
    Json(state.products.lock().clone()).into_response()
}

async fn product_image(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(_id): Path<String>,
) -> Response {
    if !state.is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.image_requests.fetch_add(1, Ordering::SeqCst);
    vec![0xFF, 0xD8, 0xFF, 0xE0].into_response()
}

async fn place_order(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(items): Json<Vec<OrderItem>>,
) -> Response {
    if !state.is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if state.throttle_orders.load(Ordering::SeqCst) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many orders. Please wait 1 minute and try again.",
        )
            .into_response();
    }
    state.placed.lock().push(items);
    StatusCode::OK.into_response()
}

async fn my_orders(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if !state.is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if state.orders_should_fail.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "orders unavailable").into_response();
    }
    Json(state.orders.lock().clone()).into_response()
}

async fn list_reviews(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Response {
    if !state.is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let reviews = state
        .reviews
        .lock()
        .get(&product_id)
        .cloned()
        .unwrap_or_default();
    Json(reviews).into_response()
}

async fn submit_review(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
    Json(review): Json<NewReview>,
) -> Response {
    if !state.is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let saved = Review {
        username: "ada".to_string(),
        text: review.text,
        stars: review.stars,
    };
    state
        .reviews
        .lock()
        .entry(product_id)
        .or_default()
        .insert(0, saved.clone());
    Json(saved).into_response()
}

async fn admin_stats(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if !state.is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let stats = AdminStats {
        customers: 1,
        orders: state.orders.lock().len() as u64,
        products: state.products.lock().len() as u64,
    };
    Json(stats).into_response()
}

async fn admin_customers(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if !state.is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(vec![Customer {
        id: "c1".to_string(),
        name: "ada".to_string(),
    }])
    .into_response()
}

#[derive(Deserialize)]
struct StatusQuery {
    status: String,
}

async fn admin_update_status(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(order_id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Response {
    if !state.is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let Ok(status) = query.status.parse::<OrderStatus>() else {
        return (StatusCode::BAD_REQUEST, "unknown status").into_response();
    };

    if let Some(order) = state.orders.lock().iter_mut().find(|o| o.id == order_id) {
        order.status = status;
    }

    // Fan the change out on the push topic, like the real backend
    let event = serde_json::json!({ "orderId": order_id, "status": status }).to_string();
    let _ = state.events.send(event);

    StatusCode::OK.into_response()
}

async fn admin_delete(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(_id): Path<String>,
) -> Response {
    if !state.is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    StatusCode::OK.into_response()
}

async fn admin_upload(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !state.is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let mut fields = Vec::new();
    let mut file_name = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        fields.push(field.name().unwrap_or_default().to_string());
        if let Some(name) = field.file_name() {
            file_name = Some(name.to_string());
        }
        let _ = field.bytes().await;
    }

    state.uploads.lock().push(UploadRecord {
        content_type,
        fields,
        file_name,
    });
    StatusCode::OK.into_response()
}

async fn ws_orders(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if !state.is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let drop_now = state.drop_next_ws.swap(false, Ordering::SeqCst);
    ws.on_upgrade(move |socket| handle_socket(socket, state, drop_now))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<BackendState>, drop_now: bool) {
    if drop_now {
        // Dropping the socket closes the connection; the client must retry
        return;
    }

    // The client opens with a subscribe frame naming its topic
    let Some(Ok(Message::Text(frame))) = socket.recv().await else {
        return;
    };
    if !frame.as_str().contains("subscribe") {
        return;
    }

    state.subscribers.fetch_add(1, Ordering::SeqCst);
    let mut events = state.events.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(json) => {
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }

    state.subscribers.fetch_sub(1, Ordering::SeqCst);
}
