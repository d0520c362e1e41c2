#![allow(dead_code)]
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::Query,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};

use busline_client::{
    auth::{extract_bearer_token, Role, SessionStore, StorageKeys, UserProfile},
    error::FetchError,
    fetch::{ApiRequest, ApiResponse, HttpTransport, Transport},
    ClientContext,
};

pub const STUB_TOKEN: &str = "stub-token-123";
pub const STUB_EMAIL: &str = "rider@test.local";
pub const STUB_PASSWORD: &str = "secret123";

// ---------------------------------------------------------------------------
// Scripted transport: every request is handed to the test, which decides
// when and how it completes.
// ---------------------------------------------------------------------------

pub struct Exchange {
    pub request: ApiRequest,
    pub reply: oneshot::Sender<Result<ApiResponse, FetchError>>,
}

impl Exchange {
    /// Complete the request. Returns `false` when the hook already gave up on
    /// it (cancelled or superseded).
    pub fn respond(self, status: u16, body: Value) -> bool {
        self.reply.send(Ok(json_response(status, body))).is_ok()
    }

    pub fn respond_raw(self, status: u16, body: &str) -> bool {
        self.reply
            .send(Ok(ApiResponse {
                status,
                body: body.as_bytes().to_vec(),
            }))
            .is_ok()
    }

    pub fn fail(self, message: &str) -> bool {
        self.reply.send(Err(FetchError::Network(message.to_string()))).is_ok()
    }
}

pub struct ScriptedTransport {
    inbox: mpsc::UnboundedSender<Exchange>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, FetchError> {
        let (reply, rx) = oneshot::channel();
        self.inbox
            .send(Exchange { request, reply })
            .map_err(|_| FetchError::Network("test inbox closed".into()))?;
        rx.await
            .map_err(|_| FetchError::Network("test dropped the reply".into()))?
    }
}

pub fn json_response(status: u16, body: Value) -> ApiResponse {
    ApiResponse {
        status,
        body: serde_json::to_vec(&body).unwrap(),
    }
}

/// Context backed by a scripted transport and an in-memory customer session.
pub fn scripted_context() -> (ClientContext, mpsc::UnboundedReceiver<Exchange>) {
    scripted_context_with(StorageKeys::CUSTOMER)
}

pub fn scripted_context_with(keys: StorageKeys) -> (ClientContext, mpsc::UnboundedReceiver<Exchange>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let transport = Arc::new(ScriptedTransport { inbox: tx });
    let session = Arc::new(SessionStore::ephemeral(keys));
    (ClientContext::new(transport, session), rx)
}

pub async fn next_exchange(inbox: &mut mpsc::UnboundedReceiver<Exchange>) -> Exchange {
    tokio::time::timeout(Duration::from_secs(2), inbox.recv())
        .await
        .expect("Timed out waiting for a request")
        .expect("Transport dropped")
}

pub async fn assert_no_exchange(inbox: &mut mpsc::UnboundedReceiver<Exchange>) {
    let res = tokio::time::timeout(Duration::from_millis(100), inbox.recv()).await;
    assert!(res.is_err(), "Expected no request to be sent");
}

/// Wait until the hook dropped its side of the exchange.
pub async fn assert_abandoned(exchange: &mut Exchange) {
    tokio::time::timeout(Duration::from_secs(2), exchange.reply.closed())
        .await
        .expect("Request was not cancelled");
}

pub fn test_user(role: Role) -> UserProfile {
    UserProfile {
        id: 7,
        name: "Test Rider".into(),
        email: STUB_EMAIL.into(),
        role,
    }
}

// ---------------------------------------------------------------------------
// Stub API server: a real Axum server on a random port standing in for the
// bus reservation backend.
// ---------------------------------------------------------------------------

fn bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("Authorization")?.to_str().ok()?;
    extract_bearer_token(value).map(str::to_string)
}

fn unauthorized() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Authentication required" })),
    )
        .into_response()
}

async fn headers_echo(headers: HeaderMap) -> Json<Value> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    Json(json!({
        "authorization": header("authorization"),
        "contentType": header("content-type"),
        "requestId": header("x-request-id"),
        "client": header("x-client"),
    }))
}

async fn body_echo(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "received": body }))
}

async fn login(Json(body): Json<Value>) -> axum::response::Response {
    if body["email"] == STUB_EMAIL && body["password"] == STUB_PASSWORD {
        Json(json!({
            "accessToken": STUB_TOKEN,
            "userId": 7,
            "name": "Test Rider",
            "email": STUB_EMAIL,
            "role": "USER",
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid credentials" })),
        )
            .into_response()
    }
}

async fn register(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "accessToken": STUB_TOKEN,
        "userId": 8,
        "name": body["name"],
        "email": body["email"],
        "role": "USER",
    }))
}

async fn cities() -> Json<Value> {
    Json(json!([
        { "id": 1, "name": "Pune", "state": "Maharashtra" },
        { "id": 2, "name": "Mumbai", "state": "Maharashtra" },
    ]))
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({
        "fromCity": params.get("fromCityId"),
        "toCity": params.get("toCityId"),
        "date": params.get("date"),
        "buses": [{
            "id": 11,
            "name": "Night Rider",
            "type": "AC Sleeper",
            "route": "Pune - Mumbai",
            "departureTime": "22:00:00",
            "arrivalTime": "02:30:00",
            "duration": "4h 30m",
            "availableSeats": params.get("seats").and_then(|s| s.parse::<i32>().ok()).unwrap_or(0),
            "price": 650,
        }],
    }))
}

async fn my_bookings(headers: HeaderMap) -> axum::response::Response {
    if bearer(&headers).as_deref() != Some(STUB_TOKEN) {
        return unauthorized();
    }
    Json(json!([{
        "id": 31,
        "pnr": "PNR12345",
        "busName": "Night Rider",
        "tripDate": "2025-03-14",
        "fromStop": "Pune",
        "toStop": "Mumbai",
        "status": "CONFIRMED",
        "bookingTime": "2025-03-01T10:15:00",
        "seats": [4, 5],
        "passengers": [
            { "name": "A", "age": 30, "gender": "Male", "seatNo": 4 },
            { "name": "B", "age": 28, "gender": "Female", "seatNo": 5 },
        ],
    }]))
    .into_response()
}

async fn create_booking(headers: HeaderMap, Json(body): Json<Value>) -> axum::response::Response {
    if bearer(&headers).as_deref() != Some(STUB_TOKEN) {
        return unauthorized();
    }
    Json(json!({
        "bookingId": 99,
        "pnr": format!("PNR{}", body["busId"]),
        "status": "CONFIRMED",
        "bookingTime": "2025-03-01T10:15:00",
    }))
    .into_response()
}

async fn plain_unauthorized() -> impl IntoResponse {
    (StatusCode::UNAUTHORIZED, "nope")
}

async fn not_json() -> &'static str {
    "hello"
}

/// Spin up the stub API on a random port and return its address.
pub async fn setup_stub_server() -> SocketAddr {
    let app = Router::new()
        .route("/api/headers", get(headers_echo).post(headers_echo))
        .route("/api/echo", post(body_echo).put(body_echo))
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/cities", get(cities))
        .route("/api/buses/search", get(search))
        .route("/api/user/bookings", get(my_bookings))
        .route("/api/bookings", post(create_booking))
        .route("/api/plain-401", get(plain_unauthorized))
        .route("/api/not-json", get(not_json));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

/// Context talking HTTP to `addr` with an in-memory customer session.
pub fn http_context(addr: SocketAddr) -> ClientContext {
    let transport = HttpTransport::new(format!("http://{}", addr), Some(Duration::from_secs(5)))
        .expect("Failed to build HTTP transport");
    let session = Arc::new(SessionStore::ephemeral(StorageKeys::CUSTOMER));
    ClientContext::new(Arc::new(transport), session)
}
