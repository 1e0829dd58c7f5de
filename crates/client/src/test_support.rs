// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a scripted transport and an in-process fake
//! backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::credential::CredentialStore;
use crate::gateway::retry::BackoffPolicy;
use crate::gateway::{GatewayClient, GatewayOptions};
use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync;

/// One request as seen by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub request: ApiRequest,
    pub at: tokio::time::Instant,
}

/// Transport answering from a closure, recording everything it was sent.
///
/// Per-path delays hold a response back so concurrent callers can pile up
/// behind it (e.g. behind a slow refresh).
pub struct ScriptedTransport {
    handler: Box<Handler>,
    delays: HashMap<String, Duration>,
    sent: Mutex<Vec<SentRequest>>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    {
        Self { handler: Box::new(handler), delays: HashMap::new(), sent: Mutex::new(Vec::new()) }
    }

    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_owned(), delay);
        self
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.sent.lock().iter().filter(|s| s.request.path == path).count()
    }

    /// Bearer tokens sent to `path`, in send order.
    pub fn bearers_for(&self, path: &str) -> Vec<Option<String>> {
        self.sent
            .lock()
            .iter()
            .filter(|s| s.request.path == path)
            .map(|s| s.request.bearer.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let at = tokio::time::Instant::now();
        self.sent.lock().push(SentRequest { request: request.clone(), at });
        if let Some(delay) = self.delays.get(&request.path) {
            tokio::time::sleep(*delay).await;
        }
        (self.handler)(&request)
    }
}

pub fn json_response(status: u16, value: Value) -> ApiResponse {
    let mut resp = ApiResponse::new(status, value.to_string());
    resp.headers.push(("content-type".to_owned(), "application/json".to_owned()));
    resp
}

pub fn has_bearer(request: &ApiRequest, token: &str) -> bool {
    request.bearer.as_deref() == Some(token)
}

/// Default options with a millisecond backoff base.
pub fn fast_options() -> GatewayOptions {
    GatewayOptions {
        policy: BackoffPolicy { max_network_retries: 2, base: Duration::from_millis(5) },
        ..GatewayOptions::default()
    }
}

pub fn test_gateway(
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    options: GatewayOptions,
) -> Arc<GatewayClient> {
    Arc::new(GatewayClient::new(transport, store, options))
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

// -- Fake backend -------------------------------------------------------------

pub const FAKE_EMAIL: &str = "billing@clinic.test";
pub const FAKE_PASSWORD: &str = "correct-horse";
pub const FAKE_SSO_TOKEN: &str = "sso-ok";

/// In-process stand-in for the backend REST API.
///
/// Issues numbered tokens, accepts only the most recent access token, and
/// counts refresh calls.
pub struct FakeBackend {
    access_token: Mutex<Option<String>>,
    refresh_token: Mutex<Option<String>>,
    issued: AtomicU32,
    refresh_calls: AtomicU32,
    refresh_delay: Duration,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Self::with_refresh_delay(Duration::ZERO)
    }

    pub fn with_refresh_delay(refresh_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            access_token: Mutex::new(None),
            refresh_token: Mutex::new(None),
            issued: AtomicU32::new(0),
            refresh_calls: AtomicU32::new(0),
            refresh_delay,
        })
    }

    pub fn refresh_calls(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.lock().clone()
    }

    /// Invalidate the current access token, as if it expired.
    pub fn expire_access_token(&self) {
        *self.access_token.lock() = Some(self.issue("retired"));
    }

    /// Invalidate the refresh token; the next refresh gets 401.
    pub fn revoke_refresh_token(&self) {
        *self.refresh_token.lock() = None;
    }

    fn issue(&self, prefix: &str) -> String {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}-{n}")
    }

    fn start_session(&self) -> Value {
        let access = self.issue("access");
        let refresh = self.issue("refresh");
        *self.access_token.lock() = Some(access.clone());
        *self.refresh_token.lock() = Some(refresh.clone());
        json!({
            "access_token": access,
            "refresh_token": refresh,
            "user": { "name": "Billing Desk", "email": FAKE_EMAIL },
        })
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let presented = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        match (presented, self.access_token.lock().as_deref()) {
            (Some(p), Some(current)) if p == current => Ok(()),
            _ => Err(error(StatusCode::UNAUTHORIZED, "token expired")),
        }
    }
}

fn error(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

type Backend = State<Arc<FakeBackend>>;

async fn login(State(b): Backend, Json(body): Json<Value>) -> Response {
    if body["email"] == FAKE_EMAIL && body["password"] == FAKE_PASSWORD {
        Json(b.start_session()).into_response()
    } else {
        error(StatusCode::UNAUTHORIZED, "invalid credentials")
    }
}

async fn sso_exchange(State(b): Backend, Json(body): Json<Value>) -> Response {
    if body["token"] == FAKE_SSO_TOKEN {
        Json(b.start_session()).into_response()
    } else {
        error(StatusCode::UNAUTHORIZED, "invalid sso token")
    }
}

async fn refresh(State(b): Backend, Json(body): Json<Value>) -> Response {
    b.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if !b.refresh_delay.is_zero() {
        tokio::time::sleep(b.refresh_delay).await;
    }
    let valid = matches!(
        (body["refresh_token"].as_str(), b.refresh_token.lock().as_deref()),
        (Some(presented), Some(current)) if presented == current
    );
    if !valid {
        return error(StatusCode::UNAUTHORIZED, "refresh token revoked");
    }
    let access = b.issue("access");
    *b.access_token.lock() = Some(access.clone());
    Json(json!({ "access_token": access })).into_response()
}

async fn logout(State(b): Backend) -> Response {
    *b.access_token.lock() = None;
    *b.refresh_token.lock() = None;
    StatusCode::NO_CONTENT.into_response()
}

async fn me(State(b): Backend, headers: HeaderMap) -> Response {
    if let Err(resp) = b.authorize(&headers) {
        return resp;
    }
    Json(json!({ "name": "Billing Desk", "email": FAKE_EMAIL, "role": "admin" })).into_response()
}

async fn patients(
    State(b): Backend,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(resp) = b.authorize(&headers) {
        return resp;
    }
    Json(json!({
        "patients": [
            { "id": "p-1", "name": "Ada Lovelace", "balance": 125.5, "status": "outstanding" },
        ],
        "query": query,
    }))
    .into_response()
}

async fn patient(State(b): Backend, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(resp) = b.authorize(&headers) {
        return resp;
    }
    if id == "p-1" {
        Json(json!({ "id": "p-1", "name": "Ada Lovelace", "balance": 125.5 })).into_response()
    } else {
        error(StatusCode::NOT_FOUND, "patient not found")
    }
}

async fn start_call(State(b): Backend, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(resp) = b.authorize(&headers) {
        return resp;
    }
    match body["patient_id"].as_str() {
        Some(id) if !id.is_empty() => {
            let call = json!({ "call_id": "c-1", "patient_id": id, "status": "queued" });
            (StatusCode::CREATED, Json(call)).into_response()
        }
        _ => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": [{ "loc": ["body", "patient_id"], "msg": "field required" }] })),
        )
            .into_response(),
    }
}

async fn calls(State(b): Backend, headers: HeaderMap) -> Response {
    if let Err(resp) = b.authorize(&headers) {
        return resp;
    }
    Json(json!({ "calls": [] })).into_response()
}

async fn stats(State(b): Backend, headers: HeaderMap) -> Response {
    if let Err(resp) = b.authorize(&headers) {
        return resp;
    }
    Json(json!({ "outstanding_total": 125.5, "calls_today": 3 })).into_response()
}

async fn users(State(b): Backend, headers: HeaderMap) -> Response {
    if let Err(resp) = b.authorize(&headers) {
        return resp;
    }
    error(StatusCode::INTERNAL_SERVER_ERROR, "user directory unavailable")
}

async fn upload(State(b): Backend, headers: HeaderMap, body: axum::body::Bytes) -> Response {
    if let Err(resp) = b.authorize(&headers) {
        return resp;
    }
    let is_multipart = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));
    if !is_multipart {
        return error(StatusCode::BAD_REQUEST, "expected multipart upload");
    }
    let text = String::from_utf8_lossy(&body);
    let file_name = text
        .split("filename=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .unwrap_or_default()
        .to_owned();
    Json(json!({ "uploaded": true, "file_name": file_name })).into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "ok": true })).into_response()
}

pub fn fake_backend_router(backend: Arc<FakeBackend>) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/sso/exchange", post(sso_exchange))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/patients", get(patients))
        .route("/patients/{id}", get(patient))
        .route("/calls", post(start_call).get(calls))
        .route("/dashboard/stats", get(stats))
        .route("/users", get(users))
        .route("/invoices/upload", post(upload))
        .route("/slow", get(slow))
        .with_state(backend)
}

/// Spawn the fake backend on a random port.
///
/// Returns the bound address and a join handle for the server task.
pub async fn spawn_fake_backend(
    backend: Arc<FakeBackend>,
) -> anyhow::Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>)> {
    let router = fake_backend_router(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok((addr, handle))
}
