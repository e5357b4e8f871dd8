//! Stand-in for the endpoint under test.
//!
//! `POST /api/v1/some_rest_api_endpoint` echoes `requesting_service_name` back. Path prefixes
//! change the behavior:
//!
//! - `/delay/ms/:delay_ms/...` sleeps before answering
//! - `/malformed/...` answers with a name that is too long
//! - `/error/...` answers with an `"error"` member
//! - `/status/:code/...` answers with the given status code
//!
//! Every request must carry a fresh `idempotency-key`; a repeated key is answered with `409`.
//! Only the most recent keys are remembered, so memory stays flat during long runs.
use axum::{
    debug_handler,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::debug;

const ENDPOINT: &str = "/api/v1/some_rest_api_endpoint";
const MAX_TRACKED_KEYS: usize = 100_000;

#[derive(Clone, Default)]
struct AppState {
    seen_keys: Arc<Mutex<SeenKeys>>,
}

/// Idempotency keys already used, oldest evicted first once `capacity` is reached.
#[derive(Debug)]
struct SeenKeys {
    keys: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl Default for SeenKeys {
    fn default() -> Self {
        Self::with_capacity(MAX_TRACKED_KEYS)
    }
}

impl SeenKeys {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// `false` if the key is still remembered.
    fn insert(&mut self, key: &str) -> bool {
        if self.keys.contains(key) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.keys.remove(&oldest);
            }
        }
        self.keys.insert(key.to_string());
        self.order.push_back(key.to_string());
        true
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

#[derive(Debug, Deserialize)]
pub struct Payload {
    pub requesting_service_name: String,
}

pub fn router() -> Router {
    Router::new()
        .route(ENDPOINT, post(echo))
        .route(&format!("/delay/ms/:delay_ms{ENDPOINT}"), post(delay))
        .route(&format!("/malformed{ENDPOINT}"), post(malformed))
        .route(&format!("/error{ENDPOINT}"), post(error))
        .route(&format!("/status/:code{ENDPOINT}"), post(status))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::default())
}

pub async fn run(listener: TcpListener) -> anyhow::Result<()> {
    axum::serve(listener, router()).await?;
    Ok(())
}

/// Serve on an ephemeral local port in the background.
pub async fn spawn() -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = run(listener).await {
            tracing::error!("Mock service stopped: {err}");
        }
    });
    Ok(addr)
}

fn check_headers(state: &AppState, headers: &HeaderMap) -> Result<(), StatusCode> {
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);

    let accepts_json = headers
        .get("accept")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "application/json");
    if !accepts_json {
        return Err(StatusCode::NOT_ACCEPTABLE);
    }

    let key = headers
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::BAD_REQUEST)?;

    let mut seen = state
        .seen_keys
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !seen.insert(key) {
        debug!("Repeated idempotency key {key}");
        return Err(StatusCode::CONFLICT);
    }
    Ok(())
}

#[debug_handler]
async fn echo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Payload>,
) -> Result<Json<Value>, StatusCode> {
    check_headers(&state, &headers)?;
    Ok(Json(
        json!({ "requesting_service_name": payload.requesting_service_name }),
    ))
}

#[debug_handler]
async fn delay(
    State(state): State<AppState>,
    Path(delay_ms): Path<u64>,
    headers: HeaderMap,
    Json(payload): Json<Payload>,
) -> Result<Json<Value>, StatusCode> {
    check_headers(&state, &headers)?;
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    Ok(Json(
        json!({ "requesting_service_name": payload.requesting_service_name }),
    ))
}

#[debug_handler]
async fn malformed(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    check_headers(&state, &headers)?;
    Ok(Json(json!({ "requesting_service_name": "x".repeat(46) })))
}

#[debug_handler]
async fn error(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    check_headers(&state, &headers)?;
    Ok(Json(json!({ "error": "mock failure" })))
}

#[debug_handler]
async fn status(
    State(state): State<AppState>,
    Path(code): Path<u16>,
    headers: HeaderMap,
    Json(payload): Json<Payload>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    check_headers(&state, &headers)?;
    let code = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((
        code,
        Json(json!({ "requesting_service_name": payload.requesting_service_name })),
    ))
}

/** RPS Printer **/

static TPS_MEASURE: AtomicU64 = AtomicU64::new(0);

pub async fn tps_measure_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let requests = TPS_MEASURE.swap(0, Ordering::Relaxed);
        println!("{requests} RPS");
    }
}
