//! Request-id, request-logging and CORS middleware.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use axum::extract::Request;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

/// Request id header, echoed back when the client supplies one.
pub const REQUEST_ID_HEADER: &str = "X-ASIT-REQUESTID";

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);
static REQUEST_ID_PREFIX: OnceLock<String> = OnceLock::new();

/// Generated ids are `<process-uuid>-<counter>`; the counter exists only for
/// log correlation.
fn next_request_id() -> String {
    let prefix = REQUEST_ID_PREFIX.get_or_init(|| Uuid::new_v4().to_string());
    let seq = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("{prefix}-{seq}")
}

/// Attach a request id and emit one structured log line per request.
pub async fn request_log(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(next_request_id);

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    tracing::info!(
        rid = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

/// Answer CORS preflight directly and mark every other response.
pub async fn cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return (
            StatusCode::OK,
            [
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
                (
                    header::ACCESS_CONTROL_ALLOW_METHODS,
                    "POST, GET, OPTIONS, PUT, DELETE, PATCH",
                ),
                (
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    "Accept, Content-Type, Content-Length, Accept-Encoding, X-CSRF-Token, Authorization, Cache-Control",
                ),
            ],
        )
            .into_response();
    }

    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}
