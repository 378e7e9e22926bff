//! Audit logging middleware.
//!
//! Logs every protected API request with a request id, the calling
//! account, method, path and response status. Runs after auth has injected the
//! `Principal` and before the role gate, so refusals are logged too.

use std::time::Instant;

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::authorization::Principal;

/// Log API access for the audit trail and tag the response with `X-Request-Id`.
pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let account = req
        .extensions()
        .get::<Principal>()
        .map(|p| p.username.clone())
        .unwrap_or_else(|| "-".to_string());
    let started = Instant::now();

    let mut response = next.run(req).await;

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        tracing::error!(%request_id, %account, %method, %path, status, elapsed_ms, "API request failed");
    } else {
        tracing::info!(%request_id, %account, %method, %path, status, elapsed_ms, "API request");
    }

    if let Ok(val) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert("X-Request-Id", val);
    }
    response
}
