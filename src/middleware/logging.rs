//! Request logging middleware.
//!
//! Logs every HTTP request with method, path, status code, and latency.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Logs at INFO level for completed requests, WARN level for 5xx.
/// Health checks pass through unlogged.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if path == "/health" {
        return next.run(request).await;
    }

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("http_request", %request_id);
    let start = Instant::now();

    let response = next.run(request).instrument(span.clone()).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    let _guard = span.enter();
    if status >= 500 {
        warn!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            "Request failed (5xx)"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            "Request completed"
        );
    }

    response
}
