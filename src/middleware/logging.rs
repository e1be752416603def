//! Request logging middleware.
//!
//! Logs every HTTP request with method, path, status code, and latency.
//! Session cookies are never logged.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn, Instrument};

/// Health probe path, excluded from logging
pub const HEALTH_PATH: &str = "/health";

/// Middleware that logs HTTP requests with timing information.
///
/// 5xx responses log at WARN, everything else at INFO.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if path == HEALTH_PATH {
        return next.run(request).await;
    }

    let start = Instant::now();

    let span = tracing::info_span!(
        "http_request",
        method = %method,
        path = %path,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    );

    // The span is only entered while the inner future is polled
    let response = next.run(request).instrument(span.clone()).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    span.record("status", status);
    span.record("latency_ms", latency_ms);

    span.in_scope(|| {
        if status >= 500 {
            warn!(method = %method, path = %path, status, latency_ms, "Request failed (5xx)");
        } else if status >= 400 {
            info!(method = %method, path = %path, status, latency_ms, "Request rejected (4xx)");
        } else {
            info!(method = %method, path = %path, status, latency_ms, "Request completed");
        }
    });

    response
}
