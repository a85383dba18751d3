//! Middleware for the HTTP server.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use log::debug;
use std::time::Instant;

/// Log every request method, path, status and latency.
pub async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();
    let response = next.run(request).await;
    debug!(
        "{method} {path} -> {} ({} ms)",
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}
