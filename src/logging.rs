use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// Middleware that logs HTTP requests at INFO level.
///
/// Logs method, path, status and latency only; headers (and with them the
/// Authorization token) are never logged.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        latency_ms = %start.elapsed().as_millis(),
        "HTTP request"
    );

    response
}
