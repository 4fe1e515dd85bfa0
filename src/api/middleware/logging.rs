use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use super::auth::USER_ID_HEADER;

pub async fn request_logger(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let caller = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed_ms = start.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        tracing::warn!(%method, %path, %caller, status, elapsed_ms, "request failed");
    } else {
        tracing::info!(%method, %path, %caller, status, elapsed_ms, "request completed");
    }

    response
}
