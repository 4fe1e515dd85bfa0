use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Identity of the caller, taken from the `X-User-Id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

impl CallerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub async fn require_caller(mut request: Request, next: Next) -> Result<Response, StatusCode> {
    let caller = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| CallerId(v.to_string()))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
