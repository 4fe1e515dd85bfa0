use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::DomainError;

/// A [`DomainError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DomainError::Validation(_) | DomainError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::DuplicateChunk { .. } | DomainError::Superseded(_) => StatusCode::CONFLICT,
            DomainError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            DomainError::ExternalService(_) | DomainError::EmbeddingUnavailable(_) => {
                StatusCode::BAD_GATEWAY
            }
            DomainError::DimensionMismatch { .. } | DomainError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, status = status.as_u16(), "request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "request rejected");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DomainError::invalid_query("empty"), StatusCode::BAD_REQUEST),
            (DomainError::validation("bad"), StatusCode::BAD_REQUEST),
            (DomainError::not_found("doc"), StatusCode::NOT_FOUND),
            (DomainError::superseded("s1"), StatusCode::CONFLICT),
            (
                DomainError::DuplicateChunk {
                    document_id: Uuid::nil(),
                    index: 0,
                },
                StatusCode::CONFLICT,
            ),
            (DomainError::timeout("llm"), StatusCode::GATEWAY_TIMEOUT),
            (DomainError::external("redis"), StatusCode::BAD_GATEWAY),
            (DomainError::internal("lock"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(ApiError(error).status(), expected);
        }
    }
}
