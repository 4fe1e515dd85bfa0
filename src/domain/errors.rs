use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Chunk {index} of document {document_id} already exists")]
    DuplicateChunk { document_id: Uuid, index: usize },

    #[error("Retrieval superseded by a newer query for session {0}")]
    Superseded(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl DomainError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    pub fn embedding_unavailable(msg: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable(msg.into())
    }

    pub fn superseded(session_id: impl Into<String>) -> Self {
        Self::Superseded(session_id.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
