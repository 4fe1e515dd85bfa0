use deadpool_redis::{Config, Pool, Runtime};

use crate::domain::DomainError;

pub type RedisPool = Pool;

pub mod keys {
    use uuid::Uuid;

    pub const DOCUMENT_INDEX: &str = "documents";

    pub fn document(document_id: &Uuid) -> String {
        format!("document:{}", document_id)
    }

    /// The owner is length-prefixed so ids containing `:` cannot collide.
    pub fn conversation(owner: &str, session_id: &str) -> String {
        format!("conversation:{}:{}:{}", owner.len(), owner, session_id)
    }
}

pub fn create_pool(redis_url: &str) -> Result<RedisPool, DomainError> {
    let cfg = Config::from_url(redis_url);
    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| DomainError::external(format!("Redis pool error: {e}")))
}

pub(crate) async fn connection(pool: &RedisPool) -> Result<deadpool_redis::Connection, DomainError> {
    pool.get()
        .await
        .map_err(|e| DomainError::external(format!("Redis pool error: {e}")))
}

pub(crate) fn redis_error(e: deadpool_redis::redis::RedisError) -> DomainError {
    DomainError::external(format!("Redis error: {e}"))
}
