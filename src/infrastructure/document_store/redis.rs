use async_trait::async_trait;
use deadpool_redis::redis::{pipe, AsyncCommands};
use uuid::Uuid;

use crate::domain::{ports::DocumentStore, Document, DomainError};
use crate::infrastructure::redis::{connection, keys, redis_error, RedisPool};

/// Document records as JSON strings, indexed by a Redis set of ids.
pub struct RedisDocumentStore {
    pool: RedisPool,
}

impl RedisDocumentStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for RedisDocumentStore {
    async fn save_document(&self, doc: &Document) -> Result<(), DomainError> {
        let json = serde_json::to_string(doc).map_err(|e| DomainError::internal(e.to_string()))?;
        let mut conn = connection(&self.pool).await?;
        pipe()
            .atomic()
            .set(keys::document(&doc.id), json)
            .ignore()
            .sadd(keys::DOCUMENT_INDEX, doc.id.to_string())
            .ignore()
            .query_async::<()>(&mut *conn)
            .await
            .map_err(redis_error)
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, DomainError> {
        let mut conn = connection(&self.pool).await?;
        let raw: Option<String> = conn.get(keys::document(&id)).await.map_err(redis_error)?;

        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| DomainError::internal(format!("corrupt document {id}: {e}")))
        })
        .transpose()
    }

    async fn list_documents(&self) -> Result<Vec<Document>, DomainError> {
        let mut conn = connection(&self.pool).await?;
        let ids: Vec<String> = conn
            .smembers(keys::DOCUMENT_INDEX)
            .await
            .map_err(redis_error)?;

        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            let Ok(id) = id.parse::<Uuid>() else {
                tracing::warn!(id = %id, "skipping malformed document id");
                continue;
            };
            let raw: Option<String> = conn.get(keys::document(&id)).await.map_err(redis_error)?;
            match raw.map(|json| serde_json::from_str::<Document>(&json)) {
                Some(Ok(doc)) => documents.push(doc),
                Some(Err(e)) => tracing::warn!(document_id = %id, error = %e, "skipping corrupt document"),
                None => {}
            }
        }
        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(documents)
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = connection(&self.pool).await?;
        pipe()
            .atomic()
            .del(keys::document(&id))
            .ignore()
            .srem(keys::DOCUMENT_INDEX, id.to_string())
            .ignore()
            .query_async::<()>(&mut *conn)
            .await
            .map_err(redis_error)
    }
}
