use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{errors::DomainError, Chunk};

/// Durable storage the in-memory chunk store is rehydrated from.
#[async_trait]
pub trait ChunkRepository: Send + Sync {
    async fn save_chunks(&self, chunks: &[Chunk]) -> Result<(), DomainError>;
    async fn load_chunks(&self, document_ids: &[Uuid]) -> Result<Vec<Chunk>, DomainError>;
    async fn delete_by_document(&self, document_id: Uuid) -> Result<(), DomainError>;
}
