use async_trait::async_trait;
use std::sync::RwLock;
use uuid::Uuid;

use crate::domain::{ports::ChunkRepository, Chunk, DomainError};

/// Process-local chunk persistence for tests and single-node runs.
pub struct InMemoryChunkRepository {
    chunks: RwLock<Vec<Chunk>>,
}

impl InMemoryChunkRepository {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryChunkRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkRepository for InMemoryChunkRepository {
    async fn save_chunks(&self, chunks: &[Chunk]) -> Result<(), DomainError> {
        let mut store = self
            .chunks
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        for chunk in chunks {
            store.retain(|c| c.id != chunk.id);
            store.push(chunk.clone());
        }
        Ok(())
    }

    async fn load_chunks(&self, document_ids: &[Uuid]) -> Result<Vec<Chunk>, DomainError> {
        let store = self
            .chunks
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        Ok(store
            .iter()
            .filter(|c| document_ids.contains(&c.document_id))
            .cloned()
            .collect())
    }

    async fn delete_by_document(&self, document_id: Uuid) -> Result<(), DomainError> {
        let mut store = self
            .chunks
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        store.retain(|chunk| chunk.document_id != document_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChunkMetadata, Embedding, SourceType};

    fn chunk(document_id: Uuid, index: usize) -> Chunk {
        Chunk::new(
            document_id,
            index,
            "test content",
            Embedding::new(vec![1.0, 0.0, 0.0]),
            ChunkMetadata::new(SourceType::Text, "doc.txt"),
        )
    }

    #[tokio::test]
    async fn test_save_and_load_filters_by_document() {
        let repo = InMemoryChunkRepository::new();
        let doc = Uuid::new_v4();
        let other = Uuid::new_v4();

        repo.save_chunks(&[chunk(doc, 0), chunk(doc, 1), chunk(other, 0)])
            .await
            .unwrap();
        // Saving the same chunk again replaces it.
        repo.save_chunks(&[chunk(doc, 0)]).await.unwrap();

        assert_eq!(repo.load_chunks(&[doc]).await.unwrap().len(), 2);
        assert_eq!(repo.load_chunks(&[doc, other]).await.unwrap().len(), 3);
        assert!(repo.load_chunks(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_document() {
        let repo = InMemoryChunkRepository::new();
        let doc_id = Uuid::new_v4();

        repo.save_chunks(&[chunk(doc_id, 0)]).await.unwrap();
        repo.delete_by_document(doc_id).await.unwrap();

        assert!(repo.load_chunks(&[doc_id]).await.unwrap().is_empty());
    }
}
