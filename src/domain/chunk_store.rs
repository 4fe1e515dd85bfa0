use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::domain::{Chunk, DomainError, Result};

#[derive(Debug, Default)]
struct StoreInner {
    dimension: Option<usize>,
    chunks: Vec<Arc<Chunk>>,
    keys: HashSet<(Uuid, usize)>,
}

/// In-memory chunk set scanned by retrieval.
///
/// Writers insert one chunk at a time under the write lock; readers take an
/// `Arc` snapshot and score it without holding the lock. Every stored
/// embedding has the same dimension.
#[derive(Debug, Default)]
pub struct ChunkStore {
    inner: RwLock<StoreInner>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that only accepts embeddings of `dimension`.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                dimension: Some(dimension),
                ..StoreInner::default()
            }),
        }
    }

    pub fn dimension(&self) -> Result<Option<usize>> {
        Ok(self.read()?.dimension)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.chunks.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Checks a chunk against the store invariants without inserting it.
    pub fn validate(&self, chunk: &Chunk) -> Result<()> {
        let inner = self.read()?;
        check(&inner, chunk)
    }

    /// Validates and inserts a single chunk atomically.
    pub fn insert(&self, chunk: Chunk) -> Result<Arc<Chunk>> {
        let mut inner = self.write()?;
        check(&inner, &chunk)?;

        if inner.dimension.is_none() {
            inner.dimension = Some(chunk.embedding.dimension());
        }
        inner.keys.insert((chunk.document_id, chunk.index));
        let chunk = Arc::new(chunk);
        inner.chunks.push(Arc::clone(&chunk));
        Ok(chunk)
    }

    pub fn snapshot(&self) -> Result<Vec<Arc<Chunk>>> {
        Ok(self.read()?.chunks.clone())
    }

    pub fn chunks_for(&self, document_id: Uuid) -> Result<Vec<Arc<Chunk>>> {
        let mut chunks: Vec<Arc<Chunk>> = self
            .read()?
            .chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.index);
        Ok(chunks)
    }

    /// Removes every chunk of a document, returning how many were dropped.
    pub fn remove_document(&self, document_id: Uuid) -> Result<usize> {
        let mut inner = self.write()?;
        let before = inner.chunks.len();
        inner.chunks.retain(|c| c.document_id != document_id);
        inner.keys.retain(|(doc, _)| *doc != document_id);
        Ok(before - inner.chunks.len())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, StoreInner>> {
        self.inner
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, StoreInner>> {
        self.inner
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))
    }
}

fn check(inner: &StoreInner, chunk: &Chunk) -> Result<()> {
    if chunk.text.trim().is_empty() {
        return Err(DomainError::validation("chunk text must not be empty"));
    }
    let actual = chunk.embedding.dimension();
    if actual == 0 {
        return Err(DomainError::validation("chunk embedding must not be empty"));
    }
    if let Some(expected) = inner.dimension {
        if expected != actual {
            return Err(DomainError::DimensionMismatch { expected, actual });
        }
    }
    if inner.keys.contains(&(chunk.document_id, chunk.index)) {
        return Err(DomainError::DuplicateChunk {
            document_id: chunk.document_id,
            index: chunk.index,
        });
    }
    Ok(())
}
