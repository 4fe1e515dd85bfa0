use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::domain::{ports::DocumentStore, Document, DomainError};

#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<Uuid, Document>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn save_document(&self, doc: &Document) -> Result<(), DomainError> {
        self.documents
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .insert(doc.id, doc.clone());
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, DomainError> {
        Ok(self
            .documents
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .get(&id)
            .cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>, DomainError> {
        let mut documents: Vec<Document> = self
            .documents
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .values()
            .cloned()
            .collect();
        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(documents)
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), DomainError> {
        self.documents
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .remove(&id);
        Ok(())
    }
}
