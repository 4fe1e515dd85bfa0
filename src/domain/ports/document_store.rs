use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::{errors::DomainError, Document};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn save_document(&self, doc: &Document) -> Result<(), DomainError>;
    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, DomainError>;
    async fn list_documents(&self) -> Result<Vec<Document>, DomainError>;
    async fn delete_document(&self, id: Uuid) -> Result<(), DomainError>;
}
