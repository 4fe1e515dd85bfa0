use crate::domain::errors::DomainError;
use async_trait::async_trait;

/// Generation collaborator that answers from an assembled context.
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, DomainError>;
    fn model(&self) -> &str;
}
