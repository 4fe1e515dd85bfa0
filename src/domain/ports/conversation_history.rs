use async_trait::async_trait;

use crate::domain::{errors::DomainError, Message};

#[async_trait]
pub trait ConversationHistory: Send + Sync {
    /// Up to `limit` most recent messages of the owner's session, oldest first.
    async fn recent_messages(
        &self,
        owner: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, DomainError>;
    async fn append(
        &self,
        owner: &str,
        session_id: &str,
        messages: &[Message],
    ) -> Result<(), DomainError>;
}
