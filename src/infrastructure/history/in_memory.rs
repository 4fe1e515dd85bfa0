use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::{ports::ConversationHistory, DomainError, Message};

#[derive(Default)]
pub struct InMemoryConversationHistory {
    sessions: RwLock<HashMap<(String, String), Vec<Message>>>,
}

impl InMemoryConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationHistory for InMemoryConversationHistory {
    async fn recent_messages(
        &self,
        owner: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, DomainError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        Ok(sessions
            .get(&(owner.to_string(), session_id.to_string()))
            .map(|messages| messages[messages.len().saturating_sub(limit)..].to_vec())
            .unwrap_or_default())
    }

    async fn append(
        &self,
        owner: &str,
        session_id: &str,
        messages: &[Message],
    ) -> Result<(), DomainError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        sessions
            .entry((owner.to_string(), session_id.to_string()))
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }
}
