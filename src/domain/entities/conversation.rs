use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of prior messages carried into retrieval and generation.
pub const MEMORY_WINDOW: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "System",
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// The most recent messages of a session, oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationMemory {
    messages: Vec<Message>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only the trailing [`MEMORY_WINDOW`] messages.
    pub fn from_messages(mut messages: Vec<Message>) -> Self {
        if messages.len() > MEMORY_WINDOW {
            messages.drain(..messages.len() - MEMORY_WINDOW);
        }
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_keeps_most_recent_window() {
        let messages: Vec<Message> = (0..10).map(|i| Message::user(format!("m{i}"))).collect();
        let memory = ConversationMemory::from_messages(messages);

        assert_eq!(memory.len(), MEMORY_WINDOW);
        assert_eq!(memory.messages()[0].content, "m4");
        assert_eq!(memory.messages()[5].content, "m9");
    }
}
