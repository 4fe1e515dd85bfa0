use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use super::{DocumentService, RagService, RetrievalRequest};
use crate::domain::{
    ports::{ConversationHistory, LlmService},
    ConversationMemory, DomainError, LengthHint, Message, Result, ScoredChunk, MEMORY_WINDOW,
};

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub session_id: String,
    pub answer: String,
    pub sources: Vec<ScoredChunk>,
    pub length_hint: LengthHint,
    pub degraded: bool,
}

/// Prompt text the chat service sends with every generation.
#[derive(Debug, Clone)]
pub struct ChatPrompt {
    pub system: String,
    /// Returned verbatim when retrieval finds nothing to answer from.
    pub no_context_message: String,
}

pub struct ChatService {
    rag: Arc<RagService>,
    documents: Arc<DocumentService>,
    history: Arc<dyn ConversationHistory>,
    llm: Arc<dyn LlmService>,
    prompt: ChatPrompt,
    history_limit: usize,
    llm_timeout: Duration,
}

impl ChatService {
    pub fn new(
        rag: Arc<RagService>,
        documents: Arc<DocumentService>,
        history: Arc<dyn ConversationHistory>,
        llm: Arc<dyn LlmService>,
        prompt: ChatPrompt,
    ) -> Self {
        Self {
            rag,
            documents,
            history,
            llm,
            prompt,
            history_limit: MEMORY_WINDOW,
            llm_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    #[instrument(skip(self, message), fields(model = self.llm.model()))]
    pub async fn chat(&self, caller: &str, session_id: &str, message: &str) -> Result<ChatReply> {
        if session_id.trim().is_empty() {
            return Err(DomainError::validation("session id must not be empty"));
        }

        let accessible = self.documents.accessible_ids(caller).await?;
        let memory = ConversationMemory::from_messages(
            self.history
                .recent_messages(caller, session_id, self.history_limit)
                .await?,
        );

        let outcome = self
            .rag
            .retrieve(RetrievalRequest {
                query: message.to_string(),
                accessible_document_ids: accessible,
                memory,
                caller: caller.to_string(),
                session_id: Some(session_id.to_string()),
            })
            .await?;

        let answer = if outcome.ranked_chunks.is_empty() {
            tracing::debug!("no relevant chunks, skipping generation");
            self.prompt.no_context_message.clone()
        } else {
            let prompt = format!(
                "{}\n\nQuestion: {}",
                outcome.assembled_context.text,
                message.trim()
            );
            tokio::time::timeout(self.llm_timeout, self.llm.generate(&self.prompt.system, &prompt))
                .await
                .map_err(|_| {
                    DomainError::timeout(format!(
                        "generation exceeded {}s",
                        self.llm_timeout.as_secs()
                    ))
                })??
        };

        self.history
            .append(
                caller,
                session_id,
                &[Message::user(message), Message::assistant(answer.as_str())],
            )
            .await?;

        Ok(ChatReply {
            session_id: session_id.to_string(),
            answer,
            sources: outcome.ranked_chunks,
            length_hint: outcome.length_hint,
            degraded: outcome.degraded,
        })
    }

    /// Stored messages of one of the caller's sessions, oldest first.
    pub async fn history(
        &self,
        caller: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>> {
        self.history.recent_messages(caller, session_id, limit).await
    }
}
