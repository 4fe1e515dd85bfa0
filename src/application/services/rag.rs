use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use super::{EmbeddingClient, SessionRegistry};
use crate::domain::{
    classifier::classify,
    context::{assemble, AssembledContext},
    retrieval::rank_chunks,
    ChunkStore, ConversationMemory, DomainError, LengthHint, Query, Result, RetrievalOptions,
    ScoredChunk, Scorer,
};

#[derive(Debug, Clone, Default)]
pub struct RetrievalRequest {
    pub query: String,
    pub accessible_document_ids: HashSet<Uuid>,
    pub memory: ConversationMemory,
    /// Owner of `session_id`; sessions of different callers never interact.
    pub caller: String,
    /// Retrievals sharing a caller and session id supersede each other.
    pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    pub ranked_chunks: Vec<ScoredChunk>,
    pub assembled_context: AssembledContext,
    pub length_hint: LengthHint,
    /// True when the query embedding was unavailable and scoring ran
    /// without the semantic signal.
    pub degraded: bool,
}

pub struct RagService {
    embedding: EmbeddingClient,
    store: Arc<ChunkStore>,
    scorer: Scorer,
    options: RetrievalOptions,
    context_budget: usize,
    sessions: SessionRegistry,
}

impl RagService {
    pub fn new(
        embedding: EmbeddingClient,
        store: Arc<ChunkStore>,
        scorer: Scorer,
        options: RetrievalOptions,
        context_budget: usize,
    ) -> Self {
        Self {
            embedding,
            store,
            scorer,
            options,
            context_budget,
            sessions: SessionRegistry::new(),
        }
    }

    pub fn options(&self) -> &RetrievalOptions {
        &self.options
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    #[instrument(
        skip(self, request),
        fields(
            session_id = request.session_id.as_deref().unwrap_or("-"),
            accessible = request.accessible_document_ids.len(),
        )
    )]
    pub async fn retrieve(&self, request: RetrievalRequest) -> Result<RetrievalOutcome> {
        if request.query.trim().is_empty() {
            return Err(DomainError::invalid_query("query must not be empty"));
        }

        let length_hint = classify(&request.query);
        let mut query = Query::new(request.query.as_str(), length_hint);

        let guard = request
            .session_id
            .as_deref()
            .map(|id| self.sessions.begin(&request.caller, id))
            .transpose()?;
        let cancelled = guard
            .as_ref()
            .map(|g| g.token().clone())
            .unwrap_or_else(CancellationToken::new);
        let superseded = || {
            DomainError::superseded(request.session_id.clone().unwrap_or_default())
        };

        if request.accessible_document_ids.is_empty() {
            tracing::debug!("no accessible documents");
            return Ok(self.finish(Vec::new(), &request.memory, length_hint, false));
        }

        let embedded = tokio::select! {
            biased;
            _ = cancelled.cancelled() => return Err(superseded()),
            result = self.embedding.embed(&query.raw_text) => result,
        };

        let degraded = match embedded {
            Ok(embedding) => match self.store.dimension()? {
                Some(expected) if expected != embedding.dimension() => {
                    tracing::warn!(
                        expected,
                        actual = embedding.dimension(),
                        "query embedding dimension differs from stored chunks, scoring in degraded mode"
                    );
                    true
                }
                _ => {
                    query = query.with_embedding(embedding);
                    false
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "query embedding unavailable, scoring in degraded mode");
                true
            }
        };

        let snapshot = self.store.snapshot()?;
        let scanned = snapshot.len();
        let ranked = {
            let scorer = self.scorer.clone();
            let options = self.options;
            let accessible = request.accessible_document_ids.clone();
            tokio::task::spawn_blocking(move || {
                rank_chunks(&query, &snapshot, &accessible, &scorer, &options)
            })
            .await
            .map_err(|e| DomainError::internal(format!("ranking task failed: {e}")))?
        };

        if cancelled.is_cancelled() {
            return Err(superseded());
        }

        tracing::info!(
            scanned,
            returned = ranked.len(),
            degraded,
            length_hint = length_hint.as_str(),
            "retrieval complete"
        );

        Ok(self.finish(ranked, &request.memory, length_hint, degraded))
    }

    fn finish(
        &self,
        ranked_chunks: Vec<ScoredChunk>,
        memory: &ConversationMemory,
        length_hint: LengthHint,
        degraded: bool,
    ) -> RetrievalOutcome {
        let assembled_context = assemble(&ranked_chunks, memory, length_hint, self.context_budget);
        RetrievalOutcome {
            ranked_chunks,
            assembled_context,
            length_hint,
            degraded,
        }
    }
}
