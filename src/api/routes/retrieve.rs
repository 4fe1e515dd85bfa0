use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::api::{error::ApiError, middleware::CallerId, state::AppState};
use crate::application::services::RetrievalRequest;
use crate::domain::{ConversationMemory, LengthHint, ScoredChunk, SignalScores};

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    /// Loads recent history as conversation memory and scopes cancellation.
    pub session_id: Option<String>,
    /// Narrows the search to these documents; inaccessible ids are ignored.
    pub document_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize)]
pub struct RankedChunkResponse {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub index: usize,
    pub source_name: String,
    pub text: String,
    pub combined_score: f32,
    pub signals: SignalScores,
}

impl From<&ScoredChunk> for RankedChunkResponse {
    fn from(scored: &ScoredChunk) -> Self {
        Self {
            chunk_id: scored.chunk.id,
            document_id: scored.chunk.document_id,
            index: scored.chunk.index,
            source_name: scored.chunk.metadata.source_name.clone(),
            text: scored.chunk.text.clone(),
            combined_score: scored.combined_score,
            signals: scored.signals,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub ranked_chunks: Vec<RankedChunkResponse>,
    pub context: String,
    pub included_chunks: usize,
    pub dropped_chunks: usize,
    pub length_hint: LengthHint,
    pub degraded: bool,
}

pub async fn retrieve(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerId>,
    Json(request): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, ApiError> {
    let mut accessible = state
        .document_service
        .accessible_ids(caller.as_str())
        .await?;
    if let Some(wanted) = request.document_ids {
        let wanted: HashSet<Uuid> = wanted.into_iter().collect();
        accessible.retain(|id| wanted.contains(id));
    }

    let memory = match &request.session_id {
        Some(session_id) => ConversationMemory::from_messages(
            state
                .chat_service
                .history(
                    caller.as_str(),
                    session_id,
                    state.config.config.retrieval.history_limit,
                )
                .await?,
        ),
        None => ConversationMemory::new(),
    };

    let outcome = state
        .rag_service
        .retrieve(RetrievalRequest {
            query: request.query,
            accessible_document_ids: accessible,
            memory,
            caller: caller.as_str().to_string(),
            session_id: request.session_id,
        })
        .await?;

    Ok(Json(RetrieveResponse {
        ranked_chunks: outcome.ranked_chunks.iter().map(Into::into).collect(),
        context: outcome.assembled_context.text,
        included_chunks: outcome.assembled_context.included_chunks,
        dropped_chunks: outcome.assembled_context.dropped_chunks,
        length_hint: outcome.length_hint,
        degraded: outcome.degraded,
    }))
}
