use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{error::ApiError, middleware::CallerId, state::AppState};
use crate::domain::{LengthHint, Message, MEMORY_WINDOW};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// A new session is started when absent.
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SourceResponse {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub source_name: String,
    pub score: f32,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub answer: String,
    pub sources: Vec<SourceResponse>,
    pub length_hint: LengthHint,
    pub degraded: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

pub async fn chat_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerId>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let session_id = request
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let reply = state
        .chat_service
        .chat(caller.as_str(), &session_id, &request.message)
        .await?;

    Ok(Json(ChatResponse {
        session_id: reply.session_id,
        answer: reply.answer,
        sources: reply
            .sources
            .iter()
            .map(|s| SourceResponse {
                chunk_id: s.chunk.id,
                document_id: s.chunk.document_id,
                source_name: s.chunk.metadata.source_name.clone(),
                score: s.combined_score,
            })
            .collect(),
        length_hint: reply.length_hint,
        degraded: reply.degraded,
    }))
}

pub async fn get_history(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerId>,
    Path(session_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let limit = query.limit.unwrap_or(MEMORY_WINDOW);
    let messages = state
        .chat_service
        .history(caller.as_str(), &session_id, limit)
        .await?;
    Ok(Json(messages))
}
