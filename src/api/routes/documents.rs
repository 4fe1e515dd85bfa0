use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{error::ApiError, middleware::CallerId, state::AppState};
use crate::application::services::IngestRequest;
use crate::domain::{Document, SourceType, Visibility};

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub filename: String,
    pub content: String,
    pub content_type: Option<String>,
    #[serde(default)]
    pub source_type: SourceType,
    pub quality_hint: Option<f32>,
    #[serde(default)]
    pub visibility: Visibility,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVisibilityRequest {
    pub visibility: Visibility,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub chunk_count: usize,
    pub visibility: Visibility,
    pub owner: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            filename: doc.filename,
            content_type: doc.content_type,
            size_bytes: doc.size_bytes,
            chunk_count: doc.chunk_count,
            visibility: doc.visibility,
            owner: doc.owner,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

pub async fn create_document(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerId>,
    Json(request): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    let document = state
        .document_service
        .ingest(
            caller.as_str(),
            IngestRequest {
                filename: request.filename,
                content: request.content,
                content_type: request.content_type,
                source_type: request.source_type,
                quality_hint: request.quality_hint,
                visibility: request.visibility,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(document.into())))
}

pub async fn list_documents(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerId>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let documents = state
        .document_service
        .list_accessible(caller.as_str())
        .await?;
    Ok(Json(documents.into_iter().map(Into::into).collect()))
}

pub async fn get_document(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerId>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let document = state.document_service.get(caller.as_str(), id).await?;
    Ok(Json(document.into()))
}

pub async fn update_visibility(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerId>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVisibilityRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let document = state
        .document_service
        .set_visibility(caller.as_str(), id, request.visibility)
        .await?;
    Ok(Json(document.into()))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerId>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.document_service.delete(caller.as_str(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
