use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Embedding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub chunk_count: usize,
    pub visibility: Visibility,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(filename: impl Into<String>, owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            content_type: "text/plain".to_string(),
            size_bytes: 0,
            chunk_count: 0,
            visibility: Visibility::Private,
            owner: owner.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
        self.updated_at = Utc::now();
    }

    pub fn set_chunk_count(&mut self, chunk_count: usize) {
        self.chunk_count = chunk_count;
        self.updated_at = Utc::now();
    }

    /// Owners always see their documents; everyone sees public ones.
    pub fn is_accessible_by(&self, caller: &str) -> bool {
        self.visibility == Visibility::Public || self.owner == caller
    }
}

/// How the chunk text was extracted upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    #[default]
    Text,
    Docx,
    Pdf,
    Html,
    Ocr,
}

impl SourceType {
    /// Default extraction confidence when no explicit hint is supplied.
    pub fn base_confidence(&self) -> f32 {
        match self {
            Self::Text => 1.0,
            Self::Docx => 0.95,
            Self::Pdf => 0.9,
            Self::Html => 0.85,
            Self::Ocr => 0.6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Docx => "docx",
            Self::Pdf => "pdf",
            Self::Html => "html",
            Self::Ocr => "ocr",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "docx" => Some(Self::Docx),
            "pdf" => Some(Self::Pdf),
            "html" => Some(Self::Html),
            "ocr" => Some(Self::Ocr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_type: SourceType,
    /// Extraction confidence in `[0, 1]`, overriding the source default.
    pub quality_hint: Option<f32>,
    /// Name of the owning document, used to tag context excerpts.
    pub source_name: String,
}

impl ChunkMetadata {
    pub fn new(source_type: SourceType, source_name: impl Into<String>) -> Self {
        Self {
            source_type,
            quality_hint: None,
            source_name: source_name.into(),
        }
    }

    pub fn with_quality_hint(mut self, hint: f32) -> Self {
        self.quality_hint = Some(hint.clamp(0.0, 1.0));
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub index: usize,
    pub text: String,
    pub embedding: Embedding,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(
        document_id: Uuid,
        index: usize,
        text: impl Into<String>,
        embedding: Embedding,
        metadata: ChunkMetadata,
    ) -> Self {
        Self {
            id: Self::derive_id(document_id, index),
            document_id,
            index,
            text: text.into(),
            embedding,
            metadata,
        }
    }

    /// Stable id for `(document_id, index)`, so re-ingesting or rehydrating
    /// yields the same ordering tie-breaks.
    pub fn derive_id(document_id: Uuid, index: usize) -> Uuid {
        Uuid::new_v5(&document_id, index.to_string().as_bytes())
    }
}
