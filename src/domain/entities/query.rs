use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{Chunk, Embedding};
use crate::domain::text;

/// Desired answer shape inferred from the query phrasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthHint {
    Brief,
    List,
    Detailed,
    #[default]
    Balanced,
}

impl LengthHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brief => "brief",
            Self::List => "list",
            Self::Detailed => "detailed",
            Self::Balanced => "balanced",
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            Self::Brief => "Answer in one or two concise sentences.",
            Self::List => "Format the answer as a bulleted list of short items.",
            Self::Detailed => "Give a thorough answer that covers every relevant point in the excerpts.",
            Self::Balanced => "Give a clear answer of moderate length.",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Query {
    pub raw_text: String,
    pub normalized_text: String,
    /// `None` puts scoring into degraded mode.
    pub embedding: Option<Embedding>,
    pub length_hint: LengthHint,
}

impl Query {
    pub fn new(raw_text: impl Into<String>, length_hint: LengthHint) -> Self {
        let raw_text = raw_text.into();
        Self {
            normalized_text: text::normalize(&raw_text),
            raw_text,
            embedding: None,
            length_hint,
        }
    }

    pub fn with_embedding(mut self, embedding: Embedding) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.embedding.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SignalScores {
    pub semantic: f32,
    pub keyword: f32,
    pub exact_phrase: f32,
    pub proximity: f32,
    pub qa: f32,
    pub quality: f32,
}

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Arc<Chunk>,
    pub signals: SignalScores,
    pub combined_score: f32,
}
