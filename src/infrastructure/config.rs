use serde::Deserialize;
use std::path::Path;

use crate::domain::{
    chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE},
    context::DEFAULT_CONTEXT_BUDGET,
    DomainError, RetrievalOptions, ScoringWeights, MEMORY_WINDOW,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.yaml";

/// Full application configuration: service settings plus prompt text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub qdrant: QdrantConfig,
    pub redis: RedisConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u64,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-sonnet-latest".to_string(),
            max_tokens: 1024,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
    /// Characters kept before a text is sent for embedding.
    pub max_input_length: usize,
    pub timeout_ms: u64,
    /// Concurrent chunk embeddings during ingestion.
    pub ingest_concurrency: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            max_input_length: 2000,
            timeout_ms: 3000,
            ingest_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub min_score: f32,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_context_chars: usize,
    pub history_limit: usize,
    pub weights: ScoringWeights,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        let options = RetrievalOptions::default();
        Self {
            top_k: options.top_k,
            min_score: options.min_score,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            max_context_chars: DEFAULT_CONTEXT_BUDGET,
            history_limit: MEMORY_WINDOW,
            weights: ScoringWeights::default(),
        }
    }
}

impl RetrievalConfig {
    pub fn options(&self) -> RetrievalOptions {
        RetrievalOptions {
            top_k: self.top_k,
            min_score: self.min_score,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    pub url: String,
    pub collection: String,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            collection: "document_chunks".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    pub history_ttl_seconds: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            history_ttl_seconds: 7 * 24 * 3600,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub chat: ChatPrompts,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatPrompts {
    pub system: String,
    pub no_context_message: String,
}

impl Default for ChatPrompts {
    fn default() -> Self {
        Self {
            system: "You answer questions using only the document excerpts and conversation \
                     provided. If the excerpts do not contain the answer, say so plainly. \
                     Cite the source name of each excerpt you rely on."
                .to_string(),
            no_context_message: "No relevant passages were found in the accessible documents."
                .to_string(),
        }
    }
}

impl AppConfig {
    /// Reads `CONFIG_PATH` (or the default path) when present, then applies
    /// environment overrides.
    pub fn load() -> Result<Self, DomainError> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            tracing::info!(path = %path, "config file not found, using defaults");
            Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DomainError::internal(format!("reading config: {e}")))?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, DomainError> {
        serde_yaml::from_str(raw).map_err(|e| DomainError::validation(format!("config: {e}")))
    }

    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.config.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse().ok()) {
            self.config.server.port = port;
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            self.config.redis.url = url;
        }
        if let Ok(url) = std::env::var("QDRANT_URL") {
            self.config.qdrant.url = url;
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let retrieval = &self.config.retrieval;
        retrieval.weights.validate()?;
        if retrieval.chunk_overlap >= retrieval.chunk_size {
            return Err(DomainError::validation(
                "retrieval.chunk_overlap must be smaller than retrieval.chunk_size",
            ));
        }
        if self.config.embedding.dimension == 0 {
            return Err(DomainError::validation("embedding.dimension must be positive"));
        }
        Ok(())
    }
}
