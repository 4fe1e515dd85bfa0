use async_trait::async_trait;
use rig::client::{EmbeddingsClient, ProviderClient};
use rig::embeddings::EmbeddingsBuilder;
use rig::providers::openai;

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::EmbeddingConfig;

/// OpenAI embeddings through rig. Reads `OPENAI_API_KEY` from the environment.
pub struct TextEmbedding {
    model: String,
    dimension: usize,
}

impl TextEmbedding {
    pub fn new() -> Self {
        Self::from_config(&EmbeddingConfig::default())
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            model: config.model.clone(),
            dimension: config.dimension,
        }
    }

    fn checked(&self, vec: Vec<f64>) -> Result<Embedding, DomainError> {
        if vec.len() != self.dimension {
            return Err(DomainError::DimensionMismatch {
                expected: self.dimension,
                actual: vec.len(),
            });
        }
        Ok(Embedding::new(vec.into_iter().map(|x| x as f32).collect()))
    }
}

impl Default for TextEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingService for TextEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::embedding_unavailable("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let client = openai::Client::from_env();
        let model = client.embedding_model(&self.model);

        let mut builder = EmbeddingsBuilder::new(model);
        for text in texts {
            builder = builder
                .document(*text)
                .map_err(|e| DomainError::embedding_unavailable(e.to_string()))?;
        }

        let embeddings = builder
            .build()
            .await
            .map_err(|e| DomainError::embedding_unavailable(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(DomainError::embedding_unavailable(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        embeddings
            .into_iter()
            .map(|(_doc, emb)| self.checked(emb.first().vec))
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        &self.model
    }
}
