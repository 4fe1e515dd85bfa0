//! Deterministic port implementations shared by the service tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::{
    ports::{EmbeddingService, LlmService},
    text, DomainError, Embedding,
};

/// Hashed bag of folded content terms, L2-normalised. Texts sharing terms
/// point in similar directions.
pub struct HashEmbedding {
    dimension: usize,
    seen: Mutex<Vec<String>>,
}

impl HashEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen_inputs(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    pub fn vector(&self, input: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];
        for term in text::content_terms(&text::tokenize(input)) {
            vector[fnv1a(&term) as usize % self.dimension] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Embedding::new(vector)
    }
}

fn fnv1a(term: &str) -> u64 {
    term.bytes().fold(0xcbf29ce484222325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x100000001b3)
    })
}

#[async_trait]
impl EmbeddingService for HashEmbedding {
    async fn embed(&self, input: &str) -> Result<Embedding, DomainError> {
        self.seen.lock().unwrap().push(input.to_string());
        Ok(self.vector(input))
    }

    async fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        let mut out = Vec::with_capacity(inputs.len());
        for input in inputs {
            out.push(self.embed(input).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        "hash-bow"
    }
}

pub struct FailingEmbedding;

#[async_trait]
impl EmbeddingService for FailingEmbedding {
    async fn embed(&self, _input: &str) -> Result<Embedding, DomainError> {
        Err(DomainError::external("embedding provider unreachable"))
    }

    async fn embed_batch(&self, _inputs: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        Err(DomainError::external("embedding provider unreachable"))
    }

    fn dimension(&self) -> usize {
        8
    }

    fn model(&self) -> &str {
        "failing"
    }
}

/// Delays every call of the wrapped service.
pub struct SlowEmbedding {
    inner: HashEmbedding,
    delay: Duration,
}

impl SlowEmbedding {
    pub fn new(inner: HashEmbedding, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl EmbeddingService for SlowEmbedding {
    async fn embed(&self, input: &str) -> Result<Embedding, DomainError> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed(input).await
    }

    async fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed_batch(inputs).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model(&self) -> &str {
        "slow-hash-bow"
    }
}

/// Records prompts and answers with a fixed reply.
pub struct RecordingLlm {
    reply: String,
    prompts: Mutex<Vec<(String, String)>>,
}

impl RecordingLlm {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// `(system, prompt)` pairs in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for RecordingLlm {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, DomainError> {
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), prompt.to_string()));
        Ok(self.reply.clone())
    }

    fn model(&self) -> &str {
        "recording"
    }
}
