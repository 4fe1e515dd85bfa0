use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::domain::{ports::EmbeddingService, DomainError, Embedding, Result};
use crate::infrastructure::config::EmbeddingConfig;

/// Wraps an [`EmbeddingService`] with input truncation and a deadline.
///
/// Every failure, including the deadline, comes back as
/// [`DomainError::EmbeddingUnavailable`]. Nothing is retried.
#[derive(Clone)]
pub struct EmbeddingClient {
    service: Arc<dyn EmbeddingService>,
    max_input_length: usize,
    timeout: Duration,
}

impl EmbeddingClient {
    pub fn new(service: Arc<dyn EmbeddingService>, max_input_length: usize, timeout: Duration) -> Self {
        Self {
            service,
            max_input_length,
            timeout,
        }
    }

    pub fn from_config(service: Arc<dyn EmbeddingService>, config: &EmbeddingConfig) -> Self {
        Self::new(
            service,
            config.max_input_length,
            Duration::from_millis(config.timeout_ms),
        )
    }

    pub fn dimension(&self) -> usize {
        self.service.dimension()
    }

    pub fn model(&self) -> &str {
        self.service.model()
    }

    #[instrument(skip(self, text), fields(model = self.service.model(), chars = tracing::field::Empty))]
    pub async fn embed(&self, text: &str) -> Result<Embedding> {
        let input = truncate_chars(text, self.max_input_length);
        tracing::Span::current().record("chars", input.chars().count());

        match tokio::time::timeout(self.timeout, self.service.embed(input)).await {
            Ok(Ok(embedding)) => Ok(embedding),
            Ok(Err(DomainError::EmbeddingUnavailable(msg))) => {
                Err(DomainError::EmbeddingUnavailable(msg))
            }
            Ok(Err(e)) => Err(DomainError::embedding_unavailable(e.to_string())),
            Err(_) => Err(DomainError::embedding_unavailable(format!(
                "no response within {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::testing::{FailingEmbedding, HashEmbedding, SlowEmbedding};

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[tokio::test]
    async fn test_long_input_is_truncated_before_embedding() {
        let service = Arc::new(HashEmbedding::new(32));
        let client = EmbeddingClient::new(service.clone(), 10, Duration::from_secs(1));

        client.embed(&"x".repeat(500)).await.unwrap();

        assert_eq!(service.seen_inputs(), vec!["x".repeat(10)]);
    }

    #[tokio::test]
    async fn test_service_error_becomes_unavailable() {
        let client = EmbeddingClient::new(Arc::new(FailingEmbedding), 100, Duration::from_secs(1));
        let err = client.embed("invoice total").await.unwrap_err();
        assert!(matches!(err, DomainError::EmbeddingUnavailable(_)));
    }

    #[tokio::test]
    async fn test_deadline_becomes_unavailable() {
        let slow = SlowEmbedding::new(HashEmbedding::new(8), Duration::from_millis(500));
        let client = EmbeddingClient::new(Arc::new(slow), 100, Duration::from_millis(20));
        let err = client.embed("invoice total").await.unwrap_err();
        assert!(matches!(err, DomainError::EmbeddingUnavailable(_)));
    }
}
