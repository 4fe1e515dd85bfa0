use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::anthropic;

use crate::domain::{ports::LlmService, DomainError};
use crate::infrastructure::config::LlmConfig;

/// Answer generation with Anthropic models. Reads `ANTHROPIC_API_KEY`.
pub struct AnthropicLlm {
    model: String,
    max_tokens: u64,
}

impl AnthropicLlm {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: LlmConfig::default().max_tokens,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(config.model.clone()).with_max_tokens(config.max_tokens)
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl LlmService for AnthropicLlm {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, DomainError> {
        let client = anthropic::Client::from_env();
        let agent = client
            .agent(&self.model)
            .preamble(system)
            .max_tokens(self.max_tokens)
            .build();
        agent
            .prompt(prompt)
            .await
            .map_err(|e| DomainError::external(e.to_string()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
