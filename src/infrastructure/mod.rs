pub mod config;
pub mod document_store;
pub mod embedding;
pub mod history;
pub mod llm;
pub mod redis;
pub mod vector_store;

pub use config::{AppConfig, Config, PromptsConfig};
pub use document_store::{InMemoryDocumentStore, RedisDocumentStore};
pub use embedding::TextEmbedding;
pub use history::{InMemoryConversationHistory, RedisConversationHistory};
pub use llm::AnthropicLlm;
pub use redis::{create_pool, RedisPool};
pub use vector_store::{InMemoryChunkRepository, QdrantChunkRepository};
