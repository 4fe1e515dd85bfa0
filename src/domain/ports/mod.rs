mod chunk_repository;
mod conversation_history;
mod document_store;
mod embedding;
mod llm;

pub use chunk_repository::ChunkRepository;
pub use conversation_history::ConversationHistory;
pub use document_store::DocumentStore;
pub use embedding::EmbeddingService;
pub use llm::LlmService;
