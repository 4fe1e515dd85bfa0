mod conversation;
mod document;
mod embedding;
mod query;

pub use conversation::{ConversationMemory, Message, MessageRole, MEMORY_WINDOW};
pub use document::{Chunk, ChunkMetadata, Document, SourceType, Visibility};
pub use embedding::Embedding;
pub use query::{LengthHint, Query, ScoredChunk, SignalScores};
