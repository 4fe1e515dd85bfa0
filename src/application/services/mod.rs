mod chat;
mod document;
mod embedding;
mod rag;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::{ChatPrompt, ChatReply, ChatService};
pub use document::{DocumentService, IngestRequest};
pub use embedding::EmbeddingClient;
pub use rag::{RagService, RetrievalOutcome, RetrievalRequest};
pub use session::{SessionGuard, SessionRegistry};
