//! Application layer - Use cases and orchestration.
//!
//! Services here wire the retrieval core to the ports. They depend on
//! domain traits rather than concrete adapters.

pub mod services;

pub use services::{ChatService, DocumentService, EmbeddingClient, RagService};
