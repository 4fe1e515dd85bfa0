pub mod chunk_store;
pub mod chunker;
pub mod classifier;
pub mod context;
pub mod entities;
pub mod errors;
pub mod ports;
pub mod retrieval;
pub mod scoring;
pub mod text;

pub use chunk_store::ChunkStore;
pub use context::AssembledContext;
pub use entities::*;
pub use errors::{DomainError, Result};
pub use retrieval::RetrievalOptions;
pub use scoring::{Scorer, ScoringWeights};
