mod in_memory;
mod qdrant;

pub use in_memory::InMemoryChunkRepository;
pub use qdrant::QdrantChunkRepository;
