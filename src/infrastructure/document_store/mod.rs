mod in_memory;
mod redis;

pub use in_memory::InMemoryDocumentStore;
pub use redis::RedisDocumentStore;
