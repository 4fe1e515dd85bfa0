mod in_memory;
mod redis;

pub use in_memory::InMemoryConversationHistory;
pub use redis::RedisConversationHistory;
