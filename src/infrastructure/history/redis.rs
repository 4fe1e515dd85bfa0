use async_trait::async_trait;
use deadpool_redis::redis::{pipe, AsyncCommands};

use crate::domain::{ports::ConversationHistory, DomainError, Message};
use crate::infrastructure::redis::{connection, keys, redis_error, RedisPool};

/// Messages kept per session; older ones are trimmed on append.
const HISTORY_CAP: isize = 200;

/// Session history stored as a Redis list of JSON messages, oldest first.
pub struct RedisConversationHistory {
    pool: RedisPool,
    ttl_seconds: u64,
}

impl RedisConversationHistory {
    pub fn new(pool: RedisPool, ttl_seconds: u64) -> Self {
        Self { pool, ttl_seconds }
    }
}

#[async_trait]
impl ConversationHistory for RedisConversationHistory {
    async fn recent_messages(
        &self,
        owner: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, DomainError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = connection(&self.pool).await?;
        let start = -(limit.min(HISTORY_CAP as usize) as isize);
        let raw: Vec<String> = conn
            .lrange(keys::conversation(owner, session_id), start, -1)
            .await
            .map_err(redis_error)?;

        raw.iter()
            .map(|json| {
                serde_json::from_str(json)
                    .map_err(|e| DomainError::internal(format!("corrupt history entry: {e}")))
            })
            .collect()
    }

    async fn append(
        &self,
        owner: &str,
        session_id: &str,
        messages: &[Message],
    ) -> Result<(), DomainError> {
        if messages.is_empty() {
            return Ok(());
        }
        let payloads = messages
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let key = keys::conversation(owner, session_id);
        let mut conn = connection(&self.pool).await?;
        pipe()
            .atomic()
            .rpush(&key, payloads)
            .ignore()
            .ltrim(&key, -HISTORY_CAP, -1)
            .ignore()
            .expire(&key, self.ttl_seconds as i64)
            .ignore()
            .query_async::<()>(&mut *conn)
            .await
            .map_err(redis_error)?;

        tracing::debug!(owner, session_id, appended = messages.len(), "history appended");
        Ok(())
    }
}
