use std::sync::Arc;

use crate::application::{ChatService, DocumentService, RagService};
use crate::infrastructure::{AppConfig, RedisPool};

#[derive(Clone)]
pub struct AppState {
    pub document_service: Arc<DocumentService>,
    pub rag_service: Arc<RagService>,
    pub chat_service: Arc<ChatService>,
    pub config: Arc<AppConfig>,
    /// Absent when the process runs on in-memory adapters.
    pub redis_pool: Option<RedisPool>,
}

impl AppState {
    pub fn new(
        document_service: Arc<DocumentService>,
        rag_service: Arc<RagService>,
        chat_service: Arc<ChatService>,
        config: AppConfig,
    ) -> Self {
        Self {
            document_service,
            rag_service,
            chat_service,
            config: Arc::new(config),
            redis_pool: None,
        }
    }

    pub fn with_redis_pool(mut self, pool: RedisPool) -> Self {
        self.redis_pool = Some(pool);
        self
    }
}
