use docchat::api::{create_router, AppState};
use docchat::application::services::{
    ChatPrompt, ChatService, DocumentService, EmbeddingClient, RagService,
};
use docchat::domain::{ChunkStore, Scorer};
use docchat::infrastructure::{
    create_pool, AnthropicLlm, AppConfig, QdrantChunkRepository, RedisConversationHistory,
    RedisDocumentStore, TextEmbedding,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "docchat=debug,api=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let fmt = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry().with(filter).with(fmt).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::load()?;
    let settings = &config.config;

    let redis_pool = create_pool(&settings.redis.url)?;
    info!("Redis pool initialized");

    let repository = Arc::new(
        QdrantChunkRepository::new(
            &settings.qdrant.url,
            &settings.qdrant.collection,
            settings.embedding.dimension,
        )
        .await?,
    );
    info!(collection = %settings.qdrant.collection, "Qdrant repository initialized");

    let store = Arc::new(ChunkStore::with_dimension(settings.embedding.dimension));
    let embedding = EmbeddingClient::from_config(
        Arc::new(TextEmbedding::from_config(&settings.embedding)),
        &settings.embedding,
    );

    let retrieval = &settings.retrieval;
    let document_service = Arc::new(
        DocumentService::new(
            Arc::new(RedisDocumentStore::new(redis_pool.clone())),
            repository,
            store.clone(),
            embedding.clone(),
        )
        .with_chunking(retrieval.chunk_size, retrieval.chunk_overlap)
        .with_concurrency(settings.embedding.ingest_concurrency),
    );
    let rehydrated = document_service.rehydrate().await?;
    info!(chunks = rehydrated, "chunk store ready");

    let rag_service = Arc::new(RagService::new(
        embedding,
        store,
        Scorer::new(retrieval.weights)?,
        retrieval.options(),
        retrieval.max_context_chars,
    ));

    let chat_service = Arc::new(
        ChatService::new(
            rag_service.clone(),
            document_service.clone(),
            Arc::new(RedisConversationHistory::new(
                redis_pool.clone(),
                settings.redis.history_ttl_seconds,
            )),
            Arc::new(AnthropicLlm::from_config(&settings.llm)),
            ChatPrompt {
                system: config.prompts.chat.system.clone(),
                no_context_message: config.prompts.chat.no_context_message.clone(),
            },
        )
        .with_history_limit(retrieval.history_limit)
        .with_llm_timeout(Duration::from_secs(settings.llm.timeout_seconds)),
    );

    let addr = SocketAddr::new(settings.server.host.parse()?, settings.server.port);

    let state = AppState::new(document_service, rag_service, chat_service, config.clone())
        .with_redis_pool(redis_pool);
    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
