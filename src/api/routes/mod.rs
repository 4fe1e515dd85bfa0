pub mod chat;
pub mod documents;
pub mod health;
pub mod retrieve;

use axum::http::{header, HeaderName, Method};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::middleware::{request_logger, require_caller};
use crate::api::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors(&state.config.config.cors.allowed_origins);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api/v1", api_v1_routes())
        .layer(from_fn(request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-user-id"),
        ]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/documents",
            post(documents::create_document).get(documents::list_documents),
        )
        .route(
            "/documents/{id}",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route(
            "/documents/{id}/visibility",
            axum::routing::patch(documents::update_visibility),
        )
        .route("/retrieve", post(retrieve::retrieve))
        .route("/chat", post(chat::chat_handler))
        .route("/chat/{session_id}/history", get(chat::get_history))
        .layer(from_fn(require_caller))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::middleware::USER_ID_HEADER;
    use crate::application::services::{
        testing::{HashEmbedding, RecordingLlm},
        ChatPrompt, ChatService, DocumentService, EmbeddingClient, RagService,
    };
    use crate::domain::{context::DEFAULT_CONTEXT_BUDGET, ChunkStore, RetrievalOptions, Scorer};
    use crate::infrastructure::{
        AppConfig, InMemoryChunkRepository, InMemoryConversationHistory, InMemoryDocumentStore,
    };
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app() -> Router {
        let store = Arc::new(ChunkStore::with_dimension(64));
        let embedding = EmbeddingClient::new(
            Arc::new(HashEmbedding::new(64)),
            2000,
            Duration::from_secs(1),
        );
        let documents = Arc::new(DocumentService::new(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(InMemoryChunkRepository::new()),
            store.clone(),
            embedding.clone(),
        ));
        let rag = Arc::new(RagService::new(
            embedding,
            store,
            Scorer::default(),
            RetrievalOptions::default(),
            DEFAULT_CONTEXT_BUDGET,
        ));
        let chat = Arc::new(ChatService::new(
            rag.clone(),
            documents.clone(),
            Arc::new(InMemoryConversationHistory::new()),
            Arc::new(RecordingLlm::new("It is $450.")),
            ChatPrompt {
                system: "Answer from the excerpts.".into(),
                no_context_message: "Nothing found.".into(),
            },
        ));
        create_router(AppState::new(documents, rag, chat, AppConfig::default()))
    }

    fn request(method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user);
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn upload(app: &Router, user: &str, filename: &str, content: &str) -> String {
        let (status, body) = send(
            app,
            request(
                Method::POST,
                "/api/v1/documents",
                Some(user),
                Some(json!({ "filename": filename, "content": content })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(&app, request(Method::GET, "/ready", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["redis"], "not_configured");
    }

    #[tokio::test]
    async fn test_api_requires_caller() {
        let app = app();
        let (status, _) = send(&app, request(Method::GET, "/api/v1/documents", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_document_lifecycle() {
        let app = app();
        let id = upload(&app, "alice", "invoice.txt", "The invoice total is $450").await;

        let (status, body) = send(&app, request(Method::GET, "/api/v1/documents", Some("alice"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["chunk_count"], 1);
        assert_eq!(body[0]["visibility"], "private");

        let uri = format!("/api/v1/documents/{id}");
        let (status, _) = send(&app, request(Method::GET, &uri, Some("bob"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            request(
                Method::PATCH,
                &format!("{uri}/visibility"),
                Some("alice"),
                Some(json!({ "visibility": "public" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["visibility"], "public");

        let (status, _) = send(&app, request(Method::GET, &uri, Some("bob"), None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, request(Method::DELETE, &uri, Some("alice"), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, request(Method::GET, &uri, Some("alice"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_retrieve_respects_access() {
        let app = app();
        upload(&app, "alice", "invoice.txt", "The invoice total is $450").await;

        let query = json!({ "query": "What is the invoice total?" });
        let (status, body) = send(
            &app,
            request(Method::POST, "/api/v1/retrieve", Some("alice"), Some(query.clone())),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ranked_chunks"].as_array().unwrap().len(), 1);
        assert_eq!(body["ranked_chunks"][0]["source_name"], "invoice.txt");
        assert_eq!(body["degraded"], false);
        assert!(body["context"].as_str().unwrap().contains("$450"));

        let (status, body) = send(
            &app,
            request(Method::POST, "/api/v1/retrieve", Some("bob"), Some(query)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["ranked_chunks"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_is_bad_request() {
        let app = app();
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/retrieve",
                Some("alice"),
                Some(json!({ "query": "  " })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid query"));
    }

    #[tokio::test]
    async fn test_chat_and_history() {
        let app = app();
        upload(&app, "alice", "invoice.txt", "The invoice total is $450").await;

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/chat",
                Some("alice"),
                Some(json!({ "message": "What is the invoice total?", "session_id": "s1" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "It is $450.");
        assert_eq!(body["session_id"], "s1");
        assert_eq!(body["sources"][0]["source_name"], "invoice.txt");

        let (status, body) = send(
            &app,
            request(Method::GET, "/api/v1/chat/s1/history", Some("alice"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let messages = body.as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
    }

    #[tokio::test]
    async fn test_sessions_are_not_shared_between_callers() {
        let app = app();
        upload(&app, "alice", "invoice.txt", "The invoice total is $450").await;
        send(
            &app,
            request(
                Method::POST,
                "/api/v1/chat",
                Some("alice"),
                Some(json!({ "message": "What is the invoice total?", "session_id": "s1" })),
            ),
        )
        .await;

        let (status, body) = send(
            &app,
            request(Method::GET, "/api/v1/chat/s1/history", Some("mallory"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().is_empty());

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/retrieve",
                Some("mallory"),
                Some(json!({ "query": "What is the invoice total?", "session_id": "s1" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let context = body["context"].as_str().unwrap();
        assert!(!context.contains("$450"));
        assert!(!context.contains("Recent conversation"));
    }
}
