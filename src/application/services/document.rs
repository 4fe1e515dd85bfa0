use futures::{stream, StreamExt, TryStreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use super::EmbeddingClient;
use crate::domain::{
    chunker::{chunk_text, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE},
    ports::{ChunkRepository, DocumentStore},
    Chunk, ChunkMetadata, ChunkStore, Document, DomainError, Embedding, Result, SourceType,
    Visibility,
};

const DEFAULT_INGEST_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    pub filename: String,
    pub content: String,
    pub content_type: Option<String>,
    pub source_type: SourceType,
    pub quality_hint: Option<f32>,
    pub visibility: Visibility,
}

pub struct DocumentService {
    documents: Arc<dyn DocumentStore>,
    repository: Arc<dyn ChunkRepository>,
    store: Arc<ChunkStore>,
    embedding: EmbeddingClient,
    chunk_size: usize,
    chunk_overlap: usize,
    concurrency: usize,
}

impl DocumentService {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        repository: Arc<dyn ChunkRepository>,
        store: Arc<ChunkStore>,
        embedding: EmbeddingClient,
    ) -> Self {
        Self {
            documents,
            repository,
            store,
            embedding,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            concurrency: DEFAULT_INGEST_CONCURRENCY,
        }
    }

    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Chunks, embeds and stores a text document owned by `owner`.
    ///
    /// Either every chunk lands in the store and the repository, or the
    /// document is rolled back and the error returned.
    #[instrument(skip(self, request), fields(filename = %request.filename, chunks = tracing::field::Empty))]
    pub async fn ingest(&self, owner: &str, request: IngestRequest) -> Result<Document> {
        if request.filename.trim().is_empty() {
            return Err(DomainError::validation("filename must not be empty"));
        }
        if request.content.trim().is_empty() {
            return Err(DomainError::validation("document content must not be empty"));
        }

        let pieces = chunk_text(&request.content, self.chunk_size, self.chunk_overlap)?;
        tracing::Span::current().record("chunks", pieces.len());

        let mut document = Document::new(request.filename.as_str(), owner)
            .with_size(request.content.len() as u64)
            .with_visibility(request.visibility);
        if let Some(content_type) = request.content_type {
            document = document.with_content_type(content_type);
        }

        let mut metadata = ChunkMetadata::new(request.source_type, request.filename.as_str());
        if let Some(hint) = request.quality_hint {
            metadata = metadata.with_quality_hint(hint);
        }

        let embeddings: Vec<Embedding> = stream::iter(pieces.clone())
            .map(|piece| {
                let client = self.embedding.clone();
                async move { client.embed(&piece).await }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (text, embedding))| {
                Chunk::new(document.id, index, text, embedding, metadata.clone())
            })
            .collect();
        for chunk in &chunks {
            self.store.validate(chunk)?;
        }

        self.repository.save_chunks(&chunks).await?;
        for chunk in chunks {
            if let Err(e) = self.store.insert(chunk) {
                self.rollback(document.id).await;
                return Err(e);
            }
        }

        document.set_chunk_count(self.store.chunks_for(document.id)?.len());
        if let Err(e) = self.documents.save_document(&document).await {
            self.rollback(document.id).await;
            return Err(e);
        }

        tracing::info!(document_id = %document.id, chunk_count = document.chunk_count, "document ingested");
        Ok(document)
    }

    /// Validates and stores one pre-embedded chunk.
    pub fn ingest_chunk(
        &self,
        text: impl Into<String>,
        document_id: Uuid,
        index: usize,
        metadata: ChunkMetadata,
        embedding: Embedding,
    ) -> Result<Arc<Chunk>> {
        self.store
            .insert(Chunk::new(document_id, index, text, embedding, metadata))
    }

    async fn rollback(&self, document_id: Uuid) {
        if let Err(e) = self.store.remove_document(document_id) {
            tracing::error!(%document_id, error = %e, "failed to drop chunks from store");
        }
        if let Err(e) = self.repository.delete_by_document(document_id).await {
            tracing::error!(%document_id, error = %e, "failed to drop persisted chunks");
        }
    }

    /// The document, if `caller` may see it.
    #[instrument(skip(self))]
    pub async fn get(&self, caller: &str, id: Uuid) -> Result<Document> {
        match self.documents.get_document(id).await? {
            Some(doc) if doc.is_accessible_by(caller) => Ok(doc),
            _ => Err(DomainError::not_found(format!("document {id}"))),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_accessible(&self, caller: &str) -> Result<Vec<Document>> {
        let mut documents = self.documents.list_documents().await?;
        documents.retain(|d| d.is_accessible_by(caller));
        Ok(documents)
    }

    /// Documents the caller owns plus every public one.
    pub async fn accessible_ids(&self, caller: &str) -> Result<HashSet<Uuid>> {
        Ok(self
            .list_accessible(caller)
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn set_visibility(
        &self,
        caller: &str,
        id: Uuid,
        visibility: Visibility,
    ) -> Result<Document> {
        let mut document = self.owned(caller, id).await?;
        document.set_visibility(visibility);
        self.documents.save_document(&document).await?;
        Ok(document)
    }

    /// Removes the document together with its chunks.
    #[instrument(skip(self))]
    pub async fn delete(&self, caller: &str, id: Uuid) -> Result<()> {
        self.owned(caller, id).await?;

        self.repository.delete_by_document(id).await?;
        self.documents.delete_document(id).await?;
        let removed = self.store.remove_document(id)?;

        tracing::info!(document_id = %id, removed, "document deleted");
        Ok(())
    }

    async fn owned(&self, caller: &str, id: Uuid) -> Result<Document> {
        let document = self.get(caller, id).await?;
        if document.owner != caller {
            return Err(DomainError::validation(
                "only the owner may modify a document",
            ));
        }
        Ok(document)
    }

    /// Loads the persisted chunks of every registered document into the
    /// store. Chunks the store rejects are skipped.
    #[instrument(skip(self))]
    pub async fn rehydrate(&self) -> Result<usize> {
        let ids: Vec<Uuid> = self
            .documents
            .list_documents()
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect();

        let mut chunks = self.repository.load_chunks(&ids).await?;
        chunks.sort_by_key(|c| (c.document_id, c.index));

        let mut loaded = 0;
        for chunk in chunks {
            let (document_id, index) = (chunk.document_id, chunk.index);
            match self.store.insert(chunk) {
                Ok(_) => loaded += 1,
                Err(e) => tracing::warn!(%document_id, index, error = %e, "skipping persisted chunk"),
            }
        }

        tracing::info!(documents = ids.len(), chunks = loaded, "chunk store rehydrated");
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::testing::{FailingEmbedding, HashEmbedding};
    use crate::domain::ports::EmbeddingService;
    use crate::infrastructure::{InMemoryChunkRepository, InMemoryDocumentStore};
    use std::time::Duration;

    const DIM: usize = 32;

    struct Fixture {
        service: DocumentService,
        documents: Arc<InMemoryDocumentStore>,
        repository: Arc<InMemoryChunkRepository>,
        store: Arc<ChunkStore>,
    }

    fn fixture_with(embedding: Arc<dyn EmbeddingService>) -> Fixture {
        let documents = Arc::new(InMemoryDocumentStore::new());
        let repository = Arc::new(InMemoryChunkRepository::new());
        let store = Arc::new(ChunkStore::with_dimension(DIM));
        let service = DocumentService::new(
            documents.clone(),
            repository.clone(),
            store.clone(),
            EmbeddingClient::new(embedding, 2000, Duration::from_secs(1)),
        )
        .with_chunking(40, 10);
        Fixture {
            service,
            documents,
            repository,
            store,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(HashEmbedding::new(DIM)))
    }

    fn text_doc(name: &str, content: &str) -> IngestRequest {
        IngestRequest {
            filename: name.to_string(),
            content: content.to_string(),
            ..IngestRequest::default()
        }
    }

    const REPORT: &str = "The quarterly report covers invoice totals, billing cycles, \
                          payment schedules and the outstanding balance for every client.";

    #[tokio::test]
    async fn test_ingest_stores_and_persists_chunks() {
        let f = fixture();
        let doc = f.service.ingest("alice", text_doc("report.txt", REPORT)).await.unwrap();

        assert!(doc.chunk_count > 1);
        assert_eq!(f.store.len().unwrap(), doc.chunk_count);
        let stored = f.store.chunks_for(doc.id).unwrap();
        assert!(stored.iter().enumerate().all(|(i, c)| c.index == i));
        assert!(stored.iter().all(|c| c.metadata.source_name == "report.txt"));

        let persisted = f.repository.load_chunks(&[doc.id]).await.unwrap();
        assert_eq!(persisted.len(), doc.chunk_count);
        assert!(f.documents.get_document(doc.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_ingest_rejects_empty_content() {
        let f = fixture();
        let err = f.service.ingest("alice", text_doc("empty.txt", "  \n ")).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(f.store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_ingest_fails_cleanly_without_embeddings() {
        let f = fixture_with(Arc::new(FailingEmbedding));
        let err = f.service.ingest("alice", text_doc("report.txt", REPORT)).await.unwrap_err();

        assert!(matches!(err, DomainError::EmbeddingUnavailable(_)));
        assert!(f.store.is_empty().unwrap());
        assert!(f.documents.list_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_dimension_rejected_before_persisting() {
        let f = fixture_with(Arc::new(HashEmbedding::new(DIM * 2)));
        let err = f.service.ingest("alice", text_doc("report.txt", REPORT)).await.unwrap_err();

        assert!(matches!(err, DomainError::DimensionMismatch { .. }));
        assert!(f.repository.is_empty());
    }

    #[tokio::test]
    async fn test_ingest_chunk_rejects_duplicate_index() {
        let f = fixture();
        let doc = Uuid::new_v4();
        let meta = ChunkMetadata::new(SourceType::Pdf, "scan.pdf");
        let embedding = Embedding::new(vec![0.5; DIM]);

        f.service
            .ingest_chunk("first", doc, 0, meta.clone(), embedding.clone())
            .unwrap();
        let err = f
            .service
            .ingest_chunk("second", doc, 0, meta, embedding)
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateChunk { index: 0, .. }));
    }

    #[tokio::test]
    async fn test_visibility_controls_access() {
        let f = fixture();
        let private = f.service.ingest("alice", text_doc("a.txt", REPORT)).await.unwrap();
        let mut public_req = text_doc("b.txt", REPORT);
        public_req.visibility = Visibility::Public;
        let public = f.service.ingest("bob", public_req).await.unwrap();

        let alice = f.service.accessible_ids("alice").await.unwrap();
        assert_eq!(alice, HashSet::from([private.id, public.id]));
        let carol = f.service.accessible_ids("carol").await.unwrap();
        assert_eq!(carol, HashSet::from([public.id]));

        assert!(matches!(
            f.service.get("carol", private.id).await,
            Err(DomainError::NotFound(_))
        ));

        f.service
            .set_visibility("alice", private.id, Visibility::Public)
            .await
            .unwrap();
        assert!(f.service.get("carol", private.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_only_owner_modifies() {
        let f = fixture();
        let mut req = text_doc("b.txt", REPORT);
        req.visibility = Visibility::Public;
        let doc = f.service.ingest("bob", req).await.unwrap();

        let err = f.service.delete("carol", doc.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        let err = f
            .service
            .set_visibility("carol", doc.id, Visibility::Private)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let f = fixture();
        let doc = f.service.ingest("alice", text_doc("a.txt", REPORT)).await.unwrap();
        let other = f.service.ingest("alice", text_doc("b.txt", REPORT)).await.unwrap();

        f.service.delete("alice", doc.id).await.unwrap();

        assert!(f.store.chunks_for(doc.id).unwrap().is_empty());
        assert_eq!(f.store.len().unwrap(), other.chunk_count);
        assert!(f.repository.load_chunks(&[doc.id]).await.unwrap().is_empty());
        assert!(f.documents.get_document(doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ingest_runs_on_spawned_task() {
        let f = fixture();
        let service = Arc::new(f.service);
        let handle = tokio::spawn({
            let service = service.clone();
            async move { service.ingest("alice", text_doc("report.txt", REPORT)).await }
        });
        let doc = handle.await.unwrap().unwrap();
        assert_eq!(f.store.len().unwrap(), doc.chunk_count);
    }

    struct StuckDeleteRepository(InMemoryChunkRepository);

    #[async_trait::async_trait]
    impl ChunkRepository for StuckDeleteRepository {
        async fn save_chunks(&self, chunks: &[Chunk]) -> Result<()> {
            self.0.save_chunks(chunks).await
        }

        async fn load_chunks(&self, document_ids: &[Uuid]) -> Result<Vec<Chunk>> {
            self.0.load_chunks(document_ids).await
        }

        async fn delete_by_document(&self, _document_id: Uuid) -> Result<()> {
            Err(DomainError::external("qdrant unreachable"))
        }
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_document_searchable() {
        let documents = Arc::new(InMemoryDocumentStore::new());
        let store = Arc::new(ChunkStore::with_dimension(DIM));
        let service = DocumentService::new(
            documents.clone(),
            Arc::new(StuckDeleteRepository(InMemoryChunkRepository::new())),
            store.clone(),
            EmbeddingClient::new(Arc::new(HashEmbedding::new(DIM)), 2000, Duration::from_secs(1)),
        );
        let doc = service.ingest("alice", text_doc("a.txt", REPORT)).await.unwrap();

        let err = service.delete("alice", doc.id).await.unwrap_err();
        assert!(matches!(err, DomainError::ExternalService(_)));
        assert_eq!(store.chunks_for(doc.id).unwrap().len(), doc.chunk_count);
        assert!(documents.get_document(doc.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rehydrate_restores_store() {
        let f = fixture();
        let doc = f.service.ingest("alice", text_doc("a.txt", REPORT)).await.unwrap();

        let fresh = Arc::new(ChunkStore::with_dimension(DIM));
        let restarted = DocumentService::new(
            f.documents.clone(),
            f.repository.clone(),
            fresh.clone(),
            EmbeddingClient::new(Arc::new(FailingEmbedding), 2000, Duration::from_secs(1)),
        );

        let loaded = restarted.rehydrate().await.unwrap();
        assert_eq!(loaded, doc.chunk_count);
        assert_eq!(
            fresh.chunks_for(doc.id).unwrap().iter().map(|c| c.id).collect::<Vec<_>>(),
            f.store.chunks_for(doc.id).unwrap().iter().map(|c| c.id).collect::<Vec<_>>()
        );
    }
}
