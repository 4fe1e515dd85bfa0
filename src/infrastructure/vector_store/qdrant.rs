use async_trait::async_trait;
use qdrant_client::qdrant::{
    vectors_output::VectorsOptions, Condition, CreateCollectionBuilder, DeletePointsBuilder,
    Distance, Filter, PointId, PointStruct, RetrievedPoint, ScrollPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder, VectorsOutput,
};
use qdrant_client::{Payload, Qdrant};
use uuid::Uuid;

use crate::domain::{
    ports::ChunkRepository, Chunk, ChunkMetadata, DomainError, Embedding, SourceType,
};

const SCROLL_PAGE: u32 = 256;

/// Durable chunk storage in a Qdrant collection. Retrieval itself never
/// queries Qdrant; it only feeds the in-memory store at start-up.
pub struct QdrantChunkRepository {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantChunkRepository {
    pub async fn new(url: &str, collection: &str, dimension: usize) -> Result<Self, DomainError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| DomainError::external(e.to_string()))?;

        let repo = Self {
            client,
            collection: collection.to_string(),
            dimension,
        };

        repo.ensure_collection().await?;

        Ok(repo)
    }

    async fn ensure_collection(&self) -> Result<(), DomainError> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            tracing::info!(collection = %self.collection, dimension = self.dimension, "creating collection");
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| DomainError::external(e.to_string()))?;
        }

        Ok(())
    }

    fn to_point(chunk: &Chunk) -> Result<PointStruct, DomainError> {
        let payload: Payload = serde_json::json!({
            "chunk_id": chunk.id.to_string(),
            "document_id": chunk.document_id.to_string(),
            "chunk_index": chunk.index,
            "text": chunk.text,
            "source_type": chunk.metadata.source_type.as_str(),
            "source_name": chunk.metadata.source_name,
            "quality_hint": chunk.metadata.quality_hint,
        })
        .try_into()
        .map_err(|_| DomainError::internal("Failed to create payload"))?;

        Ok(PointStruct::new(
            chunk.id.to_string(),
            chunk.embedding.as_slice().to_vec(),
            payload,
        ))
    }

    fn from_point(point: RetrievedPoint) -> Option<Chunk> {
        let payload = point.payload;

        let document_id: Uuid = payload.get("document_id")?.as_str()?.parse().ok()?;
        let index = usize::try_from(payload.get("chunk_index")?.as_integer()?).ok()?;
        let text = payload.get("text")?.as_str()?.to_string();
        let source_type = payload
            .get("source_type")
            .and_then(|v| v.as_str())
            .and_then(|s| SourceType::parse(s))
            .unwrap_or_default();
        let source_name = payload
            .get("source_name")
            .and_then(|v| v.as_str())
            .cloned()
            .unwrap_or_default();

        let mut metadata = ChunkMetadata::new(source_type, source_name);
        if let Some(hint) = payload.get("quality_hint").and_then(|v| v.as_double()) {
            metadata = metadata.with_quality_hint(hint as f32);
        }

        let embedding = Embedding::new(extract_vector(point.vectors)?);
        Some(Chunk::new(document_id, index, text, embedding, metadata))
    }
}

#[allow(deprecated)]
fn extract_vector(vectors: Option<VectorsOutput>) -> Option<Vec<f32>> {
    match vectors?.vectors_options? {
        VectorsOptions::Vector(vector) => Some(vector.data),
        VectorsOptions::Vectors(_) => None,
    }
}

#[async_trait]
impl ChunkRepository for QdrantChunkRepository {
    async fn save_chunks(&self, chunks: &[Chunk]) -> Result<(), DomainError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let points = chunks
            .iter()
            .map(Self::to_point)
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        Ok(())
    }

    async fn load_chunks(&self, document_ids: &[Uuid]) -> Result<Vec<Chunk>, DomainError> {
        if document_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = document_ids.iter().map(Uuid::to_string).collect();
        let filter = Filter::must([Condition::matches("document_id", ids)]);

        let mut chunks = Vec::new();
        let mut offset: Option<PointId> = None;
        loop {
            let mut request = ScrollPointsBuilder::new(&self.collection)
                .filter(filter.clone())
                .limit(SCROLL_PAGE)
                .with_payload(true)
                .with_vectors(true);
            if let Some(next) = offset.take() {
                request = request.offset(next);
            }

            let page = self
                .client
                .scroll(request)
                .await
                .map_err(|e| DomainError::external(e.to_string()))?;

            for point in page.result {
                match Self::from_point(point) {
                    Some(chunk) => chunks.push(chunk),
                    None => tracing::warn!(collection = %self.collection, "skipping malformed point"),
                }
            }

            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        tracing::info!(documents = document_ids.len(), chunks = chunks.len(), "chunks loaded");
        Ok(chunks)
    }

    async fn delete_by_document(&self, document_id: Uuid) -> Result<(), DomainError> {
        let filter = Filter::must([Condition::matches(
            "document_id",
            document_id.to_string(),
        )]);

        self.client
            .delete_points(DeletePointsBuilder::new(&self.collection).points(filter).wait(true))
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        Ok(())
    }
}
