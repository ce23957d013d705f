//! Embedding and indexing client: turns chunks into Qdrant points and answers similarity queries.
//!
//! Every record is keyed by `(document_id, chunk_index)`, so indexing is an idempotent upsert.
//! Store failures are surfaced as [`RetrievalError`] and never retried here.

mod records;
pub mod types;

pub use types::{DocumentInfo, IndexHealth, RetrievalError, SearchHit, StoredChunk};

use crate::{
    embedding::EmbeddingClient,
    extraction::Chunk,
    qdrant::{FieldMatch, QdrantService, build_match_filter},
};
use records::{
    FIELD_CHUNK_INDEX, FIELD_DOCUMENT_ID, build_points, document_from_payload, hit_from_point,
    order_chunks, rank_hits, stored_chunk_from_payload,
};
use std::collections::BTreeMap;

/// Candidates requested from the store per result, so score ties at the cut are ranked locally.
const SEARCH_OVERFETCH: usize = 2;

const PAYLOAD_INDEXES: [(&str, &str); 2] =
    [(FIELD_DOCUMENT_ID, "keyword"), (FIELD_CHUNK_INDEX, "integer")];

/// Client combining an embedding provider with the Qdrant collection holding chunk records.
pub struct IndexClient {
    embedding: Box<dyn EmbeddingClient>,
    store: QdrantService,
    collection: String,
}

impl IndexClient {
    /// Build a client writing to `collection`.
    pub fn new(
        embedding: Box<dyn EmbeddingClient>,
        store: QdrantService,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedding,
            store,
            collection: collection.into(),
        }
    }

    /// Name of the backing collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the collection and its payload indexes when missing.
    pub async fn ensure_collection(&self) -> Result<(), RetrievalError> {
        let vector_size = self.embedding.dimension() as u64;
        self.store
            .create_collection_if_not_exists(&self.collection, vector_size)
            .await?;
        self.store
            .ensure_payload_indexes(&self.collection, &PAYLOAD_INDEXES)
            .await?;
        tracing::debug!(collection = %self.collection, vector_size, "Collection ready");
        Ok(())
    }

    /// Embed and upsert every chunk of `document`, returning the number of records written.
    pub async fn index(
        &self,
        document: &DocumentInfo,
        chunks: &[Chunk],
    ) -> Result<usize, RetrievalError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedding.generate_embeddings(texts).await?;
        if vectors.len() != chunks.len() {
            return Err(RetrievalError::VectorCountMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }
        for vector in &vectors {
            self.check_dimension(vector.len())?;
        }

        let points = build_points(document, chunks, vectors);
        let written = self.store.upsert_points(&self.collection, points).await?;
        tracing::info!(
            collection = %self.collection,
            document_id = %document.document_id,
            records = written,
            "Indexed document chunks"
        );
        Ok(written)
    }

    /// Return up to `limit` records most similar to `query_text`, optionally within one document.
    pub async fn search(
        &self,
        query_text: &str,
        limit: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut vectors = self
            .embedding
            .generate_embeddings(vec![query_text.to_string()])
            .await?;
        let vector = vectors
            .pop()
            .ok_or(RetrievalError::VectorCountMismatch {
                expected: 1,
                actual: 0,
            })?;
        self.check_dimension(vector.len())?;

        let filter = document_id
            .and_then(|id| build_match_filter(&[FieldMatch::new(FIELD_DOCUMENT_ID, id)]));
        let candidates = limit.saturating_mul(SEARCH_OVERFETCH);
        let points = self
            .store
            .search_points(&self.collection, vector, filter, candidates)
            .await?;

        let hits = rank_hits(points.into_iter().filter_map(hit_from_point).collect(), limit);
        tracing::debug!(
            collection = %self.collection,
            limit,
            candidates,
            scoped = document_id.is_some(),
            hits = hits.len(),
            "Similarity search completed"
        );
        Ok(hits)
    }

    /// Look up a document by id through its first chunk record.
    pub async fn document(&self, document_id: &str) -> Result<Option<DocumentInfo>, RetrievalError> {
        let Some(filter) = build_match_filter(&[
            FieldMatch::new(FIELD_DOCUMENT_ID, document_id),
            FieldMatch::new(FIELD_CHUNK_INDEX, 0),
        ]) else {
            return Ok(None);
        };
        let points = self
            .store
            .scroll_points(&self.collection, Some(filter), Some(1))
            .await?;
        Ok(points
            .iter()
            .find_map(|(_, payload)| document_from_payload(payload)))
    }

    /// Every chunk of a document, in reading order.
    pub async fn document_chunks(
        &self,
        document_id: &str,
    ) -> Result<Vec<StoredChunk>, RetrievalError> {
        let Some(filter) = build_match_filter(&[FieldMatch::new(FIELD_DOCUMENT_ID, document_id)])
        else {
            return Ok(Vec::new());
        };
        let points = self
            .store
            .scroll_points(&self.collection, Some(filter), None)
            .await?;
        let chunks = points
            .iter()
            .filter_map(|(_, payload)| stored_chunk_from_payload(payload))
            .collect();
        Ok(order_chunks(chunks))
    }

    /// Catalog of indexed documents, newest first.
    pub async fn list_documents(&self) -> Result<Vec<DocumentInfo>, RetrievalError> {
        let filter = build_match_filter(&[FieldMatch::new(FIELD_CHUNK_INDEX, 0)]);
        let points = self
            .store
            .scroll_points(&self.collection, filter, None)
            .await?;

        let mut documents: BTreeMap<String, DocumentInfo> = BTreeMap::new();
        for (_, payload) in &points {
            if let Some(document) = document_from_payload(payload) {
                documents.insert(document.document_id.clone(), document);
            }
        }

        let mut documents: Vec<DocumentInfo> = documents.into_values().collect();
        documents.sort_by(|left, right| right.uploaded_at.cmp(&left.uploaded_at));
        Ok(documents)
    }

    /// Probe the store and report whether the collection is available.
    pub async fn health(&self) -> IndexHealth {
        match self.store.collection_exists(&self.collection).await {
            Ok(collection_present) => IndexHealth {
                reachable: true,
                collection_present,
                error: None,
            },
            Err(error) => {
                tracing::warn!(error = %error, "Search index health probe failed");
                IndexHealth {
                    reachable: false,
                    collection_present: false,
                    error: Some(error.to_string()),
                }
            }
        }
    }

    fn check_dimension(&self, actual: usize) -> Result<(), RetrievalError> {
        let expected = self.embedding.dimension();
        if actual == expected {
            Ok(())
        } else {
            Err(RetrievalError::DimensionMismatch { expected, actual })
        }
    }
}
