//! Document, record, and error types shared by the indexing client.

use crate::{embedding::EmbeddingClientError, qdrant::QdrantError};
use serde::Serialize;
use thiserror::Error;

/// Errors raised while indexing chunks or querying the search store.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Embedding provider failed to return vectors.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Qdrant was unreachable or rejected the request.
    #[error("Search index request failed: {0}")]
    Store(#[from] QdrantError),
    /// Returned embedding dimension does not match configuration.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the collection was created with.
        expected: usize,
        /// Dimension produced by the provider.
        actual: usize,
    },
    /// Provider returned a different number of vectors than texts submitted.
    #[error("Embedding provider returned {actual} vectors for {expected} texts")]
    VectorCountMismatch {
        /// Number of texts submitted.
        expected: usize,
        /// Number of vectors received.
        actual: usize,
    },
}

/// Uploaded document as recorded alongside each of its chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    /// Generated identifier.
    pub document_id: String,
    /// Filename supplied by the uploader.
    pub filename: String,
    /// Location of the stored PDF.
    pub storage_path: String,
    /// Upload time, RFC3339.
    pub uploaded_at: String,
    /// Number of pages in the PDF.
    pub page_count: usize,
    /// Size of the uploaded file in bytes.
    pub file_size: usize,
    /// SHA-256 of the uploaded bytes, hex encoded.
    pub checksum: String,
    /// Heuristic paper title.
    pub title: Option<String>,
    /// Heuristic paper abstract.
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
}

/// Chunk text as read back from the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChunk {
    /// Position of the chunk within its document.
    pub chunk_index: usize,
    /// Character offset of the chunk start.
    pub char_start: usize,
    /// Character offset one past the chunk end.
    pub char_end: usize,
    /// Chunk text.
    pub text: String,
}

/// One ranked similarity match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Document the chunk belongs to.
    pub document_id: String,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
    /// Similarity score reported by the store; higher is closer.
    pub score: f32,
    /// Chunk text.
    pub text: String,
    /// Original filename of the parent document.
    pub filename: Option<String>,
    /// Heuristic title of the parent document.
    pub title: Option<String>,
}

/// Reachability and readiness snapshot for the search store.
#[derive(Debug, Clone, Serialize)]
pub struct IndexHealth {
    /// Whether the store answered at all.
    pub reachable: bool,
    /// Whether the configured collection exists.
    pub collection_present: bool,
    /// Diagnostic captured when the store is unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
