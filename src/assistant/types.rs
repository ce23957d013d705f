//! Request outcomes, settings, and errors for the assistant service.

use crate::{
    config::Config,
    extraction::{ChunkSettings, ExtractionError},
    indexing::{IndexHealth, RetrievalError, SearchHit},
    llm::GenerationError,
};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

const PREVIEW_CHARS: usize = 200;

/// Errors surfaced by assistant operations, one variant per failure kind.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// Request failed validation before any component was invoked.
    #[error("{0}")]
    Validation(String),
    /// Upload exceeds the configured size limit.
    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Size of the rejected upload.
        size: usize,
        /// Configured limit.
        limit: usize,
    },
    /// Referenced document is not indexed.
    #[error("document '{0}' not found")]
    NotFound(String),
    /// PDF could not be turned into chunks.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// Embedding or search store failure.
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    /// LLM runtime failure.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// Upload directory I/O failure.
    #[error("upload storage failed: {0}")]
    Storage(#[from] std::io::Error),
}

impl AssistantError {
    /// Stable machine-readable kind used in error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::PayloadTooLarge { .. } => "validation",
            Self::NotFound(_) => "not_found",
            Self::Extraction(_) => "extraction",
            Self::Retrieval(_) => "retrieval",
            Self::Generation(_) => "generation",
            Self::Storage(_) => "storage",
        }
    }
}

/// Per-request tunables derived from configuration.
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    /// Directory receiving accepted PDFs.
    pub upload_dir: PathBuf,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,
    /// Chunk window.
    pub chunking: ChunkSettings,
    /// Chunks handed to the answerer.
    pub retrieval_top_k: usize,
    /// Upper bound for related-paper `limit`.
    pub related_max_limit: usize,
    /// Context token allowance per prompt.
    pub prompt_token_budget: usize,
}

impl AssistantSettings {
    /// Derive settings from configuration.
    pub fn from_config(config: &Config) -> Result<Self, ExtractionError> {
        Ok(Self {
            upload_dir: config.upload_dir.clone(),
            max_upload_bytes: config.max_upload_bytes,
            chunking: ChunkSettings::new(config.chunk_size, config.chunk_overlap)?,
            retrieval_top_k: config.retrieval_top_k,
            related_max_limit: config.related_max_limit,
            prompt_token_budget: config.prompt_token_budget,
        })
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    /// Identifier assigned to the document.
    pub document_id: String,
    /// Filename supplied by the uploader.
    pub filename: String,
    /// Size of the stored file in bytes.
    pub file_size: usize,
    /// Number of pages in the PDF.
    pub page_count: usize,
    /// Number of chunks indexed.
    pub chunk_count: usize,
    /// Heuristic paper title.
    pub title: Option<String>,
}

/// Generated summary of one document.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryOutcome {
    /// Summarized document.
    pub document_id: String,
    /// Summary type label.
    pub summary_type: String,
    /// Summary text.
    pub summary: String,
    /// Parsed bullet points for `key_points` summaries.
    pub key_points: Vec<String>,
    /// Heuristic paper title.
    pub title: Option<String>,
    /// Heuristic paper abstract.
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    /// Generation time, RFC3339.
    pub generated_at: String,
}

/// Reference to a chunk that backed an answer or matched a search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    /// Document the chunk belongs to.
    pub document_id: String,
    /// Chunk position within the document.
    pub chunk_index: usize,
    /// Similarity score.
    pub score: f32,
    /// Original filename.
    pub filename: Option<String>,
    /// Heuristic paper title.
    pub title: Option<String>,
    /// Leading characters of the chunk text.
    pub preview: String,
}

impl From<&SearchHit> for SourceRef {
    fn from(hit: &SearchHit) -> Self {
        let text = hit.text.trim();
        let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
        if text.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        Self {
            document_id: hit.document_id.clone(),
            chunk_index: hit.chunk_index,
            score: hit.score,
            filename: hit.filename.clone(),
            title: hit.title.clone(),
            preview,
        }
    }
}

/// Answer to a natural-language question.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    /// Question as submitted.
    pub query: String,
    /// Generated answer.
    pub answer: String,
    /// Chunks placed in the answer context, best first.
    pub sources: Vec<SourceRef>,
    /// Generation time, RFC3339.
    pub generated_at: String,
}

/// Ranked chunk references for a related-paper lookup.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedOutcome {
    /// Query as submitted.
    pub query: String,
    /// Matches, best first.
    pub results: Vec<SourceRef>,
    /// Number of matches returned.
    pub total_found: usize,
}

/// Service readiness report.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// `healthy` when the search store answers and the collection exists, `degraded` otherwise.
    pub status: &'static str,
    /// Search store probe.
    pub index: IndexHealth,
    /// Probe time, RFC3339.
    pub timestamp: String,
}
