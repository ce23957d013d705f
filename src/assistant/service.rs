//! Assistant service sequencing extraction, indexing, and the agent roles per request.

use crate::{
    agents::{self, SummaryKind, TokenBudget},
    assistant::types::{
        AssistantError, AssistantSettings, HealthReport, QueryOutcome, RelatedOutcome, SourceRef,
        SummaryOutcome, UploadOutcome,
    },
    config::Config,
    embedding::get_embedding_client,
    extraction::{ExtractedDocument, ExtractionError, extract_document},
    indexing::{DocumentInfo, IndexClient, RetrievalError},
    llm::{GenerationClient, OllamaGenerationClient},
    metrics::{AssistantMetrics, MetricsSnapshot},
    qdrant::{QdrantService, compute_chunk_hash},
};
use async_trait::async_trait;
use std::path::Path;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

const DEFAULT_FILENAME: &str = "upload.pdf";

/// Operations exposed to the HTTP surface and the ingest command.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Validate, extract, store, and index an uploaded PDF.
    async fn upload(
        &self,
        filename: String,
        bytes: Vec<u8>,
    ) -> Result<UploadOutcome, AssistantError>;

    /// Summarize an indexed document.
    async fn summarize(
        &self,
        document_id: &str,
        summary_type: &str,
    ) -> Result<SummaryOutcome, AssistantError>;

    /// Answer a question from retrieved context, optionally scoped to one document.
    async fn query(
        &self,
        query: &str,
        document_id: Option<&str>,
    ) -> Result<QueryOutcome, AssistantError>;

    /// Rank chunk references matching `query`.
    async fn related(&self, query: &str, limit: usize) -> Result<RelatedOutcome, AssistantError>;

    /// Catalog of indexed documents, newest first.
    async fn list_documents(&self) -> Result<Vec<DocumentInfo>, AssistantError>;

    /// Probe dependencies.
    async fn health(&self) -> HealthReport;

    /// Counters since startup.
    fn metrics_snapshot(&self) -> MetricsSnapshot;

    /// Largest accepted upload in bytes.
    fn upload_limit(&self) -> usize;
}

/// Default [`AssistantApi`] implementation backed by Qdrant and an LLM runtime.
///
/// Holds no per-request state; construct once and share through an `Arc`.
pub struct AssistantService {
    index: IndexClient,
    llm: Box<dyn GenerationClient>,
    budget: TokenBudget,
    settings: AssistantSettings,
    metrics: AssistantMetrics,
}

impl AssistantService {
    /// Build the service from configuration and bootstrap the collection and upload directory.
    pub async fn new(config: &Config) -> Result<Self, AssistantError> {
        let settings = AssistantSettings::from_config(config)?;
        tracing::info!(url = %config.qdrant_url, "Connecting to search store");
        let store = QdrantService::new(&config.qdrant_url, config.qdrant_api_key.clone())
            .map_err(RetrievalError::from)?;
        let index = IndexClient::new(
            get_embedding_client(config),
            store,
            config.qdrant_collection_name.clone(),
        );
        let llm = OllamaGenerationClient::from_config(config)?;

        let service = Self::from_parts(index, Box::new(llm), settings);
        service.prepare().await?;
        Ok(service)
    }

    /// Assemble a service from already-built components without touching the network.
    pub fn from_parts(
        index: IndexClient,
        llm: Box<dyn GenerationClient>,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            index,
            llm,
            budget: TokenBudget::new(settings.prompt_token_budget),
            settings,
            metrics: AssistantMetrics::new(),
        }
    }

    /// Create the upload directory and the search collection when missing.
    pub async fn prepare(&self) -> Result<(), AssistantError> {
        tokio::fs::create_dir_all(&self.settings.upload_dir).await?;
        self.index.ensure_collection().await?;
        tracing::info!(
            collection = self.index.collection(),
            upload_dir = %self.settings.upload_dir.display(),
            "Assistant ready"
        );
        Ok(())
    }

    async fn require_document(&self, document_id: &str) -> Result<DocumentInfo, AssistantError> {
        self.index
            .document(document_id)
            .await?
            .ok_or_else(|| AssistantError::NotFound(document_id.to_string()))
    }

    async fn extract(
        &self,
        document_id: &str,
        bytes: Vec<u8>,
    ) -> Result<(Vec<u8>, ExtractedDocument), AssistantError> {
        let settings = self.settings.chunking;
        let id = document_id.to_string();
        let (bytes, extracted) = tokio::task::spawn_blocking(move || {
            let extracted = extract_document(&id, &bytes, settings);
            (bytes, extracted)
        })
        .await
        .map_err(|error| ExtractionError::Malformed(format!("extraction task failed: {error}")))?;
        Ok((bytes, extracted?))
    }
}

#[async_trait]
impl AssistantApi for AssistantService {
    async fn upload(
        &self,
        filename: String,
        bytes: Vec<u8>,
    ) -> Result<UploadOutcome, AssistantError> {
        if bytes.is_empty() {
            return Err(AssistantError::Validation("uploaded file is empty".into()));
        }
        if bytes.len() > self.settings.max_upload_bytes {
            return Err(AssistantError::PayloadTooLarge {
                size: bytes.len(),
                limit: self.settings.max_upload_bytes,
            });
        }

        let filename = clean_filename(&filename);
        let document_id = Uuid::new_v4().to_string();
        tracing::info!(%document_id, %filename, bytes = bytes.len(), "Processing upload");

        let (bytes, extracted) = self.extract(&document_id, bytes).await?;

        let storage_path = self.settings.upload_dir.join(format!("{document_id}.pdf"));
        tokio::fs::create_dir_all(&self.settings.upload_dir).await?;
        tokio::fs::write(&storage_path, &bytes).await?;

        let document = DocumentInfo {
            document_id: document_id.clone(),
            filename: filename.clone(),
            storage_path: storage_path.display().to_string(),
            uploaded_at: now_rfc3339(),
            page_count: extracted.page_count,
            file_size: bytes.len(),
            checksum: compute_chunk_hash(&bytes),
            title: extracted.metadata.title.clone(),
            abstract_text: extracted.metadata.abstract_text.clone(),
        };

        let chunk_count = match self.index.index(&document, &extracted.chunks).await {
            Ok(written) => written,
            Err(error) => {
                if let Err(cleanup) = tokio::fs::remove_file(&storage_path).await {
                    tracing::warn!(
                        error = %cleanup,
                        path = %storage_path.display(),
                        "Failed to remove stored upload after indexing error"
                    );
                }
                return Err(error.into());
            }
        };

        self.metrics.record_document(chunk_count as u64);
        tracing::info!(%document_id, chunk_count, page_count = document.page_count, "Upload indexed");
        Ok(UploadOutcome {
            document_id,
            filename,
            file_size: document.file_size,
            page_count: document.page_count,
            chunk_count,
            title: document.title,
        })
    }

    async fn summarize(
        &self,
        document_id: &str,
        summary_type: &str,
    ) -> Result<SummaryOutcome, AssistantError> {
        let document_id = require_text(document_id, "document_id")?;
        let kind: SummaryKind = summary_type
            .parse()
            .map_err(|error: agents::UnknownSummaryKind| {
                AssistantError::Validation(error.to_string())
            })?;

        let document = self.require_document(document_id).await?;
        let chunks = self.index.document_chunks(document_id).await?;
        if chunks.is_empty() {
            return Err(AssistantError::NotFound(document_id.to_string()));
        }

        let draft = agents::summarize(self.llm.as_ref(), &self.budget, kind, chunks).await?;
        self.metrics.record_summary();
        Ok(SummaryOutcome {
            document_id: document.document_id,
            summary_type: kind.to_string(),
            summary: draft.summary,
            key_points: draft.key_points,
            title: document.title,
            abstract_text: document.abstract_text,
            generated_at: now_rfc3339(),
        })
    }

    async fn query(
        &self,
        query: &str,
        document_id: Option<&str>,
    ) -> Result<QueryOutcome, AssistantError> {
        let query = require_text(query, "query")?;
        let scope = match document_id {
            Some(id) => {
                let id = require_text(id, "document_id")?;
                self.require_document(id).await?;
                Some(id)
            }
            None => None,
        };

        let hits = agents::retrieve(&self.index, query, self.settings.retrieval_top_k, scope).await?;
        let draft = agents::answer(self.llm.as_ref(), &self.budget, query, hits).await?;
        self.metrics.record_query();
        Ok(QueryOutcome {
            query: query.to_string(),
            answer: draft.answer,
            sources: draft.context.iter().map(SourceRef::from).collect(),
            generated_at: now_rfc3339(),
        })
    }

    async fn related(&self, query: &str, limit: usize) -> Result<RelatedOutcome, AssistantError> {
        let query = require_text(query, "query")?;
        let max = self.settings.related_max_limit;
        if limit == 0 || limit > max {
            return Err(AssistantError::Validation(format!(
                "limit must be between 1 and {max}"
            )));
        }

        let hits = agents::retrieve(&self.index, query, limit, None).await?;
        self.metrics.record_related();
        let results: Vec<SourceRef> = hits.iter().map(SourceRef::from).collect();
        Ok(RelatedOutcome {
            query: query.to_string(),
            total_found: results.len(),
            results,
        })
    }

    async fn list_documents(&self) -> Result<Vec<DocumentInfo>, AssistantError> {
        Ok(self.index.list_documents().await?)
    }

    async fn health(&self) -> HealthReport {
        let index = self.index.health().await;
        let status = if index.reachable && index.collection_present {
            "healthy"
        } else {
            "degraded"
        };
        HealthReport {
            status,
            index,
            timestamp: now_rfc3339(),
        }
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn upload_limit(&self) -> usize {
        self.settings.max_upload_bytes
    }
}

fn require_text<'a>(value: &'a str, field: &str) -> Result<&'a str, AssistantError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AssistantError::Validation(format!(
            "{field} must not be empty"
        )));
    }
    Ok(trimmed)
}

fn clean_filename(raw: &str) -> String {
    Path::new(raw.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_FILENAME)
        .to_string()
}

fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        embedding::HashedEmbeddingClient, extraction::ChunkSettings,
        extraction::test_support::pdf_with_pages, llm::GenerationError,
    };
    use httpmock::{Method::POST, Method::PUT, MockServer};
    use serde_json::json;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Clone, Default)]
    struct CountingClient {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl GenerationClient for CountingClient {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("- point one\n- point two".into())
        }

        fn model(&self) -> &str {
            "stub"
        }
    }

    fn service(server: &MockServer, upload_dir: &Path, llm: CountingClient) -> AssistantService {
        service_with_budget(server, upload_dir, llm, 500)
    }

    fn service_with_budget(
        server: &MockServer,
        upload_dir: &Path,
        llm: CountingClient,
        prompt_token_budget: usize,
    ) -> AssistantService {
        let index = IndexClient::new(
            Box::new(HashedEmbeddingClient::new(8)),
            QdrantService::new(&server.base_url(), None).expect("qdrant"),
            "papers",
        );
        let settings = AssistantSettings {
            upload_dir: upload_dir.to_path_buf(),
            max_upload_bytes: 1024 * 1024,
            chunking: ChunkSettings::new(120, 20).expect("chunking"),
            retrieval_top_k: 3,
            related_max_limit: 10,
            prompt_token_budget,
        };
        AssistantService::from_parts(index, Box::new(llm), settings)
    }

    const LONG_CHUNK: &str = "beta gamma delta epsilon zeta eta theta iota kappa lambda mu nu xi \
                              omicron pi rho sigma tau upsilon phi chi psi omega";

    fn uploaded_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn summary_for_unknown_document_skips_llm() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/papers/points/scroll");
                then.status(200)
                    .json_body(json!({ "result": { "points": [], "next_page_offset": null } }));
            })
            .await;
        let dir = tempfile::tempdir().expect("tempdir");
        let llm = CountingClient::default();

        let error = service(&server, dir.path(), llm.clone())
            .summarize("missing", "general")
            .await
            .unwrap_err();

        assert!(matches!(error, AssistantError::NotFound(id) if id == "missing"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected_before_any_call() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let assistant = service(&server, dir.path(), CountingClient::default());

        let cases = [
            assistant.summarize("doc-1", "poem").await.unwrap_err(),
            assistant.summarize("  ", "general").await.unwrap_err(),
            assistant.query("   ", None).await.unwrap_err(),
            assistant.query("What?", Some("")).await.unwrap_err(),
            assistant.related("attention", 0).await.unwrap_err(),
            assistant.related("attention", 11).await.unwrap_err(),
            assistant
                .upload("empty.pdf".into(), Vec::new())
                .await
                .unwrap_err(),
        ];
        for error in cases {
            assert_eq!(error.kind(), "validation", "{error}");
        }
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let error = service(&server, dir.path(), CountingClient::default())
            .upload("big.pdf".into(), vec![b'x'; 1024 * 1024 + 1])
            .await
            .unwrap_err();
        assert!(matches!(error, AssistantError::PayloadTooLarge { .. }));
    }

    #[tokio::test]
    async fn non_pdf_upload_stores_nothing() {
        let server = MockServer::start_async().await;
        let upsert = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/papers/points");
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;
        let dir = tempfile::tempdir().expect("tempdir");

        let error = service(&server, dir.path(), CountingClient::default())
            .upload("notes.pdf".into(), b"just some text".to_vec())
            .await
            .unwrap_err();

        assert!(matches!(error, AssistantError::Extraction(ExtractionError::NotPdf)));
        assert_eq!(upsert.hits_async().await, 0);
        assert_eq!(uploaded_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn indexing_failure_removes_stored_file() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/papers/points");
                then.status(503).body("unavailable");
            })
            .await;
        let dir = tempfile::tempdir().expect("tempdir");
        let pdf = pdf_with_pages(&["Transformer architectures for sequence transduction"]);

        let error = service(&server, dir.path(), CountingClient::default())
            .upload("paper.pdf".into(), pdf)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), "retrieval");
        assert_eq!(uploaded_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn successful_upload_is_counted() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/papers/points");
                then.status(200).json_body(json!({ "result": { "status": "completed" } }));
            })
            .await;
        let dir = tempfile::tempdir().expect("tempdir");
        let pdf = pdf_with_pages(&[
            "Attention Is All You Need",
            "The dominant sequence transduction models are based on recurrence.",
            "We propose the Transformer, based solely on attention mechanisms.",
        ]);

        let assistant = service(&server, dir.path(), CountingClient::default());
        let outcome = assistant
            .upload("../../paper.pdf".into(), pdf)
            .await
            .expect("upload");

        assert_eq!(outcome.filename, "paper.pdf");
        assert_eq!(outcome.page_count, 3);
        assert!(outcome.chunk_count > 0);
        assert_eq!(uploaded_files(dir.path()), 1);
        let snapshot = assistant.metrics_snapshot();
        assert_eq!(snapshot.documents_ingested, 1);
        assert_eq!(snapshot.chunks_indexed, outcome.chunk_count as u64);
    }

    #[tokio::test]
    async fn query_sources_are_limited_to_prompt_context() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/papers/points/query");
                then.status(200).json_body(json!({
                    "result": { "points": [
                        { "id": "a", "score": 0.9, "payload": { "document_id": "doc-1", "chunk_index": 0, "text": "alpha" } },
                        { "id": "b", "score": 0.8, "payload": { "document_id": "doc-1", "chunk_index": 1, "text": LONG_CHUNK } },
                        { "id": "c", "score": 0.7, "payload": { "document_id": "doc-1", "chunk_index": 2, "text": LONG_CHUNK } }
                    ] }
                }));
            })
            .await;
        let dir = tempfile::tempdir().expect("tempdir");
        let llm = CountingClient::default();

        let outcome = service_with_budget(&server, dir.path(), llm.clone(), 8)
            .query("Which letter comes first?", None)
            .await
            .expect("query");

        let indices: Vec<_> = outcome
            .sources
            .iter()
            .map(|source| source.chunk_index)
            .collect();
        assert_eq!(indices, vec![0]);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn filenames_are_reduced_to_their_last_component() {
        assert_eq!(clean_filename("dir/sub/paper.pdf"), "paper.pdf");
        assert_eq!(clean_filename("   "), DEFAULT_FILENAME);
        assert_eq!(clean_filename(".."), DEFAULT_FILENAME);
    }
}
