//! HTTP surface for the research assistant.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /upload` – Multipart upload (field `file`) of a PDF. Extracts, chunks, embeds, and
//!   indexes it, returning the new `document_id` and `chunk_count`.
//! - `POST /summary` – Summarize an indexed document (`general`, `detailed`, `key_points`).
//! - `POST /query` – Answer a question from retrieved context, optionally scoped to one document.
//! - `POST /related` – Rank chunk references matching a free-text query.
//! - `GET /documents` – Catalog of indexed documents.
//! - `GET /health` – Search store reachability and collection presence.
//! - `GET /metrics` – Request counters since startup.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Every failure is returned as `{"error": {"kind": ..., "message": ...}}`.

use crate::assistant::{
    AssistantApi, AssistantError, HealthReport, QueryOutcome, RelatedOutcome, SummaryOutcome,
    UploadOutcome,
};
use crate::indexing::DocumentInfo;
use crate::metrics::MetricsSnapshot;
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Headroom for multipart boundaries and headers on top of the upload limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
const UPLOAD_FIELD: &str = "file";
const DEFAULT_RELATED_LIMIT: usize = 10;

/// Build the HTTP router exposing the assistant API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: AssistantApi + 'static,
{
    let body_limit = service
        .upload_limit()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    Router::new()
        .route("/upload", post(upload_document::<S>))
        .route("/summary", post(summarize_document::<S>))
        .route("/query", post(answer_query::<S>))
        .route("/related", post(find_related::<S>))
        .route("/documents", get(list_documents::<S>))
        .route("/health", get(health::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Accept a multipart PDF upload and index it.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadOutcome>, ApiError>
where
    S: AssistantApi,
{
    let mut multipart = multipart?;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(ApiError::from)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(ApiError::from)?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, bytes) = upload.ok_or_else(|| {
        AssistantError::Validation(format!("missing multipart field '{UPLOAD_FIELD}'"))
    })?;
    let outcome = service.upload(filename, bytes).await?;
    tracing::info!(
        document_id = %outcome.document_id,
        chunk_count = outcome.chunk_count,
        "Upload request completed"
    );
    Ok(Json(outcome))
}

/// Request body for `POST /summary`.
#[derive(Deserialize)]
struct SummaryRequest {
    document_id: String,
    #[serde(default = "default_summary_type")]
    summary_type: String,
}

fn default_summary_type() -> String {
    "general".into()
}

/// Summarize an indexed document.
async fn summarize_document<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<Json<SummaryOutcome>, ApiError>
where
    S: AssistantApi,
{
    let Json(request) = payload?;
    let outcome = service
        .summarize(&request.document_id, &request.summary_type)
        .await?;
    Ok(Json(outcome))
}

/// Request body for `POST /query`.
#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    document_id: Option<String>,
}

/// Answer a question, optionally scoped to one document.
async fn answer_query<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryOutcome>, ApiError>
where
    S: AssistantApi,
{
    let Json(request) = payload?;
    let outcome = service
        .query(&request.query, request.document_id.as_deref())
        .await?;
    tracing::info!(sources = outcome.sources.len(), "Query request completed");
    Ok(Json(outcome))
}

/// Request body for `POST /related`.
#[derive(Deserialize)]
struct RelatedRequest {
    query: String,
    #[serde(default = "default_related_limit")]
    limit: usize,
}

fn default_related_limit() -> usize {
    DEFAULT_RELATED_LIMIT
}

async fn find_related<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<RelatedRequest>, JsonRejection>,
) -> Result<Json<RelatedOutcome>, ApiError>
where
    S: AssistantApi,
{
    let Json(request) = payload?;
    let outcome = service.related(&request.query, request.limit).await?;
    Ok(Json(outcome))
}

/// Response body for `GET /documents`.
#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<DocumentInfo>,
    total: usize,
}

async fn list_documents<S>(
    State(service): State<Arc<S>>,
) -> Result<Json<DocumentsResponse>, ApiError>
where
    S: AssistantApi,
{
    let documents = service.list_documents().await?;
    Ok(Json(DocumentsResponse {
        total: documents.len(),
        documents,
    }))
}

async fn health<S>(State(service): State<Arc<S>>) -> Json<HealthReport>
where
    S: AssistantApi,
{
    Json(service.health().await)
}

/// Return request counters since startup.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: AssistantApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/upload",
                description: "Upload a PDF as multipart field 'file'. Extracts and chunks its text, then indexes every chunk. Response returns { \"document_id\": string, \"chunk_count\": number }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "summary",
                method: "POST",
                path: "/summary",
                description: "Summarize an uploaded paper. summary_type is one of general, detailed, key_points.",
                request_example: Some(json!({
                    "document_id": "3f0c2f7e-4a57-4d0b-9b1e-6c9a4d1b2e10",
                    "summary_type": "key_points"
                })),
            },
            CommandDescriptor {
                name: "query",
                method: "POST",
                path: "/query",
                description: "Answer a question from the indexed papers, optionally restricted to one document.",
                request_example: Some(json!({
                    "query": "Which attention variant does the paper propose?",
                    "document_id": null
                })),
            },
            CommandDescriptor {
                name: "related",
                method: "POST",
                path: "/related",
                description: "Return the chunks most similar to a free-text query, best first.",
                request_example: Some(json!({
                    "query": "sparse mixture of experts",
                    "limit": 10
                })),
            },
            CommandDescriptor {
                name: "documents",
                method: "GET",
                path: "/documents",
                description: "List indexed documents, newest first.",
                request_example: None,
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Report search store reachability and collection presence.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return request counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

/// Structured error response.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(kind = self.kind, message = %self.message, "Request failed");
        } else {
            tracing::debug!(kind = self.kind, message = %self.message, "Request rejected");
        }
        let body = json!({
            "error": {
                "kind": self.kind,
                "message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<AssistantError> for ApiError {
    fn from(inner: AssistantError) -> Self {
        let status = match &inner {
            AssistantError::Validation(_) => StatusCode::BAD_REQUEST,
            AssistantError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AssistantError::NotFound(_) => StatusCode::NOT_FOUND,
            AssistantError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AssistantError::Retrieval(_) | AssistantError::Generation(_) => StatusCode::BAD_GATEWAY,
            AssistantError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            kind: inner.kind(),
            message: inner.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "validation",
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "validation",
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        let status = match error.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            kind: "validation",
            message: error.body_text(),
        }
    }
}
