//! HTTP client wrapper for interacting with Qdrant.

use crate::qdrant::types::{
    PointUpsert, QdrantError, QueryResponse, QueryResponseResult, ScoredPoint, ScrollResponse,
};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value, json};

const SCROLL_PAGE_SIZE: usize = 256;

/// Lightweight HTTP client for Qdrant operations.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantService {
    /// Construct a client for the Qdrant instance at `url`.
    pub fn new(url: &str, api_key: Option<String>) -> Result<Self, QdrantError> {
        let client = Client::builder()
            .user_agent("research-assistant/0.1")
            .build()?;

        let base_url = normalize_base_url(url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = api_key.as_deref().is_some_and(|value| !value.is_empty()),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Create a collection only when it is missing from Qdrant.
    pub async fn create_collection_if_not_exists(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        if self.collection_exists(collection_name).await? {
            return Ok(());
        }

        tracing::debug!(
            collection = collection_name,
            vector_size,
            "Creating collection"
        );
        self.create_collection(collection_name, vector_size).await
    }

    /// Create or update a collection with the specified vector size.
    pub async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}"))
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::info!(collection = collection_name, vector_size, "Collection created");
        })
        .await
    }

    /// Check whether a collection exists.
    pub async fn collection_exists(&self, collection_name: &str) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => {
                let error = unexpected_status(response).await;
                tracing::error!(collection = collection_name, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    /// Ensure payload indexes exist for the given `(field, schema)` pairs.
    ///
    /// Index creation failures are logged and tolerated: filters still work without them, only
    /// slower.
    pub async fn ensure_payload_indexes(
        &self,
        collection_name: &str,
        fields: &[(&str, &str)],
    ) -> Result<(), QdrantError> {
        for (field, schema) in fields {
            let body = json!({
                "field_name": field,
                "field_schema": schema,
            });

            let response = self
                .request(Method::PUT, &format!("collections/{collection_name}/index"))
                .query(&[("wait", true)])
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() || status == StatusCode::CONFLICT {
                tracing::debug!(
                    collection = collection_name,
                    field,
                    schema,
                    "Payload index ensured"
                );
            } else {
                let error = unexpected_status(response).await;
                tracing::warn!(collection = collection_name, field, schema, error = %error, "Failed to ensure payload index");
            }
        }

        Ok(())
    }

    /// Insert or overwrite points, waiting until Qdrant has applied the write.
    pub async fn upsert_points(
        &self,
        collection_name: &str,
        points: Vec<PointUpsert>,
    ) -> Result<usize, QdrantError> {
        if points.is_empty() {
            return Ok(0);
        }

        let serialized: Vec<Value> = points
            .into_iter()
            .map(|point| {
                json!({
                    "id": point.id,
                    "vector": point.vector,
                    "payload": point.payload,
                })
            })
            .collect();
        let point_count = serialized.len();

        let response = self
            .request(
                Method::PUT,
                &format!("collections/{collection_name}/points"),
            )
            .query(&[("wait", true)])
            .json(&json!({ "points": serialized }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(
                collection = collection_name,
                points = point_count,
                "Points upserted"
            );
        })
        .await?;

        Ok(point_count)
    }

    /// Perform a similarity search against a collection, returning scored payloads.
    pub async fn search_points(
        &self,
        collection_name: &str,
        vector: Vec<f32>,
        filter: Option<Value>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        let mut body = Map::new();
        body.insert("query".into(), json!(vector));
        body.insert("limit".into(), json!(limit));
        body.insert("with_payload".into(), Value::Bool(true));
        if let Some(filter_value) = filter {
            body.insert("filter".into(), filter_value);
        }

        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/query"),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error = unexpected_status(response).await;
            tracing::error!(collection = collection_name, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        };

        Ok(points
            .into_iter()
            .map(|point| ScoredPoint {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: point.payload,
            })
            .collect())
    }

    /// Scroll every point matching `filter`, returning ids with payloads.
    ///
    /// `max_points` caps the number of points collected; scrolling stops early once reached.
    pub async fn scroll_points(
        &self,
        collection_name: &str,
        filter: Option<Value>,
        max_points: Option<usize>,
    ) -> Result<Vec<(String, Map<String, Value>)>, QdrantError> {
        let mut offset: Option<Value> = None;
        let mut results = Vec::new();
        let filter_body = filter.unwrap_or_else(|| json!({ "must": [] }));
        let page_size = max_points.map_or(SCROLL_PAGE_SIZE, |cap| cap.clamp(1, SCROLL_PAGE_SIZE));

        loop {
            let mut body = Map::new();
            body.insert("with_payload".into(), Value::Bool(true));
            body.insert("with_vector".into(), Value::Bool(false));
            body.insert("limit".into(), json!(page_size));
            body.insert("filter".into(), filter_body.clone());
            if let Some(next) = offset.take() {
                body.insert("offset".into(), next);
            }

            let response = self
                .request(
                    Method::POST,
                    &format!("collections/{collection_name}/points/scroll"),
                )
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                let error = unexpected_status(response).await;
                tracing::error!(collection = collection_name, error = %error, "Failed to scroll points");
                return Err(error);
            }

            let ScrollResponse { result } = response.json().await?;
            for point in result.points {
                if let (Some(id), Some(payload)) = (point.id, point.payload) {
                    results.push((stringify_point_id(id), payload));
                }
            }

            if let Some(cap) = max_points
                && results.len() >= cap
            {
                results.truncate(cap);
                break;
            }

            match result.next_page_offset {
                Some(Value::Null) | None => break,
                Some(next) => offset = Some(next),
            }
        }

        Ok(results)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let error = unexpected_status(response).await;
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

async fn unexpected_status(response: reqwest::Response) -> QdrantError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    QdrantError::UnexpectedStatus { status, body }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Object(map) => map
            .get("uuid")
            .map(|value| match value {
                Value::String(uuid) => uuid.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| Value::Object(map).to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qdrant::{FieldMatch, build_match_filter};
    use httpmock::{Method::POST, Method::PUT, MockServer};

    fn service(server: &MockServer) -> QdrantService {
        QdrantService::new(&server.base_url(), None).expect("client")
    }

    #[tokio::test]
    async fn search_points_emits_expected_request() {
        let server = MockServer::start_async().await;
        let filter = build_match_filter(&[FieldMatch::new("document_id", "doc-1")]);

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/papers/points/query")
                    .json_body_partial(
                        r#"{"limit":3,"filter":{"must":[{"key":"document_id","match":{"value":"doc-1"}}]}}"#,
                    );
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": {
                        "points": [
                            {
                                "id": "5b1c6a34-0d57-5d4b-9d46-0f7a5fd4b1f0",
                                "score": 0.42,
                                "payload": { "text": "Example", "document_id": "doc-1" }
                            }
                        ]
                    }
                }));
            })
            .await;

        let results = service(&server)
            .search_points("papers", vec![0.1, 0.2], filter, 3)
            .await
            .expect("search request");

        mock.assert_async().await;
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 0.42).abs() < f32::EPSILON);
        let payload = results[0].payload.as_ref().expect("payload");
        assert_eq!(payload["document_id"], "doc-1");
    }

    #[tokio::test]
    async fn upsert_points_waits_for_write() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/papers/points")
                    .query_param("wait", "true");
                then.status(200)
                    .json_body(json!({ "status": "ok", "result": { "status": "completed" } }));
            })
            .await;

        let written = service(&server)
            .upsert_points(
                "papers",
                vec![PointUpsert {
                    id: "id-1".into(),
                    vector: vec![0.5, 0.5],
                    payload: Map::new(),
                }],
            )
            .await
            .expect("upsert");

        mock.assert_async().await;
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn scroll_points_follows_pagination() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/papers/points/scroll")
                    .body_contains("\"offset\":\"p2\"");
                then.status(200).json_body(json!({
                    "result": {
                        "points": [{ "id": "p2", "payload": { "chunk_index": 1 } }],
                        "next_page_offset": null
                    }
                }));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/papers/points/scroll");
                then.status(200).json_body(json!({
                    "result": {
                        "points": [{ "id": "p1", "payload": { "chunk_index": 0 } }],
                        "next_page_offset": "p2"
                    }
                }));
            })
            .await;

        let points = service(&server)
            .scroll_points("papers", None, None)
            .await
            .expect("scroll");

        first.assert_async().await;
        second.assert_async().await;
        let ids: Vec<_> = points.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn unreachable_server_is_an_http_error() {
        let service = QdrantService::new("http://127.0.0.1:9", None).expect("client");
        let error = service.collection_exists("papers").await.unwrap_err();
        assert!(matches!(error, QdrantError::Http(_)));
    }
}
