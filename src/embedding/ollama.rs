//! Ollama-backed embeddings via `POST /api/embed`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{EmbeddingClient, EmbeddingClientError};

/// Inputs sent per request; large documents are embedded in several round trips.
const EMBED_BATCH_SIZE: usize = 32;

/// Embedding client that delegates to a local Ollama runtime.
pub struct OllamaEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbeddingClient {
    /// Create a client for `model` served at `base_url`.
    pub fn new(base_url: String, model: String, dimension: usize) -> Self {
        let http = Client::builder()
            .user_agent("research-assistant/embed")
            .build()
            .unwrap_or_else(|error| {
                tracing::warn!(error = %error, "Falling back to default HTTP client for embeddings");
                Client::new()
            });
        Self {
            http,
            base_url,
            model,
            dimension,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url.trim_end_matches('/'))
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let response = self
            .http
            .post(self.endpoint())
            .json(&json!({
                "model": self.model,
                "input": batch,
            }))
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: EmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::GenerationFailed(format!(
                "failed to decode Ollama embed response: {error}"
            ))
        })?;

        if body.embeddings.len() != batch.len() {
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "expected {} embeddings, received {}",
                batch.len(),
                body.embeddings.len()
            )));
        }

        Ok(body.embeddings)
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            embeddings.extend(self.embed_batch(batch).await?);
        }

        tracing::debug!(
            model = %self.model,
            vectors = embeddings.len(),
            "Generated embeddings"
        );
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn batches_requests_and_preserves_order() {
        let server = MockServer::start_async().await;
        let client = OllamaEmbeddingClient::new(server.base_url(), "all-minilm".into(), 2);

        let texts: Vec<String> = (0..EMBED_BATCH_SIZE + 1).map(|i| format!("chunk {i}")).collect();
        let full_batch: Vec<Vec<f32>> = (0..EMBED_BATCH_SIZE).map(|i| vec![i as f32, 0.0]).collect();

        let first = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .body_contains("\"chunk 0\"");
                then.status(200).json_body(json!({ "embeddings": full_batch }));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .body_contains(format!("\"chunk {EMBED_BATCH_SIZE}\""));
                then.status(200).json_body(json!({ "embeddings": [[99.0, 1.0]] }));
            })
            .await;

        let vectors = client.generate_embeddings(texts).await.expect("embeddings");

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(vectors.len(), EMBED_BATCH_SIZE + 1);
        assert_eq!(vectors[1], vec![1.0, 0.0]);
        assert_eq!(vectors[EMBED_BATCH_SIZE], vec![99.0, 1.0]);
    }

    #[tokio::test]
    async fn surfaces_error_status() {
        let server = MockServer::start_async().await;
        let client = OllamaEmbeddingClient::new(server.base_url(), "missing".into(), 2);
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(404).body("model not found");
            })
            .await;

        let error = client
            .generate_embeddings(vec!["text".into()])
            .await
            .unwrap_err();
        assert!(
            matches!(error, EmbeddingClientError::GenerationFailed(message) if message.contains("404"))
        );
    }
}
