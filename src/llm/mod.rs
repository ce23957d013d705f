//! Prompt-completion clients for the local LLM runtime.
//!
//! The agents only need "prompt in, text out". The Ollama adapter issues `POST /api/generate`
//! with streaming disabled and returns the trimmed completion.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced while requesting a completion.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Runtime was unreachable or the endpoint does not exist.
    #[error("LLM runtime unavailable: {0}")]
    ProviderUnavailable(String),
    /// Runtime returned an error response.
    #[error("LLM generation failed: {0}")]
    GenerationFailed(String),
    /// Runtime response could not be parsed.
    #[error("Malformed LLM response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by completion providers.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Return the raw completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Model identifier used for completions.
    fn model(&self) -> &str;
}

/// Completion client backed by an Ollama runtime.
pub struct OllamaGenerationClient {
    http: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaGenerationClient {
    /// Create a client for `model` served at `base_url`.
    pub fn new(
        base_url: String,
        model: String,
        temperature: f32,
        timeout: Option<Duration>,
    ) -> Result<Self, GenerationError> {
        let mut builder = Client::builder().user_agent("research-assistant/generate");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|error| {
            GenerationError::ProviderUnavailable(format!("failed to build HTTP client: {error}"))
        })?;
        Ok(Self {
            http,
            base_url,
            model,
            temperature,
        })
    }

    /// Build a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        Self::new(
            config.ollama_url.clone(),
            config.llm_model.clone(),
            config.llm_temperature,
            config.llm_timeout_secs.map(Duration::from_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    done: bool,
}

#[async_trait]
impl GenerationClient for OllamaGenerationClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.temperature,
            }
        });

        tracing::debug!(
            model = %self.model,
            prompt_chars = prompt.len(),
            "Requesting completion"
        );

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404: {body}",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            GenerationError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(GenerationError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }

    fn model(&self) -> &str {
        &self.model
    }
}
