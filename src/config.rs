use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the research assistant.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores chunk embeddings.
    pub qdrant_url: String,
    /// Name of the Qdrant collection holding every indexed chunk.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Base URL of the Ollama runtime used for embeddings and generation.
    pub ollama_url: String,
    /// Model identifier used for prompt completions.
    pub llm_model: String,
    /// Sampling temperature sent with every completion request.
    pub llm_temperature: f32,
    /// Optional HTTP timeout applied to LLM calls, in seconds.
    pub llm_timeout_secs: Option<u64>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Directory where accepted PDF uploads are stored.
    pub upload_dir: PathBuf,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between adjacent chunks in characters. Always smaller than `chunk_size`.
    pub chunk_overlap: usize,
    /// Number of chunks the retriever hands to the answerer.
    pub retrieval_top_k: usize,
    /// Upper bound accepted for `limit` on related-paper lookups.
    pub related_max_limit: usize,
    /// Maximum number of context tokens placed into a single prompt.
    pub prompt_token_budget: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends for the ingestion pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime (`/api/embed`).
    Ollama,
    /// Deterministic in-process hashing, useful offline and in tests.
    Hashed,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let chunk_size: usize = parse_env_or("CHUNK_SIZE", 1000)?;
        let chunk_overlap: usize = parse_env_or("CHUNK_OVERLAP", 200)?;
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(ConfigError::InvalidValue(format!(
                "CHUNK_OVERLAP ({chunk_overlap}) must be smaller than CHUNK_SIZE ({chunk_size})"
            )));
        }

        let embedding_dimension: usize = parse_env_or("EMBEDDING_DIMENSION", 384)?;
        if embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }

        Ok(Self {
            qdrant_url: env_or("QDRANT_URL", "http://localhost:6333"),
            qdrant_collection_name: env_or("QDRANT_COLLECTION_NAME", "research_papers"),
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            ollama_url: env_or("OLLAMA_URL", "http://localhost:11434"),
            llm_model: env_or("LLM_MODEL", "llama2"),
            llm_temperature: parse_env_or("LLM_TEMPERATURE", 0.2)?,
            llm_timeout_secs: load_env_optional("LLM_TIMEOUT_SECS")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("LLM_TIMEOUT_SECS".into()))
                })
                .transpose()?,
            embedding_provider: env_or("EMBEDDING_PROVIDER", "ollama")
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string()))?,
            embedding_model: env_or("EMBEDDING_MODEL", "all-minilm"),
            embedding_dimension,
            upload_dir: PathBuf::from(env_or("UPLOAD_DIR", "uploads")),
            max_upload_bytes: parse_env_or("MAX_UPLOAD_BYTES", 50 * 1024 * 1024)?,
            chunk_size,
            chunk_overlap,
            retrieval_top_k: parse_env_or::<usize>("RETRIEVAL_TOP_K", 5)?.max(1),
            related_max_limit: parse_env_or::<usize>("RELATED_MAX_LIMIT", 50)?.max(1),
            prompt_token_budget: parse_env_or("PROMPT_TOKEN_BUDGET", 3000)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hashed" => Ok(Self::Hashed),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        ollama_url = %config.ollama_url,
        llm_model = %config.llm_model,
        embedding_provider = ?config.embedding_provider,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
