//! Runtime configuration resolved from defaults, an optional JSON file, and
//! `RAGMILL_*` environment variables (later wins).
//!
//! ## Example
//!
//! ```rust,ignore
//! use ragmill::config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .with_file("ragmill.json")?
//!     .with_env()
//!     .build()?;
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::types::RagError;

/// Chunker defaults, sized for prose documents.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_OVERLAP: usize = 200;

/// Retrieval and generation defaults.
pub const DEFAULT_MAX_CONTEXT_CHUNKS: usize = 5;
pub const DEFAULT_NUM_CTX: usize = 2000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_EMBED_PAUSE_MS: u64 = 100;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
const DEFAULT_CHAT_MODEL: &str = "llama3.1:8b";
const DEFAULT_DATABASE: &str = "ragmill.db";

/// Inference backend settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Base URL of the Ollama HTTP API.
    pub base_url: String,
    /// Model used for embeddings.
    pub embedding_model: String,
    /// Model used for chat completions.
    pub chat_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database paths tried in order; the first that opens wins.
    pub database_candidates: Vec<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_candidates: vec![PathBuf::from(DEFAULT_DATABASE)],
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Trailing characters carried from one chunk into the next.
    pub overlap: usize,
    /// Maximum retrieved chunks assembled into the answer context.
    pub max_context_chunks: usize,
    /// Context window budget passed to the chat model.
    pub num_ctx: usize,
    /// Sampling temperature for answers.
    pub temperature: f32,
    /// Pause between sequential embedding calls, in milliseconds.
    pub embed_pause_ms: u64,
    pub ollama: OllamaConfig,
    pub storage: StorageConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            max_context_chunks: DEFAULT_MAX_CONTEXT_CHUNKS,
            num_ctx: DEFAULT_NUM_CTX,
            temperature: DEFAULT_TEMPERATURE,
            embed_pause_ms: DEFAULT_EMBED_PAUSE_MS,
            ollama: OllamaConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl RagConfig {
    /// Parses the configured base URL.
    pub fn base_url(&self) -> Result<Url, RagError> {
        Url::parse(&self.ollama.base_url)
            .map_err(|err| RagError::Validation(format!("invalid base_url: {err}")))
    }

    fn validate(&self) -> Result<(), RagError> {
        if self.chunk_size == 0 {
            return Err(RagError::Validation(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(RagError::Validation(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        if self.max_context_chunks == 0 {
            return Err(RagError::Validation(
                "max_context_chunks must be greater than zero".to_string(),
            ));
        }
        if self.storage.database_candidates.is_empty() {
            return Err(RagError::Validation(
                "at least one database candidate is required".to_string(),
            ));
        }
        self.base_url().map(|_| ())
    }
}

/// Builder resolving configuration from layered sources.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    base: RagConfig,
    use_env: bool,
}

impl ConfigBuilder {
    /// Starts from compiled defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: RagConfig::default(),
            use_env: false,
        }
    }

    /// Layers a JSON config file over the current values.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self, RagError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            RagError::Validation(format!("cannot read config {}: {err}", path.display()))
        })?;
        self.base = serde_json::from_str(&content).map_err(|err| {
            RagError::Validation(format!("cannot parse config {}: {err}", path.display()))
        })?;
        Ok(self)
    }

    /// Layers the file only when it exists; defaults stand otherwise.
    pub fn with_file_if_present(self, path: impl AsRef<Path>) -> Result<Self, RagError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Enables the `RAGMILL_*` environment variable layer.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        self.use_env = true;
        self
    }

    /// Applies the environment layer (when enabled), validates, and returns
    /// the final configuration.
    pub fn build(mut self) -> Result<RagConfig, RagError> {
        if self.use_env {
            apply_env(&mut self.base)?;
        }
        self.base.validate()?;
        Ok(self.base)
    }
}

fn apply_env(config: &mut RagConfig) -> Result<(), RagError> {
    if let Some(value) = env_var("RAGMILL_CHUNK_SIZE") {
        config.chunk_size = parse_env("RAGMILL_CHUNK_SIZE", &value)?;
    }
    if let Some(value) = env_var("RAGMILL_OVERLAP") {
        config.overlap = parse_env("RAGMILL_OVERLAP", &value)?;
    }
    if let Some(value) = env_var("RAGMILL_MAX_CONTEXT_CHUNKS") {
        config.max_context_chunks = parse_env("RAGMILL_MAX_CONTEXT_CHUNKS", &value)?;
    }
    if let Some(value) = env_var("RAGMILL_NUM_CTX") {
        config.num_ctx = parse_env("RAGMILL_NUM_CTX", &value)?;
    }
    if let Some(value) = env_var("RAGMILL_TEMPERATURE") {
        config.temperature = parse_env("RAGMILL_TEMPERATURE", &value)?;
    }
    if let Some(value) = env_var("RAGMILL_EMBED_PAUSE_MS") {
        config.embed_pause_ms = parse_env("RAGMILL_EMBED_PAUSE_MS", &value)?;
    }
    if let Some(value) = env_var("RAGMILL_BASE_URL") {
        config.ollama.base_url = value;
    }
    if let Some(value) = env_var("RAGMILL_EMBEDDING_MODEL") {
        config.ollama.embedding_model = value;
    }
    if let Some(value) = env_var("RAGMILL_CHAT_MODEL") {
        config.ollama.chat_model = value;
    }
    if let Some(value) = env_var("RAGMILL_DATABASE") {
        // Semicolon-separated list of candidate paths, tried in order.
        config.storage.database_candidates =
            value.split(';').map(PathBuf::from).collect();
    }
    Ok(())
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, RagError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|err| RagError::Validation(format!("cannot parse {key}={value}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.overlap, 200);
        assert_eq!(config.max_context_chunks, 5);
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.storage.database_candidates.len(), 1);
    }

    #[test]
    fn file_layer_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "chunk_size": 500,
                "overlap": 50,
                "ollama": { "chat_model": "mistral" },
                "storage": { "database_candidates": ["/data/a.db", "/data/b.db"] }
            }"#,
        )
        .unwrap();

        let config = ConfigBuilder::new().with_file(&path).unwrap().build().unwrap();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.overlap, 50);
        assert_eq!(config.ollama.chat_model, "mistral");
        // Unspecified fields keep their defaults.
        assert_eq!(config.ollama.embedding_model, "nomic-embed-text");
        assert_eq!(config.storage.database_candidates.len(), 2);
    }

    #[test]
    fn missing_optional_file_keeps_defaults() {
        let config = ConfigBuilder::new()
            .with_file_if_present("/definitely/not/here.json")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.chunk_size, 1000);
    }

    #[test]
    fn overlap_must_stay_below_chunk_size() {
        let mut builder = ConfigBuilder::new();
        builder.base.chunk_size = 100;
        builder.base.overlap = 100;
        let err = builder.build().unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let mut builder = ConfigBuilder::new();
        builder.base.chunk_size = 0;
        assert!(builder.build().is_err());
    }

    #[test]
    fn garbage_base_url_is_rejected() {
        let mut builder = ConfigBuilder::new();
        builder.base.ollama.base_url = "not a url".to_string();
        assert!(builder.build().is_err());
    }
}
