//! HTTP client for an Ollama-style inference backend.
//!
//! Speaks three endpoints: `POST /api/embeddings` for vectors,
//! `POST /api/chat` for completions, and `GET /api/tags` for the connectivity
//! probe. Responses are non-streaming; the backend serves one request at a
//! time and the pipeline never issues calls concurrently.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{ChatTurn, CompletionProvider};
use crate::embeddings::EmbeddingProvider;
use crate::types::RagError;

/// Client bound to one Ollama base URL and a fixed pair of models.
#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: Url,
    embedding_model: String,
    chat_model: String,
}

impl OllamaClient {
    /// Creates a client talking to `base_url` with the given model names.
    pub fn new(
        http: Client,
        base_url: Url,
        embedding_model: impl Into<String>,
        chat_model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url,
            embedding_model: embedding_model.into(),
            chat_model: chat_model.into(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, RagError> {
        self.base_url
            .join(path)
            .map_err(|err| RagError::Provider(format!("invalid endpoint {path}: {err}")))
    }

    /// Fetches the models the backend has available.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, RagError> {
        let url = self.endpoint("/api/tags")?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| RagError::Provider(format!("tags request failed: {err}")))?
            .error_for_status()
            .map_err(|err| RagError::Provider(format!("tags request rejected: {err}")))?;
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|err| RagError::Provider(format!("malformed tags response: {err}")))?;
        Ok(tags.models)
    }

    /// Runs a connectivity check: lists models, then exercises one embedding
    /// and one chat call. Used by the interactive `probe` command.
    pub async fn probe(&self) -> Result<ProbeReport, RagError> {
        let models = self.list_models().await?;

        let embedding_dims = match self.embed("search_document: probe").await {
            Ok(vector) => Some(vector.len()),
            Err(_) => None,
        };

        let chat_reply = self
            .complete(&[ChatTurn::user("Say hello in one word.")], 0.7, 256)
            .await
            .ok();

        Ok(ProbeReport {
            models,
            embedding_model: self.embedding_model.clone(),
            chat_model: self.chat_model.clone(),
            embedding_dims,
            chat_reply,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let url = self.endpoint("/api/embeddings")?;
        let request = EmbeddingsRequest {
            model: &self.embedding_model,
            prompt: text,
        };
        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|err| RagError::Provider(format!("embeddings request failed: {err}")))?
            .error_for_status()
            .map_err(|err| RagError::Provider(format!("embeddings request rejected: {err}")))?;
        let body: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|err| RagError::Provider(format!("malformed embeddings response: {err}")))?;

        let vector: Vec<f32> = body
            .embedding
            .unwrap_or_default()
            .into_iter()
            .map(|value| value as f32)
            .collect();
        debug!(model = %self.embedding_model, dims = vector.len(), "embedding received");
        Ok(vector)
    }
}

#[async_trait]
impl CompletionProvider for OllamaClient {
    async fn complete(
        &self,
        messages: &[ChatTurn],
        temperature: f32,
        context_budget: usize,
    ) -> Result<String, RagError> {
        let url = self.endpoint("/api/chat")?;
        let request = ChatRequest {
            model: &self.chat_model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature,
                num_ctx: context_budget,
            },
        };
        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|err| RagError::Provider(format!("chat request failed: {err}")))?
            .error_for_status()
            .map_err(|err| RagError::Provider(format!("chat request rejected: {err}")))?;
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| RagError::Provider(format!("malformed chat response: {err}")))?;

        body.message
            .map(|message| message.content)
            .ok_or_else(|| RagError::Provider("chat response carried no message".to_string()))
    }
}

/// Outcome of [`OllamaClient::probe`].
#[derive(Debug, Clone)]
pub struct ProbeReport {
    /// Models the backend advertises.
    pub models: Vec<ModelInfo>,
    /// Embedding model this client is configured for.
    pub embedding_model: String,
    /// Chat model this client is configured for.
    pub chat_model: String,
    /// Dimensionality of a test embedding, `None` when the call failed.
    pub embedding_dims: Option<usize>,
    /// Reply to a one-word test prompt, `None` when the call failed.
    pub chat_reply: Option<String>,
}

/// One model entry from `GET /api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    embedding: Option<Vec<f64>>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_ctx: usize,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatTurn>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}
