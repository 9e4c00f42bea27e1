//! Provider seams for embedding and completion backends.
//!
//! The pipeline talks to backends through two narrow traits:
//! [`crate::embeddings::EmbeddingProvider`] for vectors and
//! [`CompletionProvider`] for grounded answers. [`ollama::OllamaClient`]
//! implements both against a local Ollama HTTP API.

pub mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::RagError;

pub use ollama::{OllamaClient, ProbeReport};

/// One message in a chat exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    /// A user-authored turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Backend that turns a chat exchange into completion text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Requests a completion for `messages` with the given sampling
    /// temperature and context-window budget (in tokens).
    async fn complete(
        &self,
        messages: &[ChatTurn],
        temperature: f32,
        context_budget: usize,
    ) -> Result<String, RagError>;
}
