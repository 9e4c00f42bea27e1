//! Embedding orchestration: role prefixes, pacing, and failure isolation.
//!
//! The orchestrator sequences calls to an [`EmbeddingProvider`] one at a time
//! with a fixed inter-call pause, sized for a low-throughput local inference
//! backend. That is a latency-for-safety trade-off, not a correctness
//! requirement. A failed or empty result becomes an explicit
//! [`EmbeddingOutcome::Unembedded`] marker so the rest of a batch completes;
//! callers filter unembedded entries out of similarity search.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::types::RagError;

/// Which side of the asymmetric representation a text belongs to.
///
/// The provider model (nomic-style) expects an instruction prefix that
/// distinguishes corpus content from a question. The role is passed explicitly
/// at every call site; there is no default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedRole {
    /// Corpus content being ingested.
    Document,
    /// A user question at query time.
    Query,
}

impl EmbedRole {
    /// Instruction prefix prepended before the text is sent to the provider.
    pub fn prefix(&self) -> &'static str {
        match self {
            EmbedRole::Document => "search_document",
            EmbedRole::Query => "search_query",
        }
    }
}

/// Per-item embedding result.
///
/// A tagged outcome rather than an empty-vector sentinel, so a legitimate
/// all-zero embedding is never confused with failure.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingOutcome {
    /// The provider returned a vector.
    Embedded(Vec<f32>),
    /// The call failed or returned no vector; the slot is explicitly empty.
    Unembedded,
}

impl EmbeddingOutcome {
    /// Returns the vector when embedded.
    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            EmbeddingOutcome::Embedded(v) => Some(v),
            EmbeddingOutcome::Unembedded => None,
        }
    }

    /// Consumes the outcome, yielding the vector when embedded.
    pub fn into_vector(self) -> Option<Vec<f32>> {
        match self {
            EmbeddingOutcome::Embedded(v) => Some(v),
            EmbeddingOutcome::Unembedded => None,
        }
    }

    /// Returns `true` for [`EmbeddingOutcome::Embedded`].
    pub fn is_embedded(&self) -> bool {
        matches!(self, EmbeddingOutcome::Embedded(_))
    }
}

/// Backend that turns one prefixed text into a vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a single already-prefixed text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;
}

/// Sequences embedding calls with role prefixing and backend-friendly pacing.
#[derive(Clone)]
pub struct EmbeddingOrchestrator {
    provider: Arc<dyn EmbeddingProvider>,
    pause: Duration,
}

impl EmbeddingOrchestrator {
    /// Creates an orchestrator over `provider` with the given inter-call pause.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, pause: Duration) -> Self {
        Self { provider, pause }
    }

    /// Embeds one text under the given role.
    ///
    /// Provider errors and empty vectors degrade to
    /// [`EmbeddingOutcome::Unembedded`]; this method never fails.
    pub async fn embed_one(&self, text: &str, role: EmbedRole) -> EmbeddingOutcome {
        let prefixed = format!("{}: {}", role.prefix(), text);
        match self.provider.embed(&prefixed).await {
            Ok(vector) if !vector.is_empty() => {
                debug!(role = role.prefix(), dims = vector.len(), "embedded text");
                EmbeddingOutcome::Embedded(vector)
            }
            Ok(_) => {
                warn!(role = role.prefix(), "provider returned an empty embedding");
                EmbeddingOutcome::Unembedded
            }
            Err(err) => {
                warn!(role = role.prefix(), error = %err, "embedding call failed");
                EmbeddingOutcome::Unembedded
            }
        }
    }

    /// Embeds a batch strictly one item at a time, pausing between calls.
    ///
    /// The output has the same length and order as the input; failed slots are
    /// [`EmbeddingOutcome::Unembedded`] and the batch always completes.
    pub async fn embed_batch(&self, texts: &[String], role: EmbedRole) -> Vec<EmbeddingOutcome> {
        let mut outcomes = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            if i > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            outcomes.push(self.embed_one(text, role).await);
        }
        outcomes
    }
}

/// Deterministic hashed bag-of-words embedder for tests and offline use.
///
/// Tokens are lowercased alphanumeric runs hashed into a fixed number of
/// buckets; the count in each bucket forms the vector. Identical text always
/// produces identical vectors, and texts sharing vocabulary land near each
/// other under cosine similarity.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    /// Creates an embedder producing vectors of `dims` buckets.
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut vector = vec![0.0f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dims;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }
}
