//! Storage backends for documents and their chunks.
//!
//! The pipeline talks to persistence through the [`DocumentStore`] trait, a
//! database-agnostic interface over a relational layout:
//!
//! ```text
//!    documents (1) ──< chunks (N)
//! ```
//!
//! Documents own their chunks; deleting a document cascades to its chunks.
//! Embeddings are stored alongside chunk text but similarity search happens
//! in memory over [`crate::similarity::SimilarityIndex`], so the store only
//! needs to hand back every embedded chunk.
//!
//! # Supported Backends
//!
//! - [`sqlite::SqliteDocumentStore`] - SQLite via `tokio-rusqlite`

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::similarity::IndexedChunk;
use crate::types::RagError;

pub use sqlite::SqliteDocumentStore;

/// A document ready for insertion, with its chunks already produced and
/// (where possible) embedded.
#[derive(Clone, Debug)]
pub struct NewDocument {
    /// Display name, usually the file name or page title.
    pub file_name: String,
    /// Originating path or URL.
    pub file_path: String,
    /// Full extracted text.
    pub content: String,
    /// Format tag: `pdf`, `docx`, `txt`, `md`, `url`, or `crawl`.
    pub file_type: String,
    /// Chunks in document order.
    pub chunks: Vec<NewChunk>,
}

/// One chunk of a [`NewDocument`].
#[derive(Clone, Debug)]
pub struct NewChunk {
    /// Chunk text.
    pub text: String,
    /// Zero-based position within the document.
    pub index: usize,
    /// Embedding vector, `None` when the embedding call failed.
    pub embedding: Option<Vec<f32>>,
}

/// A stored document as listed back to the user.
#[derive(Clone, Debug)]
pub struct DocumentRecord {
    pub id: i64,
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
    pub created_at: DateTime<Utc>,
    /// Number of chunks stored for this document.
    pub chunk_count: usize,
}

/// Database-agnostic interface for document and chunk persistence.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document and all of its chunks atomically, returning the new
    /// document id. Either everything lands or nothing does.
    async fn create_with_chunks(&self, document: NewDocument) -> Result<i64, RagError>;

    /// Lists stored documents, newest first.
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, RagError>;

    /// Deletes a document and, through the relational cascade, every chunk it
    /// owns. Returns `false` when no document had that id.
    async fn delete_document(&self, id: i64) -> Result<bool, RagError>;

    /// Fetches every chunk that carries an embedding, across all documents,
    /// for in-memory similarity search.
    async fn fetch_embedded_chunks(&self) -> Result<Vec<IndexedChunk>, RagError>;
}
