//! Shared error taxonomy for the retrieval pipeline and its collaborators.

use thiserror::Error;

/// Errors surfaced by ingestion, retrieval, and the collaborators they drive.
///
/// The taxonomy follows the failure-handling contract of the pipeline:
///
/// * [`RagError::Validation`] — malformed input (path, URL, empty text);
///   surfaced immediately, nothing attempted.
/// * [`RagError::UnsupportedFormat`] — a file extension the extractor does not
///   handle; ingestion never starts.
/// * [`RagError::Extraction`] — a supported format that failed to yield text;
///   ingestion aborted, nothing persisted.
/// * [`RagError::Provider`] — the embedding/completion backend failed. Per-chunk
///   embed failures degrade to an unembedded marker instead of this error;
///   query-time failures abort only that request.
/// * [`RagError::Storage`] — database failure; during ingest the transaction is
///   rolled back and the document never becomes visible.
#[derive(Debug, Error)]
pub enum RagError {
    /// Malformed or empty input rejected before any work was attempted.
    #[error("validation failed: {0}")]
    Validation(String),

    /// File format the extractor does not support.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A supported document could not be converted to plain text.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The embedding or completion provider returned an error.
    #[error("provider error: {0}")]
    Provider(String),

    /// The document store failed an operation.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem error while reading a source document or config file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure talking to the provider or a web source.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
