//! ragmill: retrieval-augmented question answering over local documents.
//!
//! Documents (files, pages, crawls) are extracted to plain text, split into
//! overlapping sentence-aware chunks, embedded one at a time against a local
//! Ollama backend, and persisted in SQLite. Questions are embedded with a
//! query-role prefix, matched against every stored chunk by exact cosine
//! similarity, and answered by a chat model grounded in the top matches.
//!
//! ```text
//!   extract ─▶ chunk ─▶ embed ─▶ store
//!                                  │
//!   question ─▶ embed ─▶ cosine top-k ─▶ prompt ─▶ answer + sources
//! ```
//!
//! Entry points: [`pipeline::RetrievalPipeline`] for the flows,
//! [`config::ConfigBuilder`] for settings, [`repl`] for the interactive
//! surface.

pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod extract;
pub mod pipeline;
pub mod providers;
pub mod repl;
pub mod scrape;
pub mod similarity;
pub mod stores;
pub mod types;

pub use pipeline::{ChatAnswer, IngestReport, RetrievalPipeline};
pub use types::RagError;
