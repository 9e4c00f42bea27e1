//! End-to-end retrieval pipeline: ingestion on one side, grounded question
//! answering on the other.
//!
//! ```text
//!   file / url / crawl                         question
//!         │                                        │
//!    extract text                          embed (search_query)
//!         │                                        │
//!      chunker                              in-memory cosine
//!         │                                     top-k scan
//!   embed (search_document)                       │
//!         │                                 context assembly
//!      store insert                               │
//!                                           chat completion
//! ```
//!
//! Retrieval is an exact scan: every embedded chunk is loaded and scored
//! against the query. Corpus sizes here are small enough that an approximate
//! index would buy nothing.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument, warn};
use url::Url;

use crate::chunking::SentenceChunker;
use crate::config::RagConfig;
use crate::embeddings::{EmbedRole, EmbeddingOrchestrator, EmbeddingOutcome};
use crate::extract;
use crate::providers::{ChatTurn, CompletionProvider};
use crate::scrape::{CrawlOptions, PageScraper};
use crate::similarity::SimilarityIndex;
use crate::stores::{DocumentRecord, DocumentStore, NewChunk, NewDocument};
use crate::types::RagError;

const EMPTY_QUESTION_REPLY: &str = "Sorry, I couldn't process your question. Please try again.";
const NO_DOCUMENTS_REPLY: &str = "I don't have any relevant information to answer your question. \
                                  Please add some documents first.";

/// What ingestion did with one source.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Id of the stored document.
    pub document_id: i64,
    /// Total chunks stored.
    pub chunk_count: usize,
    /// Chunks stored without an embedding (provider failures); these are
    /// invisible to retrieval.
    pub skipped_chunks: usize,
}

/// A grounded answer plus the documents it drew from.
#[derive(Debug, Clone)]
pub struct ChatAnswer {
    pub content: String,
    /// Source document names in first-retrieved order, deduplicated.
    pub sources: Vec<String>,
}

/// Ties chunking, embedding, storage, retrieval, and completion together.
pub struct RetrievalPipeline {
    store: Arc<dyn DocumentStore>,
    embedder: EmbeddingOrchestrator,
    completion: Arc<dyn CompletionProvider>,
    scraper: PageScraper,
    chunker: SentenceChunker,
    max_context_chunks: usize,
    num_ctx: usize,
    temperature: f32,
}

impl RetrievalPipeline {
    /// Assembles a pipeline from its parts, validating the chunker settings.
    pub fn new(
        config: &RagConfig,
        store: Arc<dyn DocumentStore>,
        embedder: EmbeddingOrchestrator,
        completion: Arc<dyn CompletionProvider>,
        scraper: PageScraper,
    ) -> Result<Self, RagError> {
        Ok(Self {
            store,
            embedder,
            completion,
            scraper,
            chunker: SentenceChunker::new(config.chunk_size, config.overlap)?,
            max_context_chunks: config.max_context_chunks,
            num_ctx: config.num_ctx,
            temperature: config.temperature,
        })
    }

    /// Ingests already-extracted text under the given name and origin.
    #[instrument(skip(self, content), fields(chars = content.len()))]
    pub async fn ingest_text(
        &self,
        file_name: &str,
        file_path: &str,
        file_type: &str,
        content: &str,
    ) -> Result<IngestReport, RagError> {
        if content.trim().is_empty() {
            return Err(RagError::Validation(format!(
                "{file_name} contained no extractable text"
            )));
        }

        let texts = self.chunker.chunk(content);
        if texts.is_empty() {
            return Err(RagError::Validation(format!(
                "{file_name} produced no chunks"
            )));
        }

        let outcomes = self.embedder.embed_batch(&texts, EmbedRole::Document).await;
        let skipped = outcomes.iter().filter(|o| !o.is_embedded()).count();
        if skipped > 0 {
            warn!(file_name, skipped, "some chunks stored without embeddings");
        }

        let chunks = texts
            .into_iter()
            .zip(outcomes)
            .enumerate()
            .map(|(index, (text, outcome))| NewChunk {
                text,
                index,
                embedding: outcome.into_vector(),
            })
            .collect::<Vec<_>>();
        let chunk_count = chunks.len();

        let document_id = self
            .store
            .create_with_chunks(NewDocument {
                file_name: file_name.to_string(),
                file_path: file_path.to_string(),
                content: content.to_string(),
                file_type: file_type.to_string(),
                chunks,
            })
            .await?;

        info!(document_id, chunk_count, skipped, "document ingested");
        Ok(IngestReport {
            document_id,
            chunk_count,
            skipped_chunks: skipped,
        })
    }

    /// Extracts a local file and ingests it.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport, RagError> {
        let content = extract::extract_text(path).await?;
        let file_type = extract::file_type(path).ok_or_else(|| {
            RagError::UnsupportedFormat(format!(
                "unsupported file type: {}",
                path.display()
            ))
        })?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("document")
            .to_string();
        self.ingest_text(&file_name, &path.to_string_lossy(), &file_type, &content)
            .await
    }

    /// Scrapes a single page and ingests its text.
    pub async fn ingest_url(&self, url: &Url) -> Result<IngestReport, RagError> {
        let content = self.scraper.scrape(url).await?;
        self.ingest_text(url.as_str(), url.as_str(), "url", &content)
            .await
    }

    /// Crawls from a start page and ingests the combined text as one document.
    pub async fn ingest_crawl(
        &self,
        url: &Url,
        options: &CrawlOptions,
    ) -> Result<IngestReport, RagError> {
        let content = self.scraper.crawl(url, options).await?;
        self.ingest_text(url.as_str(), url.as_str(), "crawl", &content)
            .await
    }

    /// Lists stored documents.
    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>, RagError> {
        self.store.list_documents().await
    }

    /// Deletes a document and its chunks. Returns `false` for an unknown id.
    pub async fn delete_document(&self, id: i64) -> Result<bool, RagError> {
        self.store.delete_document(id).await
    }

    /// Answers a question grounded in the stored corpus.
    ///
    /// This never fails: embedding trouble, an empty corpus, and completion
    /// errors each degrade to a fixed user-facing reply.
    #[instrument(skip(self, question))]
    pub async fn ask(&self, question: &str) -> ChatAnswer {
        let query = match self.embedder.embed_one(question, EmbedRole::Query).await {
            EmbeddingOutcome::Embedded(vector) => vector,
            EmbeddingOutcome::Unembedded => {
                return ChatAnswer {
                    content: EMPTY_QUESTION_REPLY.to_string(),
                    sources: Vec::new(),
                };
            }
        };

        let retrieved = match self.retrieve(&query).await {
            Ok(retrieved) => retrieved,
            Err(err) => {
                warn!(error = %err, "retrieval failed");
                return ChatAnswer {
                    content: format!("Error generating response: {err}"),
                    sources: Vec::new(),
                };
            }
        };
        if retrieved.is_empty() {
            return ChatAnswer {
                content: NO_DOCUMENTS_REPLY.to_string(),
                sources: Vec::new(),
            };
        }

        let mut context = String::new();
        let mut sources: Vec<String> = Vec::new();
        for scored in &retrieved {
            context.push_str(&format!(
                "Source: {}\n{}\n\n",
                scored.chunk.source, scored.chunk.text
            ));
            if !sources.contains(&scored.chunk.source) {
                sources.push(scored.chunk.source.clone());
            }
        }

        let prompt = format!(
            "Based on the following context, please answer the question. \
             If the answer is not in the context, say so.\n\n\
             Context:\n{context}\n\
             Question: {question}\n\n\
             Answer:"
        );

        match self
            .completion
            .complete(&[ChatTurn::user(prompt)], self.temperature, self.num_ctx)
            .await
        {
            Ok(content) => ChatAnswer { content, sources },
            Err(err) => {
                warn!(error = %err, "completion failed");
                ChatAnswer {
                    content: format!("Error generating response: {err}"),
                    sources: Vec::new(),
                }
            }
        }
    }

    async fn retrieve(
        &self,
        query: &[f32],
    ) -> Result<Vec<crate::similarity::ScoredChunk>, RagError> {
        let chunks = self.store.fetch_embedded_chunks().await?;
        let index = SimilarityIndex::new(chunks);
        Ok(index.search(query, self.max_context_chunks))
    }
}
