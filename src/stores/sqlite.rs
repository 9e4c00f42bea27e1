//! SQLite-backed [`DocumentStore`] over `tokio-rusqlite`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::Connection;
use tracing::{info, warn};

use super::{DocumentRecord, DocumentStore, NewDocument};
use crate::similarity::IndexedChunk;
use crate::types::RagError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    file_name   TEXT NOT NULL,
    file_path   TEXT NOT NULL,
    content     TEXT NOT NULL,
    file_type   TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS chunks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    chunk_index INTEGER NOT NULL,
    text        TEXT NOT NULL,
    embedding   TEXT,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id);
";

/// Document store over one SQLite database file.
///
/// Embeddings are persisted as JSON arrays in a nullable `TEXT` column; a
/// `NULL` marks a chunk whose embedding call failed, kept for completeness but
/// excluded from search.
#[derive(Clone, Debug)]
pub struct SqliteDocumentStore {
    conn: Connection,
}

impl SqliteDocumentStore {
    /// Opens (creating if absent) the database at `path` and applies the
    /// schema. Foreign keys are switched on so document deletes cascade.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RagError> {
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        conn.call(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(|err| RagError::Storage(format!("schema setup failed: {err}")))?;
        Ok(Self { conn })
    }

    /// Tries each candidate path in order and returns a store over the first
    /// that opens. When every candidate fails, the error lists each attempt
    /// with its failure so the operator sees the whole picture.
    pub async fn open_first(candidates: &[PathBuf]) -> Result<Self, RagError> {
        if candidates.is_empty() {
            return Err(RagError::Storage(
                "no database candidates configured".to_string(),
            ));
        }

        let mut failures = Vec::new();
        for candidate in candidates {
            match Self::open(candidate).await {
                Ok(store) => {
                    info!(path = %candidate.display(), "database opened");
                    return Ok(store);
                }
                Err(err) => {
                    warn!(path = %candidate.display(), error = %err, "database candidate failed");
                    failures.push(format!("{}: {err}", candidate.display()));
                }
            }
        }
        Err(RagError::Storage(format!(
            "all database candidates failed: [{}]",
            failures.join("; ")
        )))
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create_with_chunks(&self, document: NewDocument) -> Result<i64, RagError> {
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO documents (file_name, file_path, content, file_type, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    (
                        &document.file_name,
                        &document.file_path,
                        &document.content,
                        &document.file_type,
                        &created_at,
                    ),
                )?;
                let document_id = tx.last_insert_rowid();

                {
                    let mut insert = tx.prepare(
                        "INSERT INTO chunks (document_id, chunk_index, text, embedding, created_at) \
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                    )?;
                    for chunk in &document.chunks {
                        let embedding_json = match &chunk.embedding {
                            Some(vector) => Some(serde_json::to_string(vector).map_err(|err| {
                                tokio_rusqlite::Error::Other(Box::new(err))
                            })?),
                            None => None,
                        };
                        insert.execute((
                            document_id,
                            chunk.index as i64,
                            &chunk.text,
                            embedding_json,
                            &created_at,
                        ))?;
                    }
                }

                tx.commit()?;
                Ok(document_id)
            })
            .await
            .map_err(|err| RagError::Storage(format!("document insert failed: {err}")))
    }

    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, RagError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT d.id, d.file_name, d.file_path, d.file_type, d.created_at, \
                            COUNT(c.id) \
                     FROM documents d \
                     LEFT JOIN chunks c ON c.document_id = d.id \
                     GROUP BY d.id \
                     ORDER BY d.created_at DESC, d.id DESC",
                )?;
                let rows = stmt.query_map([], |row| {
                    let created_at: String = row.get(4)?;
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        created_at,
                        row.get::<_, i64>(5)?,
                    ))
                })?;

                let mut records = Vec::new();
                for row in rows {
                    let (id, file_name, file_path, file_type, created_at, chunk_count) = row?;
                    let created_at = created_at
                        .parse::<DateTime<Utc>>()
                        .unwrap_or_else(|_| Utc::now());
                    records.push(DocumentRecord {
                        id,
                        file_name,
                        file_path,
                        file_type,
                        created_at,
                        chunk_count: chunk_count.max(0) as usize,
                    });
                }
                Ok(records)
            })
            .await
            .map_err(|err| RagError::Storage(format!("document listing failed: {err}")))
    }

    async fn delete_document(&self, id: i64) -> Result<bool, RagError> {
        self.conn
            .call(move |conn| {
                let deleted = conn.execute("DELETE FROM documents WHERE id = ?1", [id])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(|err| RagError::Storage(format!("document delete failed: {err}")))
    }

    async fn fetch_embedded_chunks(&self) -> Result<Vec<IndexedChunk>, RagError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT c.id, c.document_id, d.file_name, c.chunk_index, c.text, c.embedding \
                     FROM chunks c \
                     JOIN documents d ON d.id = c.document_id \
                     WHERE c.embedding IS NOT NULL \
                     ORDER BY c.document_id, c.chunk_index",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                })?;

                let mut chunks = Vec::new();
                for row in rows {
                    let (chunk_id, document_id, source, chunk_index, text, embedding_json) = row?;
                    let embedding: Vec<f32> =
                        serde_json::from_str(&embedding_json).unwrap_or_default();
                    chunks.push(IndexedChunk {
                        chunk_id,
                        document_id,
                        source,
                        chunk_index: chunk_index.max(0) as usize,
                        text,
                        embedding,
                    });
                }
                Ok(chunks)
            })
            .await
            .map_err(|err| RagError::Storage(format!("chunk fetch failed: {err}")))
    }
}
