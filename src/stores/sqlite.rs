//! Durable chunk store on SQLite with the `sqlite-vec` extension.
//!
//! Embeddings are stored as little-endian float32 blobs (the `sqlite-vec`
//! vector layout) and compared in SQL via `vec_distance_cosine`, so the
//! nearest-neighbor scan stays inside the database.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, OptionalExtension, ffi};

use super::{ChunkStore, StoredChunk};
use crate::types::RagError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    token_count INTEGER NOT NULL,
    page_number INTEGER,
    embedding BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id);
";

/// SQLite-backed [`ChunkStore`].
#[derive(Clone)]
pub struct SqliteChunkStore {
    conn: Connection,
}

impl SqliteChunkStore {
    /// Opens (or creates) the database at `path` and prepares the schema.
    ///
    /// The `sqlite-vec` extension is registered process-wide on first use
    /// and its presence verified with `vec_version()`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RagError> {
        register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Self::bootstrap(&conn).await?;
        Ok(Self { conn })
    }

    /// In-memory database, mainly for tests.
    pub async fn open_in_memory() -> Result<Self, RagError> {
        register_sqlite_vec()?;
        let conn = Connection::open_in_memory()
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Self::bootstrap(&conn).await?;
        Ok(Self { conn })
    }

    async fn bootstrap(conn: &Connection) -> Result<(), RagError> {
        conn.call(|conn| -> Result<(), tokio_rusqlite::rusqlite::Error> {
            conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))
                ?;
            conn.execute_batch(SCHEMA)
                ?;
            Ok(())
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn document_dimensions(&self, document_id: &str) -> Result<Option<usize>, RagError> {
        let document_id = document_id.to_string();
        self.conn
            .call(move |conn| -> Result<Option<usize>, tokio_rusqlite::rusqlite::Error> {
                let bytes: Option<i64> = conn
                    .query_row(
                        "SELECT length(embedding) FROM chunks WHERE document_id = ? LIMIT 1",
                        [&document_id],
                        |row| row.get(0),
                    )
                    .optional()
                    ?;
                Ok(bytes.map(|b| b as usize / 4))
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }
}

fn register_sqlite_vec() -> Result<(), RagError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    INIT.get_or_init(|| unsafe {
        type ExtensionInit = unsafe extern "C" fn(
            *mut ffi::sqlite3,
            *mut *mut c_char,
            *const ffi::sqlite3_api_routines,
        ) -> i32;

        let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
        let init_fn: ExtensionInit = transmute::<unsafe extern "C" fn(), ExtensionInit>(init);
        let rc = ffi::sqlite3_auto_extension(Some(init_fn));
        if rc == 0 {
            Ok(())
        } else {
            Err(format!("failed to register sqlite-vec extension (code {rc})"))
        }
    })
    .clone()
    .map_err(RagError::Storage)
}

fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect()
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn insert_chunks(&self, chunks: Vec<StoredChunk>) -> Result<(), RagError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let width = chunks[0].embedding.len();
        for chunk in &chunks {
            if chunk.embedding.len() != width {
                return Err(RagError::Validation(format!(
                    "mixed embedding dimensions in batch: {} vs {width}",
                    chunk.embedding.len()
                )));
            }
            if !chunk.embedding.iter().all(|v| v.is_finite()) {
                return Err(RagError::Validation(format!(
                    "non-finite embedding component in chunk {}",
                    chunk.id
                )));
            }
        }

        // Single-flow ingestion per document makes this check race-free.
        let mut checked: Vec<&str> = Vec::new();
        for document_id in chunks.iter().map(|c| c.document_id.as_str()) {
            if checked.contains(&document_id) {
                continue;
            }
            checked.push(document_id);
            if let Some(existing) = self.document_dimensions(document_id).await? {
                if existing != width {
                    return Err(RagError::Validation(format!(
                        "embedding dimensions {width} do not match document dimensions {existing}"
                    )));
                }
            }
        }

        self.conn
            .call(move |conn| -> Result<(), tokio_rusqlite::rusqlite::Error> {
                let tx = conn
                    .transaction()
                    ?;
                {
                    let mut stmt = tx
                        .prepare(
                            "INSERT INTO chunks \
                             (id, document_id, chunk_index, content, token_count, page_number, embedding) \
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        )
                        ?;
                    for chunk in &chunks {
                        stmt.execute((
                            chunk.id.as_str(),
                            chunk.document_id.as_str(),
                            chunk.chunk_index as i64,
                            chunk.content.as_str(),
                            chunk.token_count as i64,
                            chunk.page_number.map(i64::from),
                            embedding_to_blob(&chunk.embedding),
                        ))
                        ?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn count_chunks(&self, document_id: &str) -> Result<usize, RagError> {
        let document_id = document_id.to_string();
        self.conn
            .call(move |conn| -> Result<usize, tokio_rusqlite::rusqlite::Error> {
                let count: i64 = conn
                    .query_row(
                        "SELECT COUNT(*) FROM chunks WHERE document_id = ?",
                        [&document_id],
                        |row| row.get(0),
                    )
                    ?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<StoredChunk>, RagError> {
        let document_id = document_id.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<StoredChunk>, tokio_rusqlite::rusqlite::Error> {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, document_id, chunk_index, content, token_count, page_number, embedding \
                         FROM chunks WHERE document_id = ? ORDER BY chunk_index",
                    )
                    ?;
                let rows = stmt
                    .query_map([&document_id], |row| {
                        Ok(StoredChunk {
                            id: row.get(0)?,
                            document_id: row.get(1)?,
                            chunk_index: row.get::<_, i64>(2)? as usize,
                            content: row.get(3)?,
                            token_count: row.get::<_, i64>(4)? as usize,
                            page_number: row.get::<_, Option<i64>>(5)?.map(|p| p as u32),
                            embedding: blob_to_embedding(&row.get::<_, Vec<u8>>(6)?),
                        })
                    })
                    ?;

                let mut chunks = Vec::new();
                for row in rows {
                    chunks.push(row?);
                }
                Ok(chunks)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn delete_document(&self, document_id: &str) -> Result<usize, RagError> {
        let document_id = document_id.to_string();
        self.conn
            .call(move |conn| -> Result<usize, tokio_rusqlite::rusqlite::Error> {
                let deleted = conn
                    .execute("DELETE FROM chunks WHERE document_id = ?", [&document_id])
                    ?;
                Ok(deleted)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn search_similar(
        &self,
        document_id: &str,
        query: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<(StoredChunk, f32)>, RagError> {
        let document_id = document_id.to_string();
        let query_json = serde_json::to_string(query)
            .map_err(|err| RagError::Storage(err.to_string()))?;

        let scored: Vec<(StoredChunk, f32)> = self
            .conn
            .call(move |conn| -> Result<Vec<(StoredChunk, f32)>, tokio_rusqlite::rusqlite::Error> {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, document_id, chunk_index, content, token_count, page_number, embedding, \
                         vec_distance_cosine(embedding, vec_f32(?2)) AS distance \
                         FROM chunks WHERE document_id = ?1 \
                         ORDER BY distance ASC LIMIT ?3",
                    )
                    ?;

                let rows = stmt
                    .query_map((document_id, query_json, limit as i64), |row| {
                        let chunk = StoredChunk {
                            id: row.get(0)?,
                            document_id: row.get(1)?,
                            chunk_index: row.get::<_, i64>(2)? as usize,
                            content: row.get(3)?,
                            token_count: row.get::<_, i64>(4)? as usize,
                            page_number: row.get::<_, Option<i64>>(5)?.map(|p| p as u32),
                            embedding: blob_to_embedding(&row.get::<_, Vec<u8>>(6)?),
                        };
                        let distance: f64 = row.get(7)?;
                        Ok((chunk, 1.0 - distance as f32))
                    })
                    ?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row?);
                }
                Ok(results)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        Ok(scored
            .into_iter()
            .filter(|(_, similarity)| *similarity >= threshold)
            .collect())
    }
}
