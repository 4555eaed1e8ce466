//! Schema creation and dimension pinning.

use rusqlite::{params, Connection, OptionalExtension};

use memo_core::errors::StorageError;
use memo_core::{MemoError, MemoResult};

use crate::to_storage_err;

/// Create all tables and indexes. The vector width D is fixed at first
/// initialisation; reopening with a different configured width fails.
pub fn init_schema(conn: &Connection, dimensions: usize, model_id: &str) -> MemoResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS memories (
            id            TEXT PRIMARY KEY,
            content       TEXT NOT NULL,
            container_tag TEXT NOT NULL,
            source_key    TEXT,
            record_type   TEXT,
            metadata      TEXT,
            created_at    INTEGER NOT NULL,
            updated_at    INTEGER NOT NULL,
            display_name  TEXT,
            user_name     TEXT,
            user_email    TEXT,
            project_path  TEXT,
            project_name  TEXT,
            git_repo_url  TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_memories_container
            ON memories(container_tag);
        CREATE INDEX IF NOT EXISTS idx_memories_created
            ON memories(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_memories_source
            ON memories(container_tag, source_key);

        CREATE VIRTUAL TABLE IF NOT EXISTS fts_memories USING fts5(
            content,
            memory_id UNINDEXED,
            container_tag UNINDEXED,
            tokenize = 'unicode61 remove_diacritics 2'
        );

        CREATE TABLE IF NOT EXISTS embedding_cache (
            content_hash TEXT NOT NULL,
            model_id     TEXT NOT NULL,
            embedding    BLOB NOT NULL,
            created_at   INTEGER NOT NULL,
            PRIMARY KEY (content_hash, model_id)
        );

        CREATE TABLE IF NOT EXISTS meta (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    pin_dimensions(conn, dimensions)?;

    conn.execute(
        "INSERT INTO meta(key, value) VALUES('embedding_model', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![model_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    Ok(())
}

/// Create the vec0 table on first init and record its width; reject a
/// mismatched width on any later open.
fn pin_dimensions(conn: &Connection, dimensions: usize) -> MemoResult<()> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'vec_dimensions'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    match stored {
        Some(raw) => {
            let stored_dims: usize = raw.parse().unwrap_or(0);
            if stored_dims != dimensions {
                return Err(MemoError::Storage(StorageError::DimensionMismatch {
                    expected: stored_dims,
                    actual: dimensions,
                }));
            }
        }
        None => {
            conn.execute_batch(&format!(
                "CREATE VIRTUAL TABLE IF NOT EXISTS vec_memories USING vec0(
                    memory_id TEXT PRIMARY KEY,
                    embedding float[{dimensions}] distance_metric=cosine
                );"
            ))
            .map_err(|e| to_storage_err(e.to_string()))?;
            conn.execute(
                "INSERT INTO meta(key, value) VALUES('vec_dimensions', ?1)",
                params![dimensions.to_string()],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        }
    }
    Ok(())
}
