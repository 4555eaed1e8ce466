//! Persistent embedding-cache rows, keyed `(content_hash, model_id)`.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use memo_core::MemoResult;

use crate::vector::{bytes_to_f32s, f32s_to_bytes};
use crate::to_storage_err;

/// Look up a cached embedding.
pub fn get_cached_embedding(
    conn: &Connection,
    content_hash: &str,
    model_id: &str,
) -> MemoResult<Option<Vec<f32>>> {
    let blob: Option<Vec<u8>> = conn
        .query_row(
            "SELECT embedding FROM embedding_cache
             WHERE content_hash = ?1 AND model_id = ?2",
            params![content_hash, model_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(blob.map(|b| bytes_to_f32s(&b)))
}

/// Store an embedding, replacing any previous row for the same key.
pub fn put_cached_embedding(
    conn: &Connection,
    content_hash: &str,
    model_id: &str,
    vector: &[f32],
) -> MemoResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO embedding_cache
         (content_hash, model_id, embedding, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            content_hash,
            model_id,
            f32s_to_bytes(vector),
            Utc::now().timestamp_millis()
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Number of cached embeddings (status reporting).
pub fn cache_len(conn: &Connection) -> MemoResult<usize> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM embedding_cache", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(n as usize)
}
