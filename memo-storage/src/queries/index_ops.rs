//! Queries against the two virtual-table indexes: exact-KNN candidates,
//! BM25 candidates, and full-text repair.

use rusqlite::{params, Connection};

use memo_core::errors::StorageError;
use memo_core::{MemoError, MemoResult};

use crate::vector::f32s_to_bytes;
use crate::to_storage_err;

/// Nearest neighbours by cosine distance. Returns `(memory_id, distance)`
/// ordered nearest first; the virtual table always fills k when it can,
/// regardless of true proximity — callers gate on similarity.
pub fn knn_candidates(
    conn: &Connection,
    vector: &[f32],
    k: usize,
) -> MemoResult<Vec<(String, f64)>> {
    let mut stmt = conn
        .prepare(
            "SELECT memory_id, distance FROM vec_memories
             WHERE embedding MATCH ?1 AND k = ?2",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![f32s_to_bytes(vector), k as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::with_capacity(k);
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(out)
}

/// BM25-ranked full-text candidates, most relevant first. The raw query
/// goes straight to MATCH; a grammar rejection surfaces as
/// `StorageError::FullTextQuery` so search can fall back to vector-only.
pub fn fts_candidates(
    conn: &Connection,
    query: &str,
    container_tag: Option<&str>,
    limit: usize,
) -> MemoResult<Vec<String>> {
    let (sql, scoped) = match container_tag {
        Some(_) => (
            "SELECT memory_id FROM fts_memories
             WHERE fts_memories MATCH ?1 AND container_tag = ?2
             ORDER BY rank LIMIT ?3",
            true,
        ),
        None => (
            "SELECT memory_id FROM fts_memories
             WHERE fts_memories MATCH ?1
             ORDER BY rank LIMIT ?2",
            false,
        ),
    };

    let result = (|| -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(sql)?;
        let rows: Vec<String> = if scoped {
            stmt.query_map(
                params![query, container_tag.unwrap(), limit as i64],
                |row| row.get(0),
            )?
            .collect::<rusqlite::Result<Vec<String>>>()?
        } else {
            stmt.query_map(params![query, limit as i64], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?
        };
        Ok(rows)
    })();

    result.map_err(|e| {
        MemoError::Storage(StorageError::FullTextQuery {
            message: e.to_string(),
        })
    })
}

/// Idempotent full-text repair: drop orphaned FTS rows, add missing ones.
/// Returns `(added, removed)`.
pub fn reindex_fulltext(conn: &Connection) -> MemoResult<(usize, usize)> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("reindex begin: {e}")))?;

    let removed = tx
        .execute(
            "DELETE FROM fts_memories
             WHERE memory_id NOT IN (SELECT id FROM memories)",
            [],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let added = tx
        .execute(
            "INSERT INTO fts_memories (content, memory_id, container_tag)
             SELECT m.content, m.id, m.container_tag FROM memories m
             WHERE m.id NOT IN (SELECT memory_id FROM fts_memories)",
            [],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    tx.commit()
        .map_err(|e| to_storage_err(format!("reindex commit: {e}")))?;
    Ok((added, removed))
}
