//! Insert, delete, replace-by-source, list, and count operations.
//!
//! Every write touches the three live tables inside one transaction so
//! invariant "one row in each index per record" cannot be observed broken.

use rusqlite::{params, Connection, OptionalExtension};

use memo_core::constants::ID_RETRY_ATTEMPTS;
use memo_core::errors::StorageError;
use memo_core::{MemoError, MemoResult, MemoryRecord};

use crate::vector::f32s_to_bytes;
use crate::{map_write_err, to_storage_err};

/// Insert a single record, all three tables, one transaction.
/// Same-millisecond id collisions are retried with a fresh nonce.
pub fn insert_record(conn: &Connection, record: &mut MemoryRecord) -> MemoResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("insert begin: {e}")))?;
    match insert_with_retry(&tx, record) {
        Ok(()) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("insert commit: {e}")))?;
            Ok(())
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

/// Insert inside an open transaction, regenerating the id on a primary-key
/// collision.
pub(crate) fn insert_with_retry(conn: &Connection, record: &mut MemoryRecord) -> MemoResult<()> {
    let mut attempt = 0;
    loop {
        match insert_inner(conn, record) {
            Ok(()) => return Ok(()),
            Err(MemoError::Storage(StorageError::IntegrityViolation { ref what, .. }))
                if what == "memories.id" && attempt < ID_RETRY_ATTEMPTS =>
            {
                attempt += 1;
                tracing::warn!(id = %record.id, attempt, "record id collision, regenerating");
                record.regenerate_id();
            }
            Err(e) => return Err(e),
        }
    }
}

/// The three writes. The `memories` insert goes first so an id collision
/// fails before either index is touched.
fn insert_inner(conn: &Connection, record: &MemoryRecord) -> MemoResult<()> {
    conn.execute(
        "INSERT INTO memories (
            id, content, container_tag, source_key, record_type, metadata,
            created_at, updated_at, display_name, user_name, user_email,
            project_path, project_name, git_repo_url
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            record.id,
            record.content,
            record.container_tag.as_tag(),
            record.source_key,
            record.record_type,
            record.metadata,
            record.created_at,
            record.updated_at,
            record.display_name,
            record.user_name,
            record.user_email,
            record.project_path,
            record.project_name,
            record.git_repo_url,
        ],
    )
    .map_err(|e| map_write_err("memories.id", e))?;

    conn.execute(
        "INSERT INTO vec_memories (memory_id, embedding) VALUES (?1, ?2)",
        params![record.id, f32s_to_bytes(&record.vector)],
    )
    .map_err(|e| map_write_err("vec_memories.memory_id", e))?;

    conn.execute(
        "INSERT INTO fts_memories (content, memory_id, container_tag) VALUES (?1, ?2, ?3)",
        params![record.content, record.id, record.container_tag.as_tag()],
    )
    .map_err(|e| map_write_err("fts_memories.memory_id", e))?;

    Ok(())
}

/// Delete from all three tables. Returns whether the record existed.
pub fn delete_record(conn: &Connection, id: &str) -> MemoResult<bool> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("delete begin: {e}")))?;
    let existed = delete_inner(&tx, id)?;
    tx.commit()
        .map_err(|e| to_storage_err(format!("delete commit: {e}")))?;
    Ok(existed)
}

fn delete_inner(conn: &Connection, id: &str) -> MemoResult<bool> {
    conn.execute("DELETE FROM vec_memories WHERE memory_id = ?1", params![id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute("DELETE FROM fts_memories WHERE memory_id = ?1", params![id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    let n = conn
        .execute("DELETE FROM memories WHERE id = ?1", params![id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(n > 0)
}

/// Transactional full-snapshot replacement for one `(container, source_key)`:
/// delete every matching record, insert the new set. Returns
/// `(deleted, inserted)`.
pub fn replace_by_source(
    conn: &Connection,
    container_tag: &str,
    source_key: &str,
    records: &mut [MemoryRecord],
) -> MemoResult<(usize, usize)> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("replace begin: {e}")))?;

    let result = (|| -> MemoResult<(usize, usize)> {
        for table in ["vec_memories", "fts_memories"] {
            tx.execute(
                &format!(
                    "DELETE FROM {table} WHERE memory_id IN
                     (SELECT id FROM memories WHERE container_tag = ?1 AND source_key = ?2)"
                ),
                params![container_tag, source_key],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        }
        let deleted = tx
            .execute(
                "DELETE FROM memories WHERE container_tag = ?1 AND source_key = ?2",
                params![container_tag, source_key],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;

        for record in records.iter_mut() {
            insert_with_retry(&tx, record)?;
        }
        Ok((deleted, records.len()))
    })();

    match result {
        Ok(outcome) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("replace commit: {e}")))?;
            Ok(outcome)
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

/// Records ordered by creation time descending. `limit < 0` means
/// unlimited (SQLite treats a negative LIMIT as none).
pub fn list_records(
    conn: &Connection,
    container_tag: Option<&str>,
    limit: i64,
) -> MemoResult<Vec<MemoryRecord>> {
    let (sql, scoped) = match container_tag {
        Some(_) => (
            format!("{SELECT_COLS} FROM memories WHERE container_tag = ?1 ORDER BY created_at DESC LIMIT ?2"),
            true,
        ),
        None => (
            format!("{SELECT_COLS} FROM memories ORDER BY created_at DESC LIMIT ?1"),
            false,
        ),
    };
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = if scoped {
        stmt.query_map(params![container_tag.unwrap(), limit], row_to_record)
    } else {
        stmt.query_map(params![limit], row_to_record)
    }
    .map_err(|e| to_storage_err(e.to_string()))?;

    collect_records(rows)
}

/// Count records, optionally scoped.
pub fn count(conn: &Connection, container_tag: Option<&str>) -> MemoResult<usize> {
    let n: i64 = match container_tag {
        Some(tag) => conn.query_row(
            "SELECT COUNT(*) FROM memories WHERE container_tag = ?1",
            params![tag],
            |row| row.get(0),
        ),
        None => conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0)),
    }
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(n as usize)
}

/// Per-container inventory, largest first.
pub fn count_by_container(conn: &Connection) -> MemoResult<Vec<(String, usize)>> {
    let mut stmt = conn
        .prepare(
            "SELECT container_tag, COUNT(*) FROM memories
             GROUP BY container_tag ORDER BY COUNT(*) DESC",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Count records derived from one import source.
pub fn count_by_source(
    conn: &Connection,
    container_tag: &str,
    source_key: &str,
) -> MemoResult<usize> {
    let n: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM memories WHERE container_tag = ?1 AND source_key = ?2",
            params![container_tag, source_key],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(n as usize)
}

/// Exact-content lookup within a container.
pub fn find_exact_duplicate(
    conn: &Connection,
    content: &str,
    container_tag: &str,
) -> MemoResult<Option<String>> {
    conn.query_row(
        "SELECT id FROM memories WHERE container_tag = ?1 AND content = ?2 LIMIT 1",
        params![container_tag, content],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Resolve a record's container (for the `forget` cross-check).
pub fn get_container_tag(conn: &Connection, id: &str) -> MemoResult<Option<String>> {
    conn.query_row(
        "SELECT container_tag FROM memories WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Fetch one record.
pub fn get_record(conn: &Connection, id: &str) -> MemoResult<Option<MemoryRecord>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_COLS} FROM memories WHERE id = ?1"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    stmt.query_row(params![id], row_to_record)
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Fetch records by id, preserving input order, optionally restricted to a
/// container. Ids that miss (or fall outside the container) are dropped.
pub fn fetch_by_ids(
    conn: &Connection,
    ids: &[String],
    container_tag: Option<&str>,
) -> MemoResult<Vec<MemoryRecord>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_COLS} FROM memories WHERE id = ?1"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        let record = stmt
            .query_row(params![id], row_to_record)
            .optional()
            .map_err(|e| to_storage_err(e.to_string()))?;
        if let Some(record) = record {
            if container_tag.map_or(true, |tag| record.container_tag.as_tag() == tag) {
                out.push(record);
            }
        }
    }
    Ok(out)
}

const SELECT_COLS: &str = "SELECT id, content, container_tag, source_key, record_type, metadata,
    created_at, updated_at, display_name, user_name, user_email,
    project_path, project_name, git_repo_url";

/// Parse a `memories` row. The embedding stays in the vector index and is
/// not rehydrated; `vector` comes back empty.
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryRecord> {
    let tag_raw: String = row.get(2)?;
    let container_tag = tag_raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("{e}").into(),
        )
    })?;
    Ok(MemoryRecord {
        id: row.get(0)?,
        content: row.get(1)?,
        vector: Vec::new(),
        container_tag,
        source_key: row.get(3)?,
        record_type: row.get(4)?,
        metadata: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        display_name: row.get(8)?,
        user_name: row.get(9)?,
        user_email: row.get(10)?,
        project_path: row.get(11)?,
        project_name: row.get(12)?,
        git_repo_url: row.get(13)?,
    })
}

fn collect_records(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<MemoryRecord>>,
) -> MemoResult<Vec<MemoryRecord>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(out)
}
