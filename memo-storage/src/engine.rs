//! StoreEngine — owns the connection, runs the schema, exposes the typed
//! operations, and handles teardown (WAL checkpoint) and reset.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use memo_core::errors::StorageError;
use memo_core::{MemoConfig, MemoError, MemoResult, MemoryRecord};

use crate::connection::StoreConnection;
use crate::queries::{cache_ops, index_ops, record_ops};
use crate::{schema, to_storage_err};

/// Result of a replace-by-source call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub deleted: usize,
    pub inserted: usize,
}

/// Result of a full-text reindex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReindexOutcome {
    pub added: usize,
    pub removed: usize,
}

/// The main storage engine. One per process in normal operation.
#[derive(Debug)]
pub struct StoreEngine {
    conn: StoreConnection,
    path: Option<PathBuf>,
    dimensions: usize,
}

impl StoreEngine {
    /// Open (creating if needed) the store at the given path.
    pub fn open(path: &Path, config: &MemoConfig) -> MemoResult<Self> {
        let conn = StoreConnection::open(path, config)?;
        let engine = Self {
            conn,
            path: Some(path.to_path_buf()),
            dimensions: config.embedding_dimensions,
        };
        engine.initialize(config)?;
        debug!(path = %path.display(), dims = engine.dimensions, "store opened");
        Ok(engine)
    }

    /// In-memory store (tests).
    pub fn open_in_memory(config: &MemoConfig) -> MemoResult<Self> {
        let conn = StoreConnection::open_in_memory(config)?;
        let engine = Self {
            conn,
            path: None,
            dimensions: config.embedding_dimensions,
        };
        engine.initialize(config)?;
        Ok(engine)
    }

    fn initialize(&self, config: &MemoConfig) -> MemoResult<()> {
        self.conn.with_conn(|conn| {
            schema::init_schema(conn, config.embedding_dimensions, &config.embedding_model)
        })
    }

    /// Configured vector width.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Backing file, if file-backed.
    pub fn db_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert one record into the three live tables. The record's id may be
    /// regenerated on a nonce collision; the final id is returned.
    pub fn insert(&self, mut record: MemoryRecord) -> MemoResult<String> {
        if record.vector.len() != self.dimensions {
            return Err(MemoError::Storage(StorageError::DimensionMismatch {
                expected: self.dimensions,
                actual: record.vector.len(),
            }));
        }
        self.conn
            .with_conn(|conn| record_ops::insert_record(conn, &mut record))?;
        Ok(record.id)
    }

    /// Delete by id. Returns whether the record existed.
    pub fn delete(&self, id: &str) -> MemoResult<bool> {
        self.conn.with_conn(|conn| record_ops::delete_record(conn, id))
    }

    /// Transactional full-snapshot replacement for one source key.
    pub fn replace_by_source(
        &self,
        container_tag: &str,
        source_key: &str,
        mut records: Vec<MemoryRecord>,
    ) -> MemoResult<ReplaceOutcome> {
        for record in &records {
            if record.vector.len() != self.dimensions {
                return Err(MemoError::Storage(StorageError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: record.vector.len(),
                }));
            }
        }
        let (deleted, inserted) = self.conn.with_conn(|conn| {
            record_ops::replace_by_source(conn, container_tag, source_key, &mut records)
        })?;
        info!(container = container_tag, source = source_key, deleted, inserted,
              "source replaced");
        Ok(ReplaceOutcome { deleted, inserted })
    }

    /// Recent records, newest first. `limit < 0` means unlimited.
    pub fn list(
        &self,
        container_tag: Option<&str>,
        limit: i64,
    ) -> MemoResult<Vec<MemoryRecord>> {
        self.conn
            .with_conn(|conn| record_ops::list_records(conn, container_tag, limit))
    }

    pub fn count(&self, container_tag: Option<&str>) -> MemoResult<usize> {
        self.conn.with_conn(|conn| record_ops::count(conn, container_tag))
    }

    pub fn count_by_container(&self) -> MemoResult<Vec<(String, usize)>> {
        self.conn.with_conn(record_ops::count_by_container)
    }

    pub fn count_by_source(&self, container_tag: &str, source_key: &str) -> MemoResult<usize> {
        self.conn
            .with_conn(|conn| record_ops::count_by_source(conn, container_tag, source_key))
    }

    /// Exact-content duplicate lookup within a container.
    pub fn find_exact_duplicate(
        &self,
        content: &str,
        container_tag: &str,
    ) -> MemoResult<Option<String>> {
        self.conn
            .with_conn(|conn| record_ops::find_exact_duplicate(conn, content, container_tag))
    }

    /// Resolve a record's container tag.
    pub fn get_container_tag(&self, id: &str) -> MemoResult<Option<String>> {
        self.conn.with_conn(|conn| record_ops::get_container_tag(conn, id))
    }

    pub fn get_record(&self, id: &str) -> MemoResult<Option<MemoryRecord>> {
        self.conn.with_conn(|conn| record_ops::get_record(conn, id))
    }

    /// Fetch records by id, preserving order, optionally container-scoped.
    pub fn fetch_by_ids(
        &self,
        ids: &[String],
        container_tag: Option<&str>,
    ) -> MemoResult<Vec<MemoryRecord>> {
        self.conn
            .with_conn(|conn| record_ops::fetch_by_ids(conn, ids, container_tag))
    }

    /// Exact-KNN candidates as `(memory_id, cosine_distance)`.
    pub fn knn_candidates(&self, vector: &[f32], k: usize) -> MemoResult<Vec<(String, f64)>> {
        self.conn
            .with_conn(|conn| index_ops::knn_candidates(conn, vector, k))
    }

    /// BM25 candidates, most relevant first. Grammar rejections surface as
    /// `StorageError::FullTextQuery`.
    pub fn fts_candidates(
        &self,
        query: &str,
        container_tag: Option<&str>,
        limit: usize,
    ) -> MemoResult<Vec<String>> {
        self.conn
            .with_conn(|conn| index_ops::fts_candidates(conn, query, container_tag, limit))
    }

    /// Idempotent full-text repair.
    pub fn reindex_fulltext(&self) -> MemoResult<ReindexOutcome> {
        let (added, removed) = self.conn.with_conn(index_ops::reindex_fulltext)?;
        info!(added, removed, "full-text index repaired");
        Ok(ReindexOutcome { added, removed })
    }

    pub fn get_cached_embedding(
        &self,
        content_hash: &str,
        model_id: &str,
    ) -> MemoResult<Option<Vec<f32>>> {
        self.conn
            .with_conn(|conn| cache_ops::get_cached_embedding(conn, content_hash, model_id))
    }

    pub fn put_cached_embedding(
        &self,
        content_hash: &str,
        model_id: &str,
        vector: &[f32],
    ) -> MemoResult<()> {
        self.conn.with_conn(|conn| {
            cache_ops::put_cached_embedding(conn, content_hash, model_id, vector)
        })
    }

    pub fn embedding_cache_len(&self) -> MemoResult<usize> {
        self.conn.with_conn(cache_ops::cache_len)
    }

    /// Checkpoint the WAL into the main file and truncate it. Called at
    /// process exit; harmless to call more than once.
    pub fn close(&self) -> MemoResult<()> {
        self.conn.with_conn(|conn| {
            conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
                .map_err(|e| to_storage_err(e.to_string()))?;
            Ok(())
        })
    }

    /// Drop the store entirely: close and remove the database file (with
    /// its WAL sidecars). The next open re-initialises from scratch.
    pub fn reset(self) -> MemoResult<()> {
        let _ = self.close();
        if let Some(path) = self.path.clone() {
            drop(self.conn);
            Self::reset_path(&path)?;
        }
        Ok(())
    }

    /// Remove a store's files without opening it. Works even when the file
    /// can no longer be opened (e.g. after a configured-dimension change).
    pub fn reset_path(path: &Path) -> MemoResult<()> {
        for suffix in ["", "-wal", "-shm"] {
            let mut p = path.to_path_buf().into_os_string();
            p.push(suffix);
            let p = PathBuf::from(p);
            if p.exists() {
                std::fs::remove_file(&p)?;
            }
        }
        info!(path = %path.display(), "store reset");
        Ok(())
    }
}
