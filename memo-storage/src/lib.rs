//! # memo-storage
//!
//! The three-table synchronised store: `memories` (rows), `vec_memories`
//! (exact-KNN cosine index, sqlite-vec), `fts_memories` (FTS5/BM25), plus
//! the persistent `embedding_cache`. Every write keeps the three live
//! tables in lockstep inside one transaction.

pub mod connection;
pub mod engine;
pub mod extension;
pub mod pragmas;
pub mod queries;
pub mod schema;
pub mod vector;

pub use engine::{ReplaceOutcome, ReindexOutcome, StoreEngine};

use memo_core::errors::StorageError;
use memo_core::MemoError;

/// Map an arbitrary SQLite failure message into the storage error kind.
pub(crate) fn to_storage_err(message: impl Into<String>) -> MemoError {
    MemoError::Storage(StorageError::Sqlite {
        message: message.into(),
    })
}

/// Map an insert failure, surfacing constraint violations loudly: they
/// indicate an invariant breach (or a same-millisecond id collision, which
/// the engine retries).
pub(crate) fn map_write_err(what: &str, e: rusqlite::Error) -> MemoError {
    if let rusqlite::Error::SqliteFailure(code, ref msg) = e {
        if code.code == rusqlite::ErrorCode::ConstraintViolation {
            return MemoError::Storage(StorageError::IntegrityViolation {
                what: what.to_string(),
                message: msg.clone().unwrap_or_default(),
            });
        }
    }
    to_storage_err(e.to_string())
}
