//! The single guarded write connection.
//!
//! The store is single-process/single-writer; one mutex-guarded connection
//! serves every operation. Cross-process readers coexist under WAL, and a
//! competing writer waits out the 5s busy timeout.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use memo_core::{MemoConfig, MemoResult};

use crate::{extension, pragmas, to_storage_err};

/// Mutex-guarded SQLite connection handed out to closures.
#[derive(Debug)]
pub struct StoreConnection {
    conn: Mutex<Connection>,
}

impl StoreConnection {
    /// Open (and create) the database file, with vec0 available and all
    /// pragmas applied.
    pub fn open(path: &Path, config: &MemoConfig) -> MemoResult<Self> {
        extension::register_static();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| to_storage_err(e.to_string()))?;
        extension::ensure_vec_loaded(&conn, config.custom_sqlite_path.as_deref())?;
        pragmas::apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory connection (tests).
    pub fn open_in_memory(config: &MemoConfig) -> MemoResult<Self> {
        extension::register_static();
        let conn = Connection::open_in_memory().map_err(|e| to_storage_err(e.to_string()))?;
        extension::ensure_vec_loaded(&conn, config.custom_sqlite_path.as_deref())?;
        pragmas::apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run a closure against the connection.
    pub fn with_conn<F, T>(&self, f: F) -> MemoResult<T>
    where
        F: FnOnce(&Connection) -> MemoResult<T>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| to_storage_err(format!("connection lock poisoned: {e}")))?;
        f(&guard)
    }
}
