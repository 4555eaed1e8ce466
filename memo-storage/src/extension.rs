//! sqlite-vec loading.
//!
//! The statically linked `sqlite-vec` build is registered process-wide via
//! `sqlite3_auto_extension` before the first connection opens, so every
//! connection gets the `vec0` module for free. When a system SQLite refuses
//! loadable extensions, a `customSqlitePath` from the config (or one of the
//! known install locations) is loaded dynamically instead. Either way the
//! module must answer `vec_version()` before the store proceeds.

use std::path::{Path, PathBuf};
use std::sync::Once;

use rusqlite::Connection;
use tracing::debug;

use memo_core::errors::StorageError;
use memo_core::{MemoError, MemoResult};

static REGISTER: Once = Once::new();

/// Known install locations probed when the static registration is
/// unavailable and no explicit path is configured.
const DISCOVERY_PATHS: &[&str] = &[
    "/opt/homebrew/lib/vec0.dylib",
    "/usr/local/lib/vec0.dylib",
    "/usr/local/lib/vec0.so",
    "/usr/lib/sqlite3/vec0.so",
];

/// Register the bundled sqlite-vec module for all future connections.
/// Idempotent; must run before the first `Connection::open`.
pub fn register_static() {
    REGISTER.call_once(|| unsafe {
        type AutoExtFn = unsafe extern "C" fn(
            *mut rusqlite::ffi::sqlite3,
            *mut *mut std::os::raw::c_char,
            *const rusqlite::ffi::sqlite3_api_routines,
        ) -> i32;
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute::<
            *const (),
            AutoExtFn,
        >(sqlite_vec::sqlite3_vec_init as *const ())));
    });
}

/// Make sure `vec0` is usable on this connection, falling back to dynamic
/// loading. Fails with a diagnostic naming the config key and every path
/// tried.
pub fn ensure_vec_loaded(conn: &Connection, custom_path: Option<&Path>) -> MemoResult<()> {
    if let Ok(version) = vec_version(conn) {
        debug!(%version, "sqlite-vec available (static registration)");
        return Ok(());
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(p) = custom_path {
        candidates.push(p.to_path_buf());
    }
    candidates.extend(DISCOVERY_PATHS.iter().map(PathBuf::from));

    let mut tried = Vec::with_capacity(candidates.len());
    for path in &candidates {
        tried.push(path.display().to_string());
        if !path.exists() {
            continue;
        }
        let loaded = unsafe {
            rusqlite::LoadExtensionGuard::new(conn)
                .and_then(|_guard| conn.load_extension(path, Some("sqlite3_vec_init")))
        };
        match loaded {
            Ok(()) => {
                if let Ok(version) = vec_version(conn) {
                    debug!(path = %path.display(), %version, "sqlite-vec loaded dynamically");
                    return Ok(());
                }
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "extension load failed");
            }
        }
    }

    Err(MemoError::Storage(StorageError::ExtensionLoad {
        reason: "no usable vec0 module (static registration inactive and no \
                 loadable library found)"
            .to_string(),
        tried,
    }))
}

fn vec_version(conn: &Connection) -> rusqlite::Result<String> {
    conn.query_row("SELECT vec_version()", [], |row| row.get(0))
}
