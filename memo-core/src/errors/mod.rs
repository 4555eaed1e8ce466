//! Error taxonomy. Domain enums per subsystem, aggregated into `MemoError`.
//!
//! Only `StorageError::FullTextQuery` is recovered locally (by search);
//! everything else surfaces to the top-level command handler.

mod embedding_error;
mod storage_error;

pub use embedding_error::EmbeddingError;
pub use storage_error::StorageError;

/// Result alias used across the workspace.
pub type MemoResult<T> = Result<T, MemoError>;

/// Top-level error for all memo operations.
#[derive(Debug, thiserror::Error)]
pub enum MemoError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("content is fully private; nothing to store")]
    FullyPrivate,

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("record {id} belongs to container {actual}, not {requested}")]
    WrongContainer {
        id: String,
        requested: String,
        actual: String,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MemoError {
    /// Process exit code for the CLI. Zero is never returned here.
    pub fn exit_code(&self) -> i32 {
        match self {
            MemoError::InvalidInput(_) | MemoError::FullyPrivate => 2,
            MemoError::NotFound { .. } => 3,
            MemoError::WrongContainer { .. } => 4,
            _ => 1,
        }
    }
}
