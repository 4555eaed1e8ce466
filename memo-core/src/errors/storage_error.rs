/// Storage-layer errors for SQLite operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    Sqlite { message: String },

    #[error(
        "KNN extension failed to load: {reason}. Set `customSqlitePath` in the \
         config file to an extension-capable library; paths tried: {tried:?}"
    )]
    ExtensionLoad { reason: String, tried: Vec<String> },

    #[error("integrity violation on {what}: {message}")]
    IntegrityViolation { what: String, message: String },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("full-text query rejected: {message}")]
    FullTextQuery { message: String },
}
