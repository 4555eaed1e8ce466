/// Embedding-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("failed to load model from {path}: {reason}")]
    ModelLoadFailed { path: String, reason: String },

    #[error("inference failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("embedding timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("model produces {actual} dimensions, store configured for {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}
