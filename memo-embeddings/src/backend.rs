use memo_core::MemoResult;

/// A text → vector inference backend. Implementations return vectors that
/// are already L2-normalised.
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a single (already prefixed) text.
    fn embed(&self, text: &str) -> MemoResult<Vec<f32>>;

    /// The dimensionality of vectors produced by this backend.
    fn dimensions(&self) -> usize;

    /// Model identifier; part of the L2 cache key.
    fn model_id(&self) -> &str;

    /// Whether this backend is currently usable.
    fn is_available(&self) -> bool;
}
