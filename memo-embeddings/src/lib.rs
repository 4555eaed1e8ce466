//! # memo-embeddings
//!
//! Maps text to unit-length f32 vectors through a cached singleton model.
//! All text is prefixed with `clustering: ` before inference — symmetric
//! for stored content and queries, so identical text always produces an
//! identical vector. Lookups go L1 (in-process FIFO) → L2 (persistent
//! `embedding_cache` table) → inference under a 30s timeout.

pub mod backend;
pub mod engine;
pub mod hash;
pub mod l1;
pub mod onnx;

pub use backend::EmbeddingBackend;
pub use engine::{global, reset_global, EmbeddingEngine};
pub use hash::HashBackend;

use sha2::{Digest, Sha256};

use memo_core::constants::EMBEDDING_PREFIX;

/// Prefix a text for inference.
pub fn prefixed(text: &str) -> String {
    format!("{EMBEDDING_PREFIX}{text}")
}

/// SHA-256 hex of a prefixed text — the L2 cache key component.
pub fn content_hash(prefixed_text: &str) -> String {
    let digest = Sha256::digest(prefixed_text.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
