//! # memo-search
//!
//! Hybrid retrieval over the store: KNN candidates gated on cosine
//! similarity, BM25 candidates from the full-text index, Reciprocal Rank
//! Fusion, case-dependent score normalisation, then threshold and limit.
//! Also hosts the deduplication protocol, which reuses the KNN arm.

pub mod dedup;
pub mod hybrid;
pub mod rrf;

pub use dedup::{DedupVerdict, Deduper};
pub use hybrid::{find_near_duplicates, HybridSearcher, SearchRequest, SearchResult};
