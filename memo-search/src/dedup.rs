//! Deduplication protocol for inserts.
//!
//! Tier 1: exact content match within the container. Tier 2: nearest
//! neighbours (k = 5) at or above the configured cosine threshold, in the
//! same container. Either tier blocks the insert.

use tracing::debug;

use memo_core::{MemoConfig, MemoResult};
use memo_storage::StoreEngine;

use crate::hybrid::find_near_duplicates;

/// Verdict on a candidate `(content, vector, container)` tuple.
#[derive(Debug, Clone, PartialEq)]
pub enum DedupVerdict {
    NotDuplicate,
    /// Byte-identical content already stored; similarity is reported as 1.0.
    ExactDuplicate { id: String },
    NearDuplicate { id: String, similarity: f64 },
}

impl DedupVerdict {
    pub fn is_duplicate(&self) -> bool {
        !matches!(self, DedupVerdict::NotDuplicate)
    }
}

/// Insert-time duplicate gate.
pub struct Deduper<'a> {
    store: &'a StoreEngine,
    enabled: bool,
    threshold: f64,
}

impl<'a> Deduper<'a> {
    pub fn new(store: &'a StoreEngine, config: &MemoConfig) -> Self {
        Self {
            store,
            enabled: config.deduplication_enabled,
            threshold: config.deduplication_similarity_threshold,
        }
    }

    /// Decide whether the candidate should be blocked.
    pub fn check(
        &self,
        content: &str,
        vector: &[f32],
        container_tag: &str,
    ) -> MemoResult<DedupVerdict> {
        if !self.enabled {
            return Ok(DedupVerdict::NotDuplicate);
        }

        if let Some(id) = self.store.find_exact_duplicate(content, container_tag)? {
            debug!(%id, "exact duplicate");
            return Ok(DedupVerdict::ExactDuplicate { id });
        }

        let near = find_near_duplicates(self.store, vector, container_tag, self.threshold)?;
        if let Some((id, similarity)) = near
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        {
            debug!(%id, similarity, "near duplicate");
            return Ok(DedupVerdict::NearDuplicate { id, similarity });
        }

        Ok(DedupVerdict::NotDuplicate)
    }
}
