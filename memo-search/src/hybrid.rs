//! The six-stage hybrid pipeline.
//!
//! 1. KNN candidates (K = 4·limit), distances converted to cosine
//!    similarity and gated on `minVectorSimilarity` — the virtual table
//!    always fills K, the gate keeps unrelated vectors out of fusion.
//! 2. BM25 candidates (limit 4·limit); a full-text grammar rejection logs
//!    and falls back to vector-only.
//! 3. RRF with k = 60.
//! 4. Fetch rows, container-scoped when requested; missing ids drop.
//! 5. Per-record normalisation: both lists → RRF/(2/k) capped at 1;
//!    BM25-only → RRF/(1/k) capped at 1; vector-only → the raw cosine
//!    similarity. Normalising a single-list RRF against 1/k would collapse
//!    vector-only scores to a ~0.5 floor, so the raw similarity is kept.
//! 6. Sort descending, apply the threshold, truncate to the limit.

use std::collections::HashMap;

use tracing::warn;

use memo_core::constants::{DEDUP_KNN_K, KNN_CANDIDATE_MULTIPLIER, RRF_K};
use memo_core::errors::StorageError;
use memo_core::{MemoError, MemoResult};
use memo_storage::StoreEngine;

use crate::rrf;

/// One hybrid search invocation.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest<'a> {
    /// Unit-length query vector (embedded with the symmetric prefix), or
    /// None to skip the vector arm.
    pub query_vector: Option<&'a [f32]>,
    /// Raw query text for BM25, or None to skip the full-text arm.
    pub query_text: Option<&'a str>,
    /// Restrict results to one container; None searches unscoped.
    pub container_tag: Option<&'a str>,
    pub limit: usize,
    pub threshold: f64,
}

/// One search hit.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub similarity: f64,
    pub created_at: i64,
    pub record_type: Option<String>,
    pub metadata: Option<String>,
}

/// Hybrid searcher over a store handle.
pub struct HybridSearcher<'a> {
    store: &'a StoreEngine,
    min_vector_similarity: f64,
}

impl<'a> HybridSearcher<'a> {
    pub fn new(store: &'a StoreEngine, min_vector_similarity: f64) -> Self {
        Self {
            store,
            min_vector_similarity,
        }
    }

    /// Run the pipeline. At least one of vector/text must be present.
    pub fn search(&self, request: &SearchRequest<'_>) -> MemoResult<Vec<SearchResult>> {
        if request.query_vector.is_none() && request.query_text.is_none() {
            return Err(MemoError::InvalidInput(
                "search needs at least one of vector and full-text".into(),
            ));
        }
        let pool = KNN_CANDIDATE_MULTIPLIER * request.limit.max(1);

        // Stage 1 — gated KNN.
        let mut vector_sims: HashMap<String, f64> = HashMap::new();
        let mut vector_list: Vec<(String, usize)> = Vec::new();
        if let Some(query) = request.query_vector {
            for (id, distance) in self.store.knn_candidates(query, pool)? {
                let similarity = 1.0 - distance;
                if similarity < self.min_vector_similarity {
                    continue;
                }
                vector_list.push((id.clone(), vector_list.len()));
                vector_sims.insert(id, similarity);
            }
        }

        // Stage 2 — BM25, with the grammar-error fallback.
        let mut fts_list: Vec<(String, usize)> = Vec::new();
        if let Some(text) = request.query_text {
            match self
                .store
                .fts_candidates(text, request.container_tag, pool)
            {
                Ok(ids) => {
                    fts_list = ids.into_iter().enumerate().map(|(r, id)| (id, r)).collect();
                }
                Err(MemoError::Storage(StorageError::FullTextQuery { message })) => {
                    warn!(%message, "full-text query rejected; vector-only fallback");
                }
                Err(e) => return Err(e),
            }
        }

        // Stage 3 — fusion.
        let fused = rrf::fuse(&vector_list, &fts_list, RRF_K);
        if fused.is_empty() {
            return Ok(Vec::new());
        }

        // Stage 4 — fetch and scope-filter.
        let ids: Vec<String> = fused.iter().map(|c| c.id.clone()).collect();
        let records = self.store.fetch_by_ids(&ids, request.container_tag)?;
        let by_id: HashMap<&str, &rrf::FusedCandidate> =
            fused.iter().map(|c| (c.id.as_str(), c)).collect();

        // Stage 5 — per-record score normalisation.
        let k = RRF_K as f64;
        let mut results: Vec<SearchResult> = records
            .into_iter()
            .filter_map(|record| {
                let candidate = by_id.get(record.id.as_str())?;
                let similarity = match (candidate.vector_rank, candidate.fts_rank) {
                    (Some(_), Some(_)) => (candidate.rrf_score / (2.0 / k)).min(1.0),
                    (None, Some(_)) => (candidate.rrf_score / (1.0 / k)).min(1.0),
                    (Some(_), None) => *vector_sims.get(record.id.as_str())?,
                    (None, None) => return None,
                };
                Some(SearchResult {
                    id: record.id,
                    content: record.content,
                    similarity,
                    created_at: record.created_at,
                    record_type: record.record_type,
                    metadata: record.metadata,
                })
            })
            .collect();

        // Stage 6 — order and trim.
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.retain(|r| r.similarity >= request.threshold);
        results.truncate(request.limit);
        Ok(results)
    }

}

/// Restricted form used by dedup: stage 1 with k = 5 plus the container
/// filter (applied after the KNN — it ranks globally). A free function
/// because the pipeline's vector gate plays no part here; the only cutoff
/// is the caller's `threshold`.
pub fn find_near_duplicates(
    store: &StoreEngine,
    vector: &[f32],
    container_tag: &str,
    threshold: f64,
) -> MemoResult<Vec<(String, f64)>> {
    let mut out = Vec::new();
    for (id, distance) in store.knn_candidates(vector, DEDUP_KNN_K)? {
        let similarity = 1.0 - distance;
        if similarity < threshold {
            continue;
        }
        if store.get_container_tag(&id)?.as_deref() == Some(container_tag) {
            out.push((id, similarity));
        }
    }
    Ok(out)
}
