//! Reciprocal Rank Fusion: score = Σ 1/(k + rank_i)
//!
//! Combines the vector and full-text ranked lists without needing their
//! scores to be comparable.

use std::collections::HashMap;

/// A candidate after fusion, with per-list rank provenance.
#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub id: String,
    /// Fused RRF score (higher = more relevant).
    pub rrf_score: f64,
    /// 0-based rank in the gated vector list (None if absent).
    pub vector_rank: Option<usize>,
    /// 0-based BM25 rank from the full-text list (None if absent).
    pub fts_rank: Option<usize>,
}

/// Fuse the two ranked id lists. `k` is the smoothing constant; higher k
/// flattens the head of each list.
pub fn fuse(
    vector_list: &[(String, usize)],
    fts_list: &[(String, usize)],
    k: u32,
) -> Vec<FusedCandidate> {
    let mut scores: HashMap<String, f64> = HashMap::new();
    let mut vector_ranks: HashMap<String, usize> = HashMap::new();
    let mut fts_ranks: HashMap<String, usize> = HashMap::new();

    for (id, rank) in vector_list {
        *scores.entry(id.clone()).or_default() += 1.0 / (k as f64 + *rank as f64);
        vector_ranks.insert(id.clone(), *rank);
    }
    for (id, rank) in fts_list {
        *scores.entry(id.clone()).or_default() += 1.0 / (k as f64 + *rank as f64);
        fts_ranks.insert(id.clone(), *rank);
    }

    let mut candidates: Vec<FusedCandidate> = scores
        .into_iter()
        .map(|(id, rrf_score)| FusedCandidate {
            vector_rank: vector_ranks.get(&id).copied(),
            fts_rank: fts_ranks.get(&id).copied(),
            id,
            rrf_score,
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.rrf_score
            .partial_cmp(&a.rrf_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(ids: &[&str]) -> Vec<(String, usize)> {
        ids.iter()
            .enumerate()
            .map(|(rank, id)| (id.to_string(), rank))
            .collect()
    }

    #[test]
    fn id_in_both_lists_sums_contributions() {
        let fused = fuse(&ranked(&["a", "b"]), &ranked(&["a", "c"]), 60);
        let a = fused.iter().find(|c| c.id == "a").unwrap();
        assert!((a.rrf_score - 2.0 / 60.0).abs() < 1e-12);
        assert_eq!(a.vector_rank, Some(0));
        assert_eq!(a.fts_rank, Some(0));
    }

    #[test]
    fn single_list_id_keeps_one_term() {
        let fused = fuse(&ranked(&["a", "b"]), &[], 60);
        let b = fused.iter().find(|c| c.id == "b").unwrap();
        assert!((b.rrf_score - 1.0 / 61.0).abs() < 1e-12);
        assert_eq!(b.fts_rank, None);
    }

    #[test]
    fn sorted_by_score_descending() {
        let fused = fuse(&ranked(&["a", "b", "c"]), &ranked(&["c"]), 60);
        assert_eq!(fused[0].id, "c", "two-list id outranks rank-0 single");
        assert!(fused.windows(2).all(|w| w[0].rrf_score >= w[1].rrf_score));
    }

    #[test]
    fn empty_lists_fuse_to_nothing() {
        assert!(fuse(&[], &[], 60).is_empty());
    }
}
