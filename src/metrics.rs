//! Ranking metrics: Recall@K, MRR, nDCG@K
//!
//! All functions are total and deterministic. `relevant` is the ground-truth
//! id set for a query, `ranked` is what the backend returned, best first.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Per-query quality metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryMetrics {
    pub recall_at_k: f64,
    pub mrr: f64,
    pub ndcg_at_k: f64,
}

/// Fraction of relevant ids found in the top `k` ranked ids
///
/// Duplicate ranked ids count once. No ground truth means no credit (0.0).
pub fn recall_at_k<S: AsRef<str>>(relevant: &[S], ranked: &[String], k: usize) -> f64 {
    let relevant: HashSet<&str> = relevant.iter().map(|r| r.as_ref()).collect();
    if relevant.is_empty() {
        return 0.0;
    }

    let top_k: HashSet<&str> = ranked.iter().take(k).map(|r| r.as_str()).collect();
    let found = top_k.intersection(&relevant).count();
    found as f64 / relevant.len() as f64
}

/// Reciprocal rank of the first relevant hit anywhere in `ranked` (1-indexed), or 0
pub fn mrr<S: AsRef<str>>(relevant: &[S], ranked: &[String]) -> f64 {
    let relevant: HashSet<&str> = relevant.iter().map(|r| r.as_ref()).collect();
    ranked
        .iter()
        .position(|doc_id| relevant.contains(doc_id.as_str()))
        .map(|pos| 1.0 / (pos + 1) as f64)
        .unwrap_or(0.0)
}

/// Binary-relevance nDCG over the top `k` ranked ids
///
/// Gain at rank i (1-indexed) is `1/log2(i+1)`. The ideal DCG fills
/// `min(k, |relevant|)` positions.
pub fn ndcg_at_k<S: AsRef<str>>(relevant: &[S], ranked: &[String], k: usize) -> f64 {
    let relevant: HashSet<&str> = relevant.iter().map(|r| r.as_ref()).collect();
    if relevant.is_empty() {
        return 0.0;
    }

    let dcg: f64 = ranked
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, doc_id)| relevant.contains(doc_id.as_str()))
        .map(|(i, _)| discount(i + 1))
        .sum();

    let ideal_hits = k.min(relevant.len());
    let idcg: f64 = (1..=ideal_hits).map(discount).sum();

    if idcg == 0.0 {
        return 0.0;
    }
    dcg / idcg
}

fn discount(rank: usize) -> f64 {
    1.0 / ((rank + 1) as f64).log2()
}

/// Arithmetic mean; 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Compute all three metrics for one query
pub fn compute_query_metrics<S: AsRef<str>>(
    relevant: &[S],
    ranked: &[String],
    k: usize,
) -> QueryMetrics {
    QueryMetrics {
        recall_at_k: recall_at_k(relevant, ranked, k),
        mrr: mrr(relevant, ranked),
        ndcg_at_k: ndcg_at_k(relevant, ranked, k),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_perfect_ranking_top_two() {
        let qm = compute_query_metrics(&["d1", "d2"], &ids(&["d2", "d1", "d3"]), 2);
        assert_eq!(qm.recall_at_k, 1.0);
        assert_eq!(qm.mrr, 1.0);
        assert_relative_eq!(qm.ndcg_at_k, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_recall_empty_relevant_is_zero() {
        let empty: [&str; 0] = [];
        assert_eq!(recall_at_k(&empty, &ids(&["d1"]), 10), 0.0);
        assert_eq!(ndcg_at_k(&empty, &ids(&["d1"]), 10), 0.0);
    }

    #[test]
    fn test_recall_respects_cutoff() {
        let ranked = ids(&["x", "y", "d1", "d2"]);
        assert_eq!(recall_at_k(&["d1", "d2"], &ranked, 2), 0.0);
        assert_eq!(recall_at_k(&["d1", "d2"], &ranked, 3), 0.5);
        assert_eq!(recall_at_k(&["d1", "d2"], &ranked, 4), 1.0);
    }

    #[test]
    fn test_recall_counts_duplicates_once() {
        let ranked = ids(&["d1", "d1", "d1"]);
        assert_eq!(recall_at_k(&["d1", "d2"], &ranked, 3), 0.5);
    }

    #[test]
    fn test_mrr_not_limited_to_k() {
        let ranked = ids(&["a", "b", "c", "d1"]);
        assert_eq!(mrr(&["d1"], &ranked), 0.25);
        assert_eq!(mrr(&["zz"], &ranked), 0.0);
        assert_eq!(mrr(&["d1"], &[]), 0.0);
    }

    #[test]
    fn test_ndcg_single_hit_at_rank_two() {
        // DCG = 1/log2(3), IDCG = 1/log2(2) = 1
        let got = ndcg_at_k(&["d1"], &ids(&["x", "d1"]), 10);
        assert_relative_eq!(got, 1.0 / 3f64.log2(), epsilon = 1e-12);
    }

    #[test]
    fn test_ndcg_ideal_uses_min_k_relevant() {
        // Three relevant but k=1: a hit at rank 1 is already ideal
        let got = ndcg_at_k(&["a", "b", "c"], &ids(&["a", "x"]), 1);
        assert_relative_eq!(got, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ndcg_k_zero() {
        assert_eq!(ndcg_at_k(&["a"], &ids(&["a"]), 0), 0.0);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
    }
}
