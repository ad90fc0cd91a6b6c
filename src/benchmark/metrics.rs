//! Quality measures for approximate neighbor lists.
//!
//! All functions take neighbor ids closest first. `k` truncates both sides,
//! so a retrieval longer than `k` is not rewarded for its tail.

use std::collections::HashSet;

/// Share of the first `k` true neighbors present among the first `k`
/// retrieved ids. Zero when there is no ground truth.
pub fn recall_at_k(ground_truth: &[u32], retrieved: &[u32], k: usize) -> f32 {
    let k = k.min(ground_truth.len());
    if k == 0 {
        return 0.0;
    }
    let top = &retrieved[..k.min(retrieved.len())];
    let hits = ground_truth[..k].iter().filter(|id| top.contains(id)).count();
    hits as f32 / k as f32
}

/// Share of the first `k` retrieved ids that are among the first `k` true
/// neighbors. An empty retrieval scores zero.
pub fn precision_at_k(ground_truth: &[u32], retrieved: &[u32], k: usize) -> f32 {
    let top = &retrieved[..k.min(retrieved.len())];
    if top.is_empty() {
        return 0.0;
    }
    let truth = &ground_truth[..k.min(ground_truth.len())];
    let hits = top.iter().filter(|id| truth.contains(id)).count();
    hits as f32 / top.len() as f32
}

/// [`recall_at_k`] averaged over queries. Rows are paired by position.
pub fn mean_recall(ground_truths: &[Vec<u32>], retrievals: &[Vec<u32>], k: usize) -> f32 {
    if ground_truths.is_empty() {
        return 0.0;
    }
    let sum: f32 = ground_truths
        .iter()
        .zip(retrievals)
        .map(|(truth, got)| recall_at_k(truth, got, k))
        .sum();
    sum / ground_truths.len() as f32
}

/// Recall@k by distance: a retrieved hit counts when it is no farther than
/// the true k-th neighbor (plus `tolerance`), so equidistant substitutes are
/// not penalised. Both inputs are `(id, distance)` ascending.
pub fn distance_recall_at_k(
    ground_truth: &[(u32, f32)],
    retrieved: &[(u32, f32)],
    k: usize,
    tolerance: f32,
) -> f32 {
    let k = k.min(ground_truth.len());
    if k == 0 {
        return 0.0;
    }
    let kth = ground_truth[k - 1].1 + tolerance;
    let hits = retrieved.iter().take(k).filter(|h| h.1 <= kth).count();
    hits as f32 / k as f32
}

/// Recall of a k-NN graph against exact neighbor rows: the fraction of true
/// edges present, pooled over all points.
pub fn graph_recall(exact: &[Vec<u32>], approx: &[Vec<u32>]) -> f32 {
    let mut found = 0usize;
    let mut total = 0usize;
    for (gt, row) in exact.iter().zip(approx) {
        let row: HashSet<u32> = row.iter().copied().collect();
        found += gt.iter().filter(|id| row.contains(id)).count();
        total += gt.len();
    }
    if total == 0 {
        0.0
    } else {
        found as f32 / total as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recall_at_k() {
        assert_eq!(recall_at_k(&[1, 2, 3, 4], &[1, 2, 5, 6], 4), 0.5);
        assert_eq!(recall_at_k(&[1, 2, 3], &[3, 2, 1], 3), 1.0);
        assert_eq!(recall_at_k(&[], &[1], 3), 0.0);
        // Ids past k are ignored.
        assert_eq!(recall_at_k(&[1, 2], &[7, 8, 1, 2], 2), 0.0);
    }

    #[test]
    fn test_precision_at_k() {
        assert_eq!(precision_at_k(&[1, 2, 3], &[1, 9], 3), 0.5);
        assert_eq!(precision_at_k(&[1, 2, 3], &[], 3), 0.0);
    }

    #[test]
    fn test_mean_recall() {
        let gt = vec![vec![1, 2], vec![3, 4]];
        let got = vec![vec![1, 2], vec![3, 9]];
        assert!((mean_recall(&gt, &got, 2) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_distance_recall_counts_ties() {
        let truth = [(0, 0.0), (1, 0.5), (2, 0.5)];
        // Id 3 ties the true third neighbor.
        let got = [(0, 0.0), (1, 0.5), (3, 0.5)];
        assert_eq!(distance_recall_at_k(&truth, &got, 3, 1e-6), 1.0);
        let got = [(0, 0.0), (4, 0.9)];
        assert!((distance_recall_at_k(&truth, &got, 3, 1e-6) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_graph_recall() {
        let exact = vec![vec![1, 2], vec![0, 2]];
        let approx = vec![vec![2, 1], vec![0, 3]];
        assert!((graph_recall(&exact, &approx) - 0.75).abs() < 1e-6);
    }
}
