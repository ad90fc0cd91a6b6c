//! Query-time adjacency derived from the frozen k-NN graph.
//!
//! A k-NN graph is directed and often poorly connected: hubs collect many
//! in-edges while outliers have none. Before serving queries the graph is
//! (optionally) diversified and symmetrised:
//!
//! 1. **Diversify**: keep neighbor `q` of `p` only if `q` is closer to `p`
//!    than to every neighbor already kept (relative neighborhood rule, the
//!    same criterion HNSW uses for neighbor selection). This drops edges that
//!    point "the same way" and frees degree for long-range edges.
//! 2. **Reverse edges**: every kept `p -> q` also yields `q -> p`.
//! 3. **Cap**: each row keeps its closest `ceil(degree_multiplier * k)` entries.

use super::knn::KnnGraph;
use crate::distance::Metric;
use crate::point::PointStore;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// How to derive the search adjacency from the k-NN graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchGraphParams {
    /// Apply relative-neighborhood pruning to forward edges.
    pub diversify: bool,
    /// Add the reverse of every kept edge.
    pub reverse_edges: bool,
    /// Row length cap as a multiple of `k`.
    pub degree_multiplier: f32,
}

impl Default for SearchGraphParams {
    fn default() -> Self {
        Self {
            diversify: true,
            reverse_edges: true,
            degree_multiplier: 1.5,
        }
    }
}

impl SearchGraphParams {
    /// Query the k-NN lists exactly as built.
    pub fn plain() -> Self {
        Self {
            diversify: false,
            reverse_edges: false,
            degree_multiplier: 1.0,
        }
    }
}

/// Adjacency lists traversed by the query engine. Rows are sorted by
/// distance to their owner.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchGraph {
    adjacency: Vec<SmallVec<[u32; 16]>>,
}

impl SearchGraph {
    /// Build the search adjacency for `knn`.
    ///
    /// Every metric in [`Metric`] is symmetric, so reverse edges reuse the
    /// forward distance.
    pub fn from_knn(
        knn: &KnnGraph,
        store: &PointStore,
        metric: Metric,
        params: &SearchGraphParams,
    ) -> Self {
        let n = knn.len();
        let dimension = store.dimension();
        let max_degree = ((params.degree_multiplier.max(1.0) * knn.k() as f32).ceil() as usize)
            .max(knn.k())
            .max(1);

        let forward: Vec<Vec<(u32, f32)>> = (0..n as u32)
            .into_par_iter()
            .map(|p| {
                if params.diversify {
                    diversify(knn.neighbors(p), |a, b| {
                        metric.distance(store.get(a), store.get(b), dimension)
                    })
                } else {
                    knn.neighbors(p).collect()
                }
            })
            .collect();

        let mut rows = forward.clone();
        if params.reverse_edges {
            for (p, edges) in forward.iter().enumerate() {
                for &(q, d) in edges {
                    rows[q as usize].push((p as u32, d));
                }
            }
        }

        let adjacency = rows
            .into_par_iter()
            .map(|mut row| {
                row.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
                row.dedup_by_key(|e| e.0);
                let mut out: SmallVec<[u32; 16]> = SmallVec::with_capacity(row.len().min(max_degree));
                for (id, _) in row {
                    if out.len() >= max_degree {
                        break;
                    }
                    if !out.contains(&id) {
                        out.push(id);
                    }
                }
                out
            })
            .collect();

        Self { adjacency }
    }

    /// Use the k-NN rows unchanged.
    pub fn from_knn_plain(knn: &KnnGraph) -> Self {
        Self {
            adjacency: (0..knn.len() as u32)
                .map(|p| knn.neighbor_ids(p).iter().copied().collect())
                .collect(),
        }
    }

    #[inline]
    pub fn neighbors(&self, id: u32) -> &[u32] {
        &self.adjacency[id as usize]
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn num_edges(&self) -> usize {
        self.adjacency.iter().map(|row| row.len()).sum()
    }

    pub fn memory_bytes(&self) -> usize {
        self.adjacency.len() * std::mem::size_of::<SmallVec<[u32; 16]>>()
            + self
                .adjacency
                .iter()
                .filter(|row| row.spilled())
                .map(|row| row.capacity() * std::mem::size_of::<u32>())
                .sum::<usize>()
    }
}

/// Relative-neighborhood selection over a closest-first candidate row.
///
/// Candidate `q` (at distance `d` from the owner) is kept if `d < dist(r, q)`
/// for every already kept `r`. The closest candidate is always kept.
fn diversify<I, F>(candidates: I, dist: F) -> Vec<(u32, f32)>
where
    I: Iterator<Item = (u32, f32)>,
    F: Fn(u32, u32) -> f32,
{
    let mut kept: Vec<(u32, f32)> = Vec::new();
    for (q, d) in candidates {
        if kept.iter().all(|&(r, _)| d < dist(r, q)) {
            kept.push((q, d));
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NeighborList;
    use crate::point::PointRef;

    /// Points on a line: 0.0, 1.0, 2.0, 10.0.
    fn line() -> (PointStore, KnnGraph) {
        let xs = [0.0_f32, 1.0, 2.0, 10.0];
        let mut store = PointStore::dense(1).unwrap();
        for x in xs {
            store.add(PointRef::Dense(&[x])).unwrap();
        }
        let lists = (0..xs.len())
            .map(|p| {
                let mut l = NeighborList::new(2);
                for q in 0..xs.len() {
                    if p != q {
                        l.push(q as u32, (xs[p] - xs[q]).abs(), false);
                    }
                }
                l
            })
            .collect();
        (store, KnnGraph::freeze(2, lists).unwrap())
    }

    #[test]
    fn diversify_drops_shadowed_neighbor() {
        // From 0: neighbors 1 (d=1) and 2 (d=2). 2 is closer to 1 than to 0.
        let kept = diversify([(1u32, 1.0f32), (2, 2.0)].into_iter(), |a, b| {
            (a as f32 - b as f32).abs()
        });
        assert_eq!(kept, vec![(1, 1.0)]);
    }

    #[test]
    fn reverse_edges_reach_outlier() {
        let (store, knn) = line();
        // Nobody lists the outlier 3 as a forward neighbor.
        assert!((0..3).all(|p| !knn.neighbor_ids(p).contains(&3)));
        let graph = SearchGraph::from_knn(&knn, &store, Metric::Euclidean, &SearchGraphParams::default());
        assert!(graph.neighbors(2).contains(&3));
    }

    #[test]
    fn rows_respect_degree_cap() {
        let (store, knn) = line();
        let params = SearchGraphParams {
            diversify: false,
            reverse_edges: true,
            degree_multiplier: 1.0,
        };
        let graph = SearchGraph::from_knn(&knn, &store, Metric::Euclidean, &params);
        for p in 0..graph.len() as u32 {
            assert!(graph.neighbors(p).len() <= 2);
            assert!(!graph.neighbors(p).contains(&p));
        }
    }

    #[test]
    fn plain_graph_copies_rows() {
        let (_, knn) = line();
        let graph = SearchGraph::from_knn_plain(&knn);
        assert_eq!(graph.neighbors(3), knn.neighbor_ids(3));
    }
}
