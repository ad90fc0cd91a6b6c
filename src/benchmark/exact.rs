//! Brute-force k-NN, the ground truth for recall measurements.

use crate::distance::Metric;
use crate::graph::cmp_entry;
use crate::point::{Point, PointDescriptor, PointKind, PointRef, PointStore};
use crate::{Result, RetrieveError};
use rayon::prelude::*;

/// Exhaustive search over a [`PointStore`]. Every query costs `n` distance
/// evaluations; sparse points are compared through their sparse kernels.
#[derive(Debug, Clone)]
pub struct ExactIndex {
    metric: Metric,
    store: PointStore,
}

impl ExactIndex {
    pub fn new(descriptor: PointDescriptor, metric: Metric) -> Result<Self> {
        metric.check_supports(descriptor.kind)?;
        Ok(Self {
            metric,
            store: PointStore::with_descriptor(descriptor)?,
        })
    }

    pub fn dense(dimension: usize, metric: Metric) -> Result<Self> {
        Self::new(
            PointDescriptor {
                kind: PointKind::Dense,
                dimension,
            },
            metric,
        )
    }

    pub fn sparse(dimension: usize, metric: Metric) -> Result<Self> {
        Self::new(
            PointDescriptor {
                kind: PointKind::Sparse,
                dimension,
            },
            metric,
        )
    }

    pub fn from_points(points: &[Point], metric: Metric) -> Result<Self> {
        let first = points
            .first()
            .ok_or_else(|| RetrieveError::Config("empty point set".into()))?;
        let mut index = Self::new(first.descriptor(), metric)?;
        for p in points {
            index.add(p.as_ref())?;
        }
        Ok(index)
    }

    pub fn add(&mut self, point: PointRef<'_>) -> Result<u32> {
        self.store.add(point)
    }

    /// The `k` closest points, ascending by `(distance, id)`.
    pub fn search(&self, query: PointRef<'_>, k: usize) -> Result<Vec<(u32, f32)>> {
        if k == 0 {
            return Err(RetrieveError::Config("k must be greater than 0".into()));
        }
        self.store.check(query)?;
        let dimension = self.store.dimension();
        let mut all: Vec<(u32, f32)> = (0..self.store.len() as u32)
            .into_par_iter()
            .map(|id| (id, self.metric.distance(query, self.store.get(id), dimension)))
            .collect();
        let k = k.min(all.len());
        if k < all.len() {
            all.select_nth_unstable_by(k, |a, b| cmp_entry(a.1, a.0, b.1, b.0));
            all.truncate(k);
        }
        all.sort_unstable_by(|a, b| cmp_entry(a.1, a.0, b.1, b.0));
        Ok(all)
    }

    /// Ids of the `k` true nearest neighbors of each query.
    pub fn ground_truth(&self, queries: &[PointRef<'_>], k: usize) -> Result<Vec<Vec<u32>>> {
        queries
            .iter()
            .map(|&q| -> Result<Vec<u32>> {
                Ok(self.search(q, k)?.into_iter().map(|(id, _)| id).collect())
            })
            .collect()
    }

    pub fn store(&self) -> &PointStore {
        &self.store
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_and_tie_broken_by_id() {
        let mut index = ExactIndex::dense(1, Metric::Euclidean).unwrap();
        for x in [5.0_f32, 1.0, 3.0, 1.0, 9.0] {
            index.add(PointRef::Dense(&[x])).unwrap();
        }
        let hits = index.search(PointRef::Dense(&[2.0]), 3).unwrap();
        assert_eq!(hits, vec![(1, 1.0), (2, 1.0), (3, 1.0)]);
    }

    #[test]
    fn k_larger_than_n_returns_all() {
        let mut index = ExactIndex::sparse(10, Metric::Cosine).unwrap();
        index.add(PointRef::sparse(&[1], &[1.0])).unwrap();
        index.add(PointRef::sparse(&[2], &[1.0])).unwrap();
        let hits = index.search(PointRef::sparse(&[1], &[2.0]), 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 0);
        assert!(hits[0].1.abs() < 1e-6);
    }
}
