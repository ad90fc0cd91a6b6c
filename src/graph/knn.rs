//! Frozen k-NN graph.

use super::neighbor_list::NeighborList;
use crate::{Result, RetrieveError};
use serde::{Deserialize, Serialize};

/// Read-only k-NN graph: for every point, up to `k` neighbors ascending by
/// distance.
///
/// Rows are packed back to back (CSR style) so the graph is a handful of flat
/// allocations regardless of `n`. Construction goes through
/// [`KnnGraph::freeze`], which re-checks the invariants: no self-loops, no
/// duplicate ids within a row, non-decreasing distances, at most `k` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnGraph {
    k: usize,
    offsets: Vec<usize>,
    ids: Vec<u32>,
    distances: Vec<f32>,
}

impl KnnGraph {
    /// Freeze build-time lists into a compact graph.
    ///
    /// The per-point `is_new` flags are dropped here; they only matter during
    /// refinement.
    pub fn freeze(k: usize, lists: Vec<NeighborList>) -> Result<Self> {
        let total: usize = lists.iter().map(NeighborList::len).sum();
        let mut offsets = Vec::with_capacity(lists.len() + 1);
        let mut ids = Vec::with_capacity(total);
        let mut distances = Vec::with_capacity(total);
        offsets.push(0);
        for list in &lists {
            for n in list.iter() {
                ids.push(n.id);
                distances.push(n.distance);
            }
            offsets.push(ids.len());
        }
        let graph = Self {
            k,
            offsets,
            ids,
            distances,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Check all row invariants.
    pub fn validate(&self) -> Result<()> {
        for p in 0..self.len() {
            let ids = self.neighbor_ids(p as u32);
            let dists = self.neighbor_distances(p as u32);
            let point_id = p as u32;
            if ids.len() > self.k {
                return Err(RetrieveError::Build {
                    point_id,
                    reason: format!("{} neighbors exceed k = {}", ids.len(), self.k),
                });
            }
            if ids.contains(&point_id) {
                return Err(RetrieveError::Build {
                    point_id,
                    reason: "neighbor list contains the point itself".into(),
                });
            }
            for (i, id) in ids.iter().enumerate() {
                if ids[..i].contains(id) {
                    return Err(RetrieveError::Build {
                        point_id,
                        reason: format!("duplicate neighbor {id}"),
                    });
                }
            }
            if dists.windows(2).any(|w| w[0] > w[1]) {
                return Err(RetrieveError::Build {
                    point_id,
                    reason: "neighbor distances are not ascending".into(),
                });
            }
        }
        Ok(())
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum row length.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Total stored edges.
    pub fn num_edges(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn neighbor_ids(&self, id: u32) -> &[u32] {
        let i = id as usize;
        &self.ids[self.offsets[i]..self.offsets[i + 1]]
    }

    #[inline]
    pub fn neighbor_distances(&self, id: u32) -> &[f32] {
        let i = id as usize;
        &self.distances[self.offsets[i]..self.offsets[i + 1]]
    }

    /// `(neighbor id, distance)` pairs for `id`, closest first.
    pub fn neighbors(&self, id: u32) -> impl ExactSizeIterator<Item = (u32, f32)> + '_ {
        self.neighbor_ids(id)
            .iter()
            .copied()
            .zip(self.neighbor_distances(id).iter().copied())
    }

    /// Row-wise copies of ids and distances.
    pub fn to_arrays(&self) -> (Vec<Vec<u32>>, Vec<Vec<f32>>) {
        (0..self.len() as u32)
            .map(|p| {
                (
                    self.neighbor_ids(p).to_vec(),
                    self.neighbor_distances(p).to_vec(),
                )
            })
            .unzip()
    }

    pub fn memory_bytes(&self) -> usize {
        self.offsets.len() * std::mem::size_of::<usize>()
            + self.ids.len() * std::mem::size_of::<u32>()
            + self.distances.len() * std::mem::size_of::<f32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(k: usize, entries: &[(u32, f32)]) -> NeighborList {
        let mut l = NeighborList::new(k);
        for &(id, d) in entries {
            l.push(id, d, true);
        }
        l
    }

    #[test]
    fn freeze_packs_rows() {
        let g = KnnGraph::freeze(
            2,
            vec![
                list(2, &[(1, 0.5), (2, 0.7)]),
                list(2, &[(0, 0.5)]),
                list(2, &[(1, 0.2), (0, 0.7)]),
            ],
        )
        .unwrap();
        assert_eq!(g.len(), 3);
        assert_eq!(g.num_edges(), 5);
        assert_eq!(g.neighbor_ids(2), &[1, 0]);
        assert_eq!(g.neighbors(1).collect::<Vec<_>>(), vec![(0, 0.5)]);
    }

    #[test]
    fn freeze_rejects_self_loop() {
        let err = KnnGraph::freeze(2, vec![list(2, &[(0, 0.0)])]).unwrap_err();
        assert!(matches!(err, RetrieveError::Build { point_id: 0, .. }));
    }

    #[test]
    fn to_arrays_matches_rows() {
        let g = KnnGraph::freeze(1, vec![list(1, &[(1, 0.3)]), list(1, &[(0, 0.3)])]).unwrap();
        let (ids, dists) = g.to_arrays();
        assert_eq!(ids, vec![vec![1], vec![0]]);
        assert_eq!(dists, vec![vec![0.3], vec![0.3]]);
    }
}
