//! One NN-Descent refinement round: local joins, then per-point updates.

use super::candidates::Candidates;
use super::Oracle;
use crate::graph::{cmp_entry, NeighborList};
use crate::Result;
use rayon::prelude::*;

/// Run the local join at every anchor and apply the proposals.
///
/// Returns the number of proposals that changed a list.
pub(crate) fn round(
    lists: &mut [NeighborList],
    cands: &Candidates,
    oracle: &Oracle<'_>,
) -> Result<usize> {
    let n = lists.len();
    let thresholds: Vec<f32> = lists.iter().map(NeighborList::threshold).collect();

    let proposals: Vec<Vec<(u32, u32, f32)>> = (0..n)
        .into_par_iter()
        .map(|p| local_join(&cands.new[p], &cands.old[p], &thresholds, oracle))
        .collect::<Result<Vec<_>>>()?;

    let mut buckets: Vec<Vec<(u32, f32)>> = vec![Vec::new(); n];
    for &(u, v, d) in proposals.iter().flatten() {
        if d < thresholds[u as usize] {
            buckets[u as usize].push((v, d));
        }
        if d < thresholds[v as usize] {
            buckets[v as usize].push((u, d));
        }
    }

    let updates: usize = lists
        .par_iter_mut()
        .zip(buckets.into_par_iter())
        .map(|(list, mut bucket)| {
            bucket.sort_unstable_by(|a, b| cmp_entry(a.1, a.0, b.1, b.0));
            bucket
                .into_iter()
                .filter(|&(id, d)| list.push(id, d, true))
                .count()
        })
        .sum();
    Ok(updates)
}

/// Pairs `(u, v, d)` from one anchor's candidates that beat the snapshot
/// threshold of at least one endpoint.
fn local_join(
    new: &[u32],
    old: &[u32],
    thresholds: &[f32],
    oracle: &Oracle<'_>,
) -> Result<Vec<(u32, u32, f32)>> {
    let mut out = Vec::new();
    for (i, &u) in new.iter().enumerate() {
        let others = new[i + 1..].iter().chain(old.iter());
        for &v in others {
            if u == v {
                continue;
            }
            let d = oracle.distance(u, v)?;
            if d < thresholds[u as usize] || d < thresholds[v as usize] {
                out.push((u, v, d));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Metric;
    use crate::point::{PointRef, PointStore};

    #[test]
    fn join_finds_neighbor_of_neighbor() {
        // 0 -- 1 -- 2 on a line; 0 and 2 only know 1.
        let mut store = PointStore::dense(1).unwrap();
        for x in [0.0_f32, 1.0, 1.5, 10.0] {
            store.add(PointRef::Dense(&[x])).unwrap();
        }
        let oracle = Oracle::new(&store, Metric::Euclidean);
        let mut lists: Vec<NeighborList> = (0..4).map(|_| NeighborList::new(2)).collect();
        lists[0].push(1, 1.0, true);
        lists[0].push(3, 10.0, true);
        lists[1].push(0, 1.0, true);
        lists[2].push(1, 0.5, true);
        lists[2].push(3, 8.5, true);
        lists[3].push(2, 8.5, true);
        let cands = Candidates {
            new: vec![vec![], vec![0, 2], vec![], vec![]],
            old: vec![vec![]; 4],
        };
        let updates = round(&mut lists, &cands, &oracle).unwrap();
        assert!(updates >= 2);
        assert_eq!(lists[0].as_slice()[1].id, 2);
        assert_eq!(lists[2].as_slice()[1].id, 0);
    }

    #[test]
    fn nothing_to_join_means_no_updates() {
        let mut store = PointStore::dense(1).unwrap();
        store.add(PointRef::Dense(&[0.0])).unwrap();
        store.add(PointRef::Dense(&[1.0])).unwrap();
        let oracle = Oracle::new(&store, Metric::Euclidean);
        let mut lists = vec![NeighborList::new(1), NeighborList::new(1)];
        let cands = Candidates {
            new: vec![vec![], vec![]],
            old: vec![vec![1], vec![0]],
        };
        assert_eq!(round(&mut lists, &cands, &oracle).unwrap(), 0);
        assert_eq!(oracle.evaluations(), 0);
    }
}
