//! Initial graph: forest leaf pairs, then random top-up.

use super::{mix64, Oracle};
use crate::cancel::{self, CancelToken};
use crate::forest::RpForest;
use crate::graph::NeighborList;
use crate::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Offer every within-leaf pair of every tree to both endpoints.
///
/// Trees are processed one after another; within a tree, leaf pairs are
/// evaluated in parallel and applied per point. Every entry starts as new.
pub(crate) fn seed_from_forest(
    forest: &RpForest,
    oracle: &Oracle<'_>,
    k: usize,
    cancel: Option<&CancelToken>,
) -> Result<Vec<NeighborList>> {
    let n = oracle.len();
    let mut lists: Vec<NeighborList> = (0..n).map(|_| NeighborList::new(k)).collect();

    for tree in forest.trees() {
        cancel::check(cancel)?;
        let leaves: Vec<&[u32]> = tree.leaves().collect();
        let pairs: Vec<Vec<(u32, u32, f32)>> = leaves
            .par_iter()
            .map(|leaf| -> Result<Vec<(u32, u32, f32)>> {
                let mut out = Vec::with_capacity(leaf.len() * leaf.len().saturating_sub(1) / 2);
                for (i, &u) in leaf.iter().enumerate() {
                    for &v in &leaf[i + 1..] {
                        out.push((u, v, oracle.distance(u, v)?));
                    }
                }
                Ok(out)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut buckets: Vec<Vec<(u32, f32)>> = vec![Vec::new(); n];
        for &(u, v, d) in pairs.iter().flatten() {
            buckets[u as usize].push((v, d));
            buckets[v as usize].push((u, d));
        }
        lists
            .par_iter_mut()
            .zip(buckets.into_par_iter())
            .for_each(|(list, bucket)| {
                for (id, d) in bucket {
                    list.push(id, d, true);
                }
            });
    }
    Ok(lists)
}

/// Top up lists holding fewer than `k` entries with random points.
///
/// Point `p` draws from its own RNG seeded from `(seed, p)`. At most `3 · k`
/// draws are made per point, so tiny stores may stay short.
pub(crate) fn fill_random(lists: &mut [NeighborList], oracle: &Oracle<'_>, seed: u64) -> Result<()> {
    let n = lists.len() as u32;
    lists
        .par_iter_mut()
        .enumerate()
        .filter(|(_, list)| !list.is_full())
        .try_for_each(|(p, list)| -> Result<()> {
            let p = p as u32;
            let mut rng = StdRng::seed_from_u64(mix64(seed ^ mix64(p as u64 + 1)));
            let attempts = 3 * list.capacity();
            for _ in 0..attempts {
                if list.is_full() {
                    break;
                }
                let q = rng.random_range(0..n);
                if q == p || list.contains(q) {
                    continue;
                }
                list.push(q, oracle.distance(p, q)?, true);
            }
            Ok(())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Metric;
    use crate::point::{PointRef, PointStore};

    fn store(n: usize) -> PointStore {
        let mut s = PointStore::dense(2).unwrap();
        for i in 0..n {
            s.add(PointRef::Dense(&[i as f32, (i * i % 7) as f32])).unwrap();
        }
        s
    }

    #[test]
    fn forest_seeding_respects_invariants() {
        let s = store(80);
        let forest = RpForest::build(&s, 3, 6, false, 1, None).unwrap();
        let oracle = Oracle::new(&s, Metric::Euclidean);
        let lists = seed_from_forest(&forest, &oracle, 4, None).unwrap();
        for (p, list) in lists.iter().enumerate() {
            assert!(list.len() <= 4);
            assert!(!list.contains(p as u32));
            assert!(list.iter().all(|n| n.is_new));
        }
        assert!(oracle.evaluations() > 0);
    }

    #[test]
    fn random_fill_completes_lists() {
        let s = store(40);
        let oracle = Oracle::new(&s, Metric::Manhattan);
        let mut lists: Vec<NeighborList> = (0..40).map(|_| NeighborList::new(5)).collect();
        fill_random(&mut lists, &oracle, 9).unwrap();
        assert!(lists.iter().filter(|l| l.is_full()).count() >= 38);
        for (p, list) in lists.iter().enumerate() {
            assert!(!list.contains(p as u32));
        }
    }
}
