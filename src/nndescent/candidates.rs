//! Per-round candidate sampling.
//!
//! For each point `p` a round joins two sets: "new" candidates (entries not yet
//! joined) and "old" ones. Both draw from `p`'s forward list and from the
//! reverse lists (points listing `p`). Each set is capped at `max_candidates`;
//! when there are more, the ones with the lowest pseudo-random priority win.
//! Priorities hash `(seed, round, owner, candidate)`, so sampling is
//! reproducible and independent of scheduling.
//!
//! Forward entries that were sampled into `p`'s new set are flagged old in
//! `p`'s list, so each new edge is joined once.

use super::mix64;
use crate::graph::NeighborList;
use rayon::prelude::*;

/// Candidate sets for one round, indexed by anchor point.
pub(crate) struct Candidates {
    pub new: Vec<Vec<u32>>,
    pub old: Vec<Vec<u32>>,
}

#[inline]
fn priority(seed: u64, round: u64, owner: u32, candidate: u32) -> u64 {
    mix64(seed ^ mix64(round ^ mix64(((owner as u64) << 32) | candidate as u64)))
}

/// Sample the new and old candidate sets and clear the `is_new` flag of
/// sampled forward entries.
pub(crate) fn sample(
    lists: &mut [NeighborList],
    max_candidates: usize,
    seed: u64,
    round: u64,
) -> Candidates {
    let n = lists.len();

    // (priority, id, is_new) proposals per owner, forward part first.
    let forward: Vec<Vec<(u64, u32, bool)>> = lists
        .par_iter()
        .enumerate()
        .map(|(p, list)| {
            list.iter()
                .map(|nb| (priority(seed, round, p as u32, nb.id), nb.id, nb.is_new))
                .collect()
        })
        .collect();

    let mut proposals = forward.clone();
    for (p, row) in forward.iter().enumerate() {
        for &(_, q, is_new) in row {
            proposals[q as usize].push((priority(seed, round, q, p as u32), p as u32, is_new));
        }
    }

    let (new, old): (Vec<Vec<u32>>, Vec<Vec<u32>>) = proposals
        .into_par_iter()
        .map(|mut row| {
            row.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
            let mut new = Vec::with_capacity(max_candidates.min(row.len()));
            let mut old = Vec::with_capacity(max_candidates.min(row.len()));
            for (_, id, is_new) in row {
                let set = if is_new { &mut new } else { &mut old };
                if set.len() < max_candidates && !set.contains(&id) {
                    set.push(id);
                }
            }
            (new, old)
        })
        .unzip();
    debug_assert_eq!(new.len(), n);

    lists
        .par_iter_mut()
        .zip(new.par_iter())
        .for_each(|(list, sampled)| {
            for &q in sampled {
                list.mark_old(q);
            }
        });

    Candidates { new, old }
}
