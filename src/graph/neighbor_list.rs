//! Bounded, sorted neighbor lists used while the graph is being built.

use std::cmp::Ordering;

/// Candidate/neighbor entry.
///
/// `is_new` marks entries that have not yet taken part in a local join.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: u32,
    pub distance: f32,
    pub is_new: bool,
}

/// Total order on `(distance, id)`: ascending distance, lower id on ties.
#[inline]
pub(crate) fn cmp_entry(a_dist: f32, a_id: u32, b_dist: f32, b_id: u32) -> Ordering {
    a_dist.total_cmp(&b_dist).then(a_id.cmp(&b_id))
}

/// Up to `capacity` neighbors of one point, ascending by `(distance, id)`,
/// unique by id.
///
/// Capacities are tens of entries: a sorted `Vec` with binary insertion and a
/// linear duplicate scan.
/// Because admission is decided by the `(distance, id)` order alone, the
/// final contents after any sequence of [`NeighborList::push`] calls are the
/// `capacity` smallest distinct candidates, independent of arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborList {
    capacity: usize,
    entries: Vec<Neighbor>,
}

impl NeighborList {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity + 1),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Distance a candidate must beat to enter; infinite while not full.
    #[inline]
    pub fn threshold(&self) -> f32 {
        if self.is_full() {
            self.entries.last().map_or(f32::INFINITY, |n| n.distance)
        } else {
            f32::INFINITY
        }
    }

    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        self.entries.iter().any(|n| n.id == id)
    }

    /// Offer a candidate. Returns `true` if the list changed.
    pub fn push(&mut self, id: u32, distance: f32, is_new: bool) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.is_full() {
            if let Some(worst) = self.entries.last() {
                if cmp_entry(distance, id, worst.distance, worst.id) != Ordering::Less {
                    return false;
                }
            }
        }
        if self.contains(id) {
            return false;
        }
        let pos = self
            .entries
            .partition_point(|n| cmp_entry(n.distance, n.id, distance, id) == Ordering::Less);
        self.entries.insert(
            pos,
            Neighbor {
                id,
                distance,
                is_new,
            },
        );
        if self.entries.len() > self.capacity {
            self.entries.pop();
        }
        true
    }

    /// Clear the `is_new` flag of `id`, if present.
    pub fn mark_old(&mut self, id: u32) {
        if let Some(n) = self.entries.iter_mut().find(|n| n.id == id) {
            n.is_new = false;
        }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Neighbor> + '_ {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Neighbor] {
        &self.entries
    }
}
