//! Random projection forest.
//!
//! Each tree recursively splits its point set with a random hyperplane until
//! a node holds at most `leaf_size` points. Points that share a leaf are
//! likely to be close, so all pairs within each leaf make a cheap, better than
//! random set of initial neighbor candidates for NN-Descent. Building `T`
//! trees costs roughly `O(T · n log n)` margin evaluations.
//!
//! # Splits
//!
//! The hyperplane is drawn through two random pivots of the node (see
//! [`hyperplane`]). Points within `1e-8` of the plane go to a random side.
//! If every point lands on one side (duplicates, or a degenerate plane) the
//! node is instead halved at random, so leaves stay roughly balanced and
//! recursion always terminates. Depth is capped at [`MAX_DEPTH`].
//!
//! The forest is kept after the build: queries descend it to pick entry
//! points for the graph search.

mod hyperplane;

use crate::cancel::{self, CancelToken};
use crate::point::{PointRef, PointStore};
use crate::Result;
use hyperplane::Hyperplane;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Depth at which a node becomes a leaf regardless of size.
pub const MAX_DEPTH: usize = 200;

const MARGIN_EPSILON: f32 = 1e-8;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        /// `None` for nodes halved at random.
        plane: Option<Hyperplane>,
        left: u32,
        right: u32,
    },
    Leaf {
        start: u32,
        end: u32,
    },
}

/// One random projection tree. Leaves are contiguous ranges of `indices`.
#[derive(Debug, Clone, PartialEq)]
pub struct RpTree {
    nodes: Vec<Node>,
    indices: Vec<u32>,
}

impl RpTree {
    /// Build a tree over all points in `store`.
    ///
    /// A `leaf_size` below 1 is treated as 1: a single point is always a leaf.
    pub fn build(store: &PointStore, leaf_size: usize, angular: bool, rng: &mut StdRng) -> Self {
        let leaf_size = leaf_size.max(1);
        let mut indices: Vec<u32> = (0..store.len() as u32).collect();
        let mut nodes = vec![Node::Leaf { start: 0, end: 0 }];
        // (node slot, start, end, depth)
        let mut stack = vec![(0usize, 0usize, indices.len(), 0usize)];

        while let Some((slot, start, end, depth)) = stack.pop() {
            if end - start <= leaf_size || depth >= MAX_DEPTH {
                nodes[slot] = Node::Leaf {
                    start: start as u32,
                    end: end as u32,
                };
                continue;
            }
            let (plane, n_left) = split(store, &mut indices[start..end], angular, rng);
            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { start: 0, end: 0 });
            nodes.push(Node::Leaf { start: 0, end: 0 });
            nodes[slot] = Node::Split {
                plane,
                left: left as u32,
                right: right as u32,
            };
            stack.push((right, start + n_left, end, depth + 1));
            stack.push((left, start, start + n_left, depth + 1));
        }

        Self { nodes, indices }
    }

    /// Members of the leaf that `query` falls into.
    pub fn search_leaf(&self, query: PointRef<'_>) -> &[u32] {
        let mut node = 0usize;
        loop {
            match &self.nodes[node] {
                Node::Leaf { start, end } => return &self.indices[*start as usize..*end as usize],
                Node::Split { plane, left, right } => {
                    let go_left = plane.as_ref().map_or(true, |p| p.margin(query) > 0.0);
                    node = if go_left { *left } else { *right } as usize;
                }
            }
        }
    }

    /// All leaves, left to right.
    pub fn leaves(&self) -> impl Iterator<Item = &[u32]> + '_ {
        let mut ranges: Vec<(u32, u32)> = self
            .nodes
            .iter()
            .filter_map(|n| match n {
                Node::Leaf { start, end } => Some((*start, *end)),
                Node::Split { .. } => None,
            })
            .collect();
        ranges.sort_unstable();
        ranges
            .into_iter()
            .map(move |(s, e)| &self.indices[s as usize..e as usize])
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    pub fn memory_bytes(&self) -> usize {
        self.indices.len() * std::mem::size_of::<u32>()
            + self.nodes.len() * std::mem::size_of::<Node>()
            + self
                .nodes
                .iter()
                .map(|n| match n {
                    Node::Split { plane: Some(p), .. } => p.memory_bytes(),
                    _ => 0,
                })
                .sum::<usize>()
    }
}

/// Partition `members` in place, left side first. Returns the plane used (if
/// any) and the size of the left side, which is always in `1..len`.
fn split(
    store: &PointStore,
    members: &mut [u32],
    angular: bool,
    rng: &mut StdRng,
) -> (Option<Hyperplane>, usize) {
    let n = members.len();
    let i = rng.random_range(0..n);
    let mut j = rng.random_range(0..n - 1);
    if j >= i {
        j += 1;
    }

    if let Some(plane) = Hyperplane::between(store.get(members[i]), store.get(members[j]), angular) {
        let mut left = Vec::with_capacity(n);
        let mut right = Vec::with_capacity(n);
        for &id in members.iter() {
            let margin = plane.margin(store.get(id));
            let goes_left = if margin > MARGIN_EPSILON {
                true
            } else if margin < -MARGIN_EPSILON {
                false
            } else {
                rng.random_bool(0.5)
            };
            if goes_left {
                left.push(id);
            } else {
                right.push(id);
            }
        }
        if !left.is_empty() && !right.is_empty() {
            let n_left = left.len();
            members[..n_left].copy_from_slice(&left);
            members[n_left..].copy_from_slice(&right);
            return (Some(plane), n_left);
        }
    }

    members.shuffle(rng);
    (None, n / 2)
}

#[inline]
fn tree_seed(seed: u64, tree: usize) -> u64 {
    seed.wrapping_add(0x9E37_79B9_7F4A_7C15u64.wrapping_mul(tree as u64 + 1))
}

/// Ensemble of independently seeded trees.
#[derive(Debug, Clone, PartialEq)]
pub struct RpForest {
    trees: Vec<RpTree>,
}

impl RpForest {
    /// Build `n_trees` trees in parallel.
    ///
    /// Tree `t` draws from its own RNG seeded from `(seed, t)`, so the forest
    /// is identical for a given seed whatever the thread count.
    pub fn build(
        store: &PointStore,
        n_trees: usize,
        leaf_size: usize,
        angular: bool,
        seed: u64,
        cancel: Option<&CancelToken>,
    ) -> Result<Self> {
        let trees = (0..n_trees)
            .into_par_iter()
            .map(|t| -> Result<RpTree> {
                cancel::check(cancel)?;
                let mut rng = StdRng::seed_from_u64(tree_seed(seed, t));
                Ok(RpTree::build(store, leaf_size, angular, &mut rng))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { trees })
    }

    pub fn trees(&self) -> &[RpTree] {
        &self.trees
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Every leaf of every tree.
    pub fn leaves(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.trees.iter().flat_map(RpTree::leaves)
    }

    pub fn memory_bytes(&self) -> usize {
        self.trees.iter().map(RpTree::memory_bytes).sum()
    }
}
