//! Graph-guided best-first query search.
//!
//! # Algorithm
//!
//! 1. Seed the frontier with entry points (forest leaf members and/or seeded
//!    random points, see [`SeedStrategy`]).
//! 2. Pop the closest unexpanded candidate and compute the query distance to
//!    each of its unvisited graph neighbors. Neighbors that beat the current
//!    worst retained result join both the frontier and the result set, which
//!    is capped at `exploration_width`.
//! 3. Stop when
//!    - the frontier is empty, or
//!    - the popped candidate is farther than `(1 + epsilon)` times the worst
//!      retained result (and the result set is full), or
//!    - `patience` consecutive expansions left the k-th best distance
//!      unchanged.
//!
//! Larger `exploration_width` raises recall and latency together.
//!
//! The query's kind and dimensionality are validated against the store before
//! any distance is computed; dense queries never reach a sparse index.

use crate::cancel::{self, CancelToken};
use crate::distance::Metric;
use crate::forest::RpForest;
use crate::graph::SearchGraph;
use crate::point::{PointRef, PointStore};
use crate::{Result, RetrieveError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::sync::atomic::{self, AtomicU64};

/// Where a query starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedStrategy {
    /// `count` seeded random points.
    Random { count: usize },
    /// Members of the leaf the query falls into, in the first `trees` trees.
    ForestLeaves { trees: usize },
    /// Forest leaves topped up with `random` random points.
    Hybrid { trees: usize, random: usize },
}

impl Default for SeedStrategy {
    fn default() -> Self {
        SeedStrategy::Hybrid {
            trees: 4,
            random: 8,
        }
    }
}

/// Query-time parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Result-set bound; must be at least `k`.
    pub exploration_width: usize,
    /// Slack on the frontier stopping rule. `0.0` is plain beam search.
    pub epsilon: f32,
    /// Expansions without k-th best improvement before giving up.
    pub patience: usize,
    pub seeds: SeedStrategy,
    /// Seed for random entry points. Same seed, same results.
    pub seed: u64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            exploration_width: 64,
            epsilon: 0.1,
            patience: 32,
            seeds: SeedStrategy::default(),
            seed: 0,
        }
    }
}

impl SearchParams {
    pub fn fast() -> Self {
        Self {
            exploration_width: 32,
            epsilon: 0.0,
            patience: 8,
            seeds: SeedStrategy::Hybrid {
                trees: 1,
                random: 8,
            },
            ..Default::default()
        }
    }

    pub fn high_quality() -> Self {
        Self {
            exploration_width: 200,
            epsilon: 0.2,
            patience: 64,
            seeds: SeedStrategy::Hybrid {
                trees: 8,
                random: 16,
            },
            ..Default::default()
        }
    }

    pub fn with_width(mut self, exploration_width: usize) -> Self {
        self.exploration_width = exploration_width;
        self
    }

    /// Checks that do not depend on `k`.
    pub(crate) fn validate_defaults(&self) -> Result<()> {
        if self.exploration_width == 0 {
            return Err(RetrieveError::Config("exploration_width must be greater than 0".into()));
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(RetrieveError::Config(format!(
                "epsilon must be finite and non-negative, got {}",
                self.epsilon
            )));
        }
        if self.patience == 0 {
            return Err(RetrieveError::Config("patience must be greater than 0".into()));
        }
        let seeds = match self.seeds {
            SeedStrategy::Random { count } => count,
            SeedStrategy::ForestLeaves { trees } => trees,
            SeedStrategy::Hybrid { trees, random } => trees + random,
        };
        if seeds == 0 {
            return Err(RetrieveError::Config("seed strategy selects no entry points".into()));
        }
        Ok(())
    }

    pub(crate) fn validate(&self, k: usize) -> Result<()> {
        if k == 0 {
            return Err(RetrieveError::Config("k must be greater than 0".into()));
        }
        self.validate_defaults()?;
        if self.exploration_width < k {
            return Err(RetrieveError::Config(format!(
                "exploration_width ({}) must be at least k ({k})",
                self.exploration_width
            )));
        }
        Ok(())
    }
}

/// Work done by one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Frontier pops whose neighbors were scanned.
    pub expansions: usize,
    pub distance_computations: usize,
    /// Distinct points reached.
    pub visited: usize,
}

/// Frontier entry: min-heap on `(distance, id)`.
#[derive(Debug, PartialEq)]
struct MinCandidate {
    id: u32,
    distance: f32,
}

impl Eq for MinCandidate {}

impl Ord for MinCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for MinCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Result entry: max-heap on `(distance, id)`, worst on top.
#[derive(Debug, PartialEq)]
struct MaxResult {
    id: u32,
    distance: f32,
}

impl Eq for MaxResult {}

impl Ord for MaxResult {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for MaxResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded max-heap of the best results so far.
struct Bounded {
    cap: usize,
    heap: BinaryHeap<MaxResult>,
}

impl Bounded {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            heap: BinaryHeap::with_capacity(cap + 1),
        }
    }

    fn is_full(&self) -> bool {
        self.heap.len() >= self.cap
    }

    /// Worst retained distance, infinite until full.
    fn worst(&self) -> f32 {
        if self.is_full() {
            self.heap.peek().map_or(f32::INFINITY, |r| r.distance)
        } else {
            f32::INFINITY
        }
    }

    fn admits(&self, id: u32, distance: f32) -> bool {
        match self.heap.peek() {
            Some(top) if self.is_full() => {
                MaxResult { id, distance }.cmp(top) == Ordering::Less
            }
            _ => true,
        }
    }

    fn push(&mut self, id: u32, distance: f32) -> bool {
        if !self.admits(id, distance) {
            return false;
        }
        self.heap.push(MaxResult { id, distance });
        if self.heap.len() > self.cap {
            self.heap.pop();
        }
        true
    }

    fn into_sorted(self) -> Vec<(u32, f32)> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|r| (r.id, r.distance))
            .collect()
    }
}

/// Read-only view the query engine walks.
pub(crate) struct SearchContext<'a> {
    pub store: &'a PointStore,
    pub metric: Metric,
    pub graph: &'a SearchGraph,
    pub forest: &'a RpForest,
    /// Running count of query distance evaluations, shared across queries.
    pub evaluations: &'a AtomicU64,
}

impl SearchContext<'_> {
    #[inline]
    fn distance(&self, query: PointRef<'_>, id: u32) -> f32 {
        self.evaluations.fetch_add(1, atomic::Ordering::Relaxed);
        self.metric
            .distance(query, self.store.get(id), self.store.dimension())
    }

    /// Entry points for `query`, deduplicated, in a deterministic order.
    fn entry_points(&self, query: PointRef<'_>, params: &SearchParams) -> Vec<u32> {
        let (trees, random) = match params.seeds {
            SeedStrategy::Random { count } => (0, count),
            SeedStrategy::ForestLeaves { trees } => (trees, 0),
            SeedStrategy::Hybrid { trees, random } => (trees, random),
        };
        let n = self.store.len() as u32;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for tree in self.forest.trees().iter().take(trees) {
            for &id in tree.search_leaf(query) {
                if seen.insert(id) {
                    out.push(id);
                }
            }
        }
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut draws = 0;
        let target = out.len() + random.min(n as usize);
        while out.len() < target && draws < 4 * random.max(1) {
            draws += 1;
            let id = rng.random_range(0..n);
            if seen.insert(id) {
                out.push(id);
            }
        }
        if out.is_empty() && n > 0 {
            out.push(0);
        }
        out
    }

    /// Approximate `k` nearest neighbors of `query`, closest first.
    pub(crate) fn search(
        &self,
        query: PointRef<'_>,
        k: usize,
        params: &SearchParams,
        cancel: Option<&CancelToken>,
    ) -> Result<(Vec<(u32, f32)>, SearchStats)> {
        params.validate(k)?;
        self.store.check(query)?;
        if !query.is_finite() {
            return Err(RetrieveError::Config("query contains non-finite values".into()));
        }

        let width = params.exploration_width;
        let slack = 1.0 + params.epsilon;
        let mut stats = SearchStats::default();
        let mut visited: HashSet<u32> = HashSet::with_capacity(width * 4);
        let mut frontier: BinaryHeap<MinCandidate> = BinaryHeap::with_capacity(width * 2);
        let mut results = Bounded::new(width);
        let mut best = Bounded::new(k);

        for id in self.entry_points(query, params) {
            visited.insert(id);
            let distance = self.distance(query, id);
            stats.distance_computations += 1;
            if results.push(id, distance) {
                frontier.push(MinCandidate { id, distance });
                best.push(id, distance);
            }
        }

        let mut stale = 0usize;
        while let Some(candidate) = frontier.pop() {
            cancel::check(cancel)?;
            if results.is_full() && candidate.distance > slack * results.worst() {
                break;
            }
            stats.expansions += 1;
            let kth_before = best.worst();

            for &nb in self.graph.neighbors(candidate.id) {
                if !visited.insert(nb) {
                    continue;
                }
                let distance = self.distance(query, nb);
                stats.distance_computations += 1;
                if results.push(nb, distance) {
                    frontier.push(MinCandidate { id: nb, distance });
                    best.push(nb, distance);
                }
            }

            if best.worst() < kth_before {
                stale = 0;
            } else {
                stale += 1;
                if stale >= params.patience {
                    break;
                }
            }
        }

        stats.visited = visited.len();
        let mut out = results.into_sorted();
        out.truncate(k);
        Ok((out, stats))
    }
}
