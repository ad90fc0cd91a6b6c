//! NN-Descent k-NN graph construction.
//!
//! Dong, Moses & Li, "Efficient K-Nearest Neighbor Graph Construction for
//! Generic Similarity Measures" (WWW 2011).
//!
//! # Algorithm
//!
//! A neighbor of a neighbor is likely to be a neighbor. Starting from a rough
//! graph, every round:
//!
//! 1. Each point `p` gathers candidates from its forward list and from the
//!    points that list `p` (reverse neighbors), split into "new" entries that
//!    have not been joined yet and "old" ones.
//! 2. A local join at `p` compares every new candidate with every other new
//!    candidate and with every old one. A pair `(u, v)` that beats the current
//!    worst entry of `u` or `v` is proposed to both lists.
//! 3. The number of proposals that actually changed a list is the convergence
//!    signal `c`.
//!
//! The loop ends when `c < delta · n · K` or after `max_rounds`.
//!
//! # Initialisation
//!
//! The starting graph comes from a random projection forest ([`crate::forest`]):
//! all pairs within each leaf are offered to both endpoints. Lists still short
//! of `K` afterwards are topped up with seeded random points.
//!
//! # Parallelism and determinism
//!
//! Joins run in parallel over anchors against an immutable snapshot of the
//! lists. Proposals are then bucketed by target point and each list is updated
//! by a single task, in `(distance, id)` order. Since list admission depends
//! only on that order, the graph is identical for a fixed seed whatever the
//! number of threads.

mod candidates;
mod init;
mod refine;

use crate::cancel::{self, CancelToken};
use crate::distance::Metric;
use crate::forest::RpForest;
use crate::graph::{KnnGraph, SearchGraphParams};
use crate::point::PointStore;
use crate::search::SearchParams;
use crate::{Result, RetrieveError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Build configuration for [`crate::NNDescentIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NNDescentParams {
    /// Neighbors kept per point (`K`). Must satisfy `0 < K < n`.
    pub k: usize,
    pub metric: Metric,
    /// Trees in the initialisation forest.
    pub n_trees: usize,
    /// Maximum points per forest leaf. Must satisfy `1 < leaf_size < n`.
    pub leaf_size: usize,
    /// Seed for every random choice made during the build.
    pub seed: u64,
    /// Hard cap on refinement rounds. `None` means `max(5, round(log2 n))`.
    pub max_rounds: Option<usize>,
    /// Stop once a round makes fewer than `delta · n · K` updates.
    pub delta: f32,
    /// Per-point cap on the new and old candidate sets of a round.
    /// `None` means `min(60, K)`.
    pub max_candidates: Option<usize>,
    /// Top up lists left short by the forest with random points.
    pub fill_random: bool,
    /// Build on a dedicated pool of this many threads instead of the global
    /// rayon pool.
    pub n_threads: Option<usize>,
    /// Query graph preparation.
    pub search_graph: SearchGraphParams,
    /// Defaults for queries.
    pub search: SearchParams,
}

impl Default for NNDescentParams {
    fn default() -> Self {
        Self {
            k: 15,
            metric: Metric::Euclidean,
            n_trees: 8,
            leaf_size: 30,
            seed: 42,
            max_rounds: None,
            delta: 0.001,
            max_candidates: None,
            fill_random: true,
            n_threads: None,
            search_graph: SearchGraphParams::default(),
            search: SearchParams::default(),
        }
    }
}

impl NNDescentParams {
    /// Fewer trees and rounds; lower graph quality.
    pub fn fast() -> Self {
        Self {
            n_trees: 4,
            max_rounds: Some(5),
            delta: 0.01,
            max_candidates: Some(20),
            search: SearchParams::fast(),
            ..Default::default()
        }
    }

    /// More trees, wider candidate sets and a tighter convergence test.
    pub fn high_quality() -> Self {
        Self {
            n_trees: 16,
            delta: 0.0005,
            max_candidates: Some(60),
            search: SearchParams::high_quality(),
            ..Default::default()
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every parameter against a store of `n` points.
    pub fn validate(&self, n: usize) -> Result<()> {
        if n == 0 {
            return Err(RetrieveError::Config("cannot build an index over an empty point set".into()));
        }
        if self.k == 0 {
            return Err(RetrieveError::Config("k must be greater than 0".into()));
        }
        if self.k >= n {
            return Err(RetrieveError::Config(format!(
                "k ({}) must be less than the number of points ({n})",
                self.k
            )));
        }
        if self.n_trees == 0 {
            return Err(RetrieveError::Config("n_trees must be greater than 0".into()));
        }
        if self.leaf_size <= 1 {
            return Err(RetrieveError::Config(format!(
                "leaf_size ({}) must be greater than 1",
                self.leaf_size
            )));
        }
        if self.leaf_size >= n {
            return Err(RetrieveError::Config(format!(
                "leaf_size ({}) must be less than the number of points ({n})",
                self.leaf_size
            )));
        }
        if !(self.delta.is_finite() && self.delta >= 0.0) {
            return Err(RetrieveError::Config(format!(
                "delta must be finite and non-negative, got {}",
                self.delta
            )));
        }
        if self.max_rounds == Some(0) {
            return Err(RetrieveError::Config("max_rounds must be greater than 0".into()));
        }
        if self.max_candidates == Some(0) {
            return Err(RetrieveError::Config("max_candidates must be greater than 0".into()));
        }
        if self.n_threads == Some(0) {
            return Err(RetrieveError::Config("n_threads must be greater than 0".into()));
        }
        if !(self.search_graph.degree_multiplier.is_finite() && self.search_graph.degree_multiplier >= 1.0) {
            return Err(RetrieveError::Config(format!(
                "degree_multiplier must be at least 1, got {}",
                self.search_graph.degree_multiplier
            )));
        }
        self.search.validate_defaults()
    }

    pub(crate) fn resolved_max_rounds(&self, n: usize) -> usize {
        self.max_rounds
            .unwrap_or_else(|| ((n as f64).log2().round() as usize).max(5))
    }

    pub(crate) fn resolved_max_candidates(&self) -> usize {
        self.max_candidates.unwrap_or_else(|| self.k.min(60))
    }
}

/// What happened during a build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Refinement rounds run.
    pub rounds: usize,
    /// Successful list insertions per round.
    pub updates_per_round: Vec<usize>,
    /// `true` if the update count fell below the threshold before the round cap.
    pub converged: bool,
    /// Insertions made while seeding from the forest.
    pub forest_updates: usize,
    /// Pairwise distance evaluations, forest seeding included.
    pub distance_evaluations: u64,
    /// Lists that held fewer than `K` entries after the build.
    pub underfilled: usize,
    pub elapsed_ms: u128,
}

/// Output of a successful build.
pub(crate) struct Built {
    pub graph: KnnGraph,
    pub forest: RpForest,
    pub stats: BuildStats,
}

/// Checked, counted pairwise distances between stored points.
pub(crate) struct Oracle<'a> {
    store: &'a PointStore,
    metric: Metric,
    evaluations: AtomicU64,
}

impl<'a> Oracle<'a> {
    pub(crate) fn new(store: &'a PointStore, metric: Metric) -> Self {
        Self {
            store,
            metric,
            evaluations: AtomicU64::new(0),
        }
    }

    /// Distance between two stored points.
    ///
    /// A NaN, infinite or negative value aborts the build. The error names the
    /// point holding non-finite data if there is one, else `a`.
    pub(crate) fn distance(&self, a: u32, b: u32) -> Result<f32> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        let d = self
            .metric
            .distance(self.store.get(a), self.store.get(b), self.store.dimension());
        if d.is_finite() && d >= 0.0 {
            return Ok(d);
        }
        let point_id = self.store.first_non_finite(&[a, b]).unwrap_or(a);
        Err(RetrieveError::Build {
            point_id,
            reason: format!("{} distance between {a} and {b} is {d}", self.metric),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.store.len()
    }

    pub(crate) fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }
}

/// Stateless 64-bit mixer (splitmix64 finaliser).
#[inline]
pub(crate) fn mix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Build the forest and the refined k-NN graph for `store`.
///
/// `params` must already be validated against `store`.
pub(crate) fn build(
    store: &PointStore,
    params: &NNDescentParams,
    cancel: Option<&CancelToken>,
) -> Result<Built> {
    let start = Instant::now();
    let n = store.len();
    let k = params.k;
    info!(
        n,
        k,
        metric = %params.metric,
        n_trees = params.n_trees,
        leaf_size = params.leaf_size,
        "building NN-Descent index"
    );

    let forest = RpForest::build(
        store,
        params.n_trees,
        params.leaf_size,
        params.metric.is_angular(),
        params.seed,
        cancel,
    )
    .inspect_err(|e| warn!(error = %e, "forest build aborted"))?;

    let oracle = Oracle::new(store, params.metric);
    let mut lists = init::seed_from_forest(&forest, &oracle, k, cancel)?;
    let forest_updates: usize = lists.iter().map(|l| l.len()).sum();
    if params.fill_random {
        init::fill_random(&mut lists, &oracle, params.seed)?;
    }
    debug!(
        forest_updates,
        evaluations = oracle.evaluations(),
        "seeded graph from forest"
    );

    let max_rounds = params.resolved_max_rounds(n);
    let max_candidates = params.resolved_max_candidates();
    let threshold = params.delta as f64 * n as f64 * k as f64;
    let mut stats = BuildStats {
        forest_updates,
        ..Default::default()
    };

    for round in 0..max_rounds {
        if let Err(e) = cancel::check(cancel) {
            warn!(round, "build cancelled");
            return Err(e);
        }
        let cands = candidates::sample(&mut lists, max_candidates, params.seed, round as u64);
        let updates = refine::round(&mut lists, &cands, &oracle)?;
        stats.rounds += 1;
        stats.updates_per_round.push(updates);
        debug!(round, updates, threshold, "refinement round");
        if (updates as f64) < threshold || updates == 0 {
            stats.converged = true;
            break;
        }
    }
    if !stats.converged {
        warn!(max_rounds, "NN-Descent hit the round cap before converging");
    }

    stats.underfilled = lists.iter().filter(|l| l.len() < k).count();
    stats.distance_evaluations = oracle.evaluations();
    let graph = KnnGraph::freeze(k, lists)?;
    stats.elapsed_ms = start.elapsed().as_millis();
    info!(
        rounds = stats.rounds,
        converged = stats.converged,
        evaluations = stats.distance_evaluations,
        elapsed_ms = stats.elapsed_ms as u64,
        "NN-Descent build finished"
    );

    Ok(Built {
        graph,
        forest,
        stats,
    })
}
