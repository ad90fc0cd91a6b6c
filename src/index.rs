//! The NN-Descent index: ingestion, build, queries.

use crate::cancel::CancelToken;
use crate::distance::Metric;
use crate::forest::RpForest;
use crate::graph::{KnnGraph, SearchGraph};
use crate::nndescent::{self, BuildStats, NNDescentParams};
use crate::point::{CsrMatrix, Point, PointDescriptor, PointKind, PointRef, PointStore};
use crate::search::{SearchContext, SearchParams, SearchStats};
use crate::{Result, RetrieveError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Approximate k-NN index over dense or sparse points.
///
/// Lifecycle: add points, [`build`](Self::build) once, then query from any
/// number of threads. Points are read-only after the build; a failed or
/// cancelled build leaves the index unbuilt.
///
/// ```rust
/// use nndescent::{NNDescentIndex, NNDescentParams, PointRef};
///
/// let params = NNDescentParams { k: 4, leaf_size: 8, ..Default::default() };
/// let mut index = NNDescentIndex::dense(2, params)?;
/// for i in 0..50 {
///     index.add_dense(&[i as f32, (i % 7) as f32])?;
/// }
/// index.build()?;
/// let hits = index.search(PointRef::Dense(&[10.0, 3.0]), 3, 32)?;
/// assert_eq!(hits[0].0, 10);
/// # Ok::<(), nndescent::RetrieveError>(())
/// ```
#[derive(Debug)]
pub struct NNDescentIndex {
    params: NNDescentParams,
    store: PointStore,
    built: Option<Frozen>,
}

#[derive(Debug)]
struct Frozen {
    knn: KnnGraph,
    search_graph: SearchGraph,
    forest: RpForest,
    stats: BuildStats,
    query_evaluations: AtomicU64,
}

/// Size and shape of an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub num_points: usize,
    pub kind: PointKind,
    pub dimension: usize,
    /// Stored values: non-zeros for sparse, `n · dimension` for dense.
    pub nnz: usize,
    pub k: usize,
    pub metric: Metric,
    pub built: bool,
    pub knn_edges: usize,
    pub search_edges: usize,
    pub forest_trees: usize,
    /// Distance evaluations made by queries since the build.
    pub query_distance_computations: u64,
    /// Points, graphs and forest together.
    pub memory_bytes: usize,
}

impl NNDescentIndex {
    /// Empty index for points described by `descriptor`.
    ///
    /// Fails with [`RetrieveError::UnsupportedMetric`] if the metric has no
    /// kernel for that kind.
    pub fn new(descriptor: PointDescriptor, params: NNDescentParams) -> Result<Self> {
        params.metric.check_supports(descriptor.kind)?;
        Ok(Self {
            store: PointStore::with_descriptor(descriptor)?,
            params,
            built: None,
        })
    }

    pub fn dense(dimension: usize, params: NNDescentParams) -> Result<Self> {
        Self::new(
            PointDescriptor {
                kind: PointKind::Dense,
                dimension,
            },
            params,
        )
    }

    pub fn sparse(dimension: usize, params: NNDescentParams) -> Result<Self> {
        Self::new(
            PointDescriptor {
                kind: PointKind::Sparse,
                dimension,
            },
            params,
        )
    }

    /// Index over the rows of a validated CSR matrix, without copying them.
    pub fn from_csr(matrix: CsrMatrix, params: NNDescentParams) -> Result<Self> {
        params.metric.check_supports(PointKind::Sparse)?;
        Ok(Self {
            store: PointStore::from_csr(matrix)?,
            params,
            built: None,
        })
    }

    /// Index over `points`, which must all share the first point's kind and
    /// dimensionality.
    pub fn from_points(points: &[Point], params: NNDescentParams) -> Result<Self> {
        let first = points.first().ok_or_else(|| {
            RetrieveError::Config("cannot build an index over an empty point set".into())
        })?;
        let mut index = Self::new(first.descriptor(), params)?;
        for point in points {
            index.add_ref(point.as_ref())?;
        }
        Ok(index)
    }

    pub fn add(&mut self, point: &Point) -> Result<u32> {
        self.add_ref(point.as_ref())
    }

    /// Validate and store a point, returning its id.
    pub fn add_ref(&mut self, point: PointRef<'_>) -> Result<u32> {
        if self.built.is_some() {
            return Err(RetrieveError::AlreadyBuilt);
        }
        self.store.add(point)
    }

    pub fn add_dense(&mut self, values: &[f32]) -> Result<u32> {
        self.add_ref(PointRef::Dense(values))
    }

    pub fn add_sparse(&mut self, indices: &[u32], values: &[f32]) -> Result<u32> {
        self.add_ref(PointRef::sparse(indices, values))
    }

    pub fn build(&mut self) -> Result<()> {
        self.build_inner(None)
    }

    /// Build, polling `token` between trees and between rounds.
    pub fn build_with_cancel(&mut self, token: &CancelToken) -> Result<()> {
        self.build_inner(Some(token))
    }

    fn build_inner(&mut self, cancel: Option<&CancelToken>) -> Result<()> {
        if self.built.is_some() {
            return Err(RetrieveError::AlreadyBuilt);
        }
        self.params.validate(self.store.len())?;
        self.params.metric.check_supports(self.store.kind())?;

        let store = &self.store;
        let params = &self.params;
        let run = || -> Result<Frozen> {
            let built = nndescent::build(store, params, cancel)?;
            let search_graph =
                SearchGraph::from_knn(&built.graph, store, params.metric, &params.search_graph);
            debug!(
                knn_edges = built.graph.num_edges(),
                search_edges = search_graph.num_edges(),
                "prepared search graph"
            );
            Ok(Frozen {
                knn: built.graph,
                search_graph,
                forest: built.forest,
                stats: built.stats,
                query_evaluations: AtomicU64::new(0),
            })
        };

        let frozen = match params.n_threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| RetrieveError::Config(format!("failed to start thread pool: {e}")))?
                .install(run)?,
            None => run()?,
        };
        self.built = Some(frozen);
        Ok(())
    }

    fn frozen(&self) -> Result<&Frozen> {
        self.built.as_ref().ok_or(RetrieveError::NotBuilt)
    }

    fn context<'a>(&'a self, frozen: &'a Frozen) -> SearchContext<'a> {
        SearchContext {
            store: &self.store,
            metric: self.params.metric,
            graph: &frozen.search_graph,
            forest: &frozen.forest,
            evaluations: &frozen.query_evaluations,
        }
    }

    /// Approximate `k` nearest neighbors of `query` as `(id, distance)`,
    /// closest first. `exploration_width` must be at least `k`.
    pub fn search(
        &self,
        query: PointRef<'_>,
        k: usize,
        exploration_width: usize,
    ) -> Result<Vec<(u32, f32)>> {
        let params = self.params.search.clone().with_width(exploration_width);
        self.search_with(query, k, &params)
    }

    pub fn search_with(
        &self,
        query: PointRef<'_>,
        k: usize,
        params: &SearchParams,
    ) -> Result<Vec<(u32, f32)>> {
        let frozen = self.frozen()?;
        Ok(self.context(frozen).search(query, k, params, None)?.0)
    }

    /// Like [`search_with`](Self::search_with), polling `token` at every
    /// expansion.
    pub fn search_with_cancel(
        &self,
        query: PointRef<'_>,
        k: usize,
        params: &SearchParams,
        token: &CancelToken,
    ) -> Result<Vec<(u32, f32)>> {
        let frozen = self.frozen()?;
        Ok(self.context(frozen).search(query, k, params, Some(token))?.0)
    }

    pub fn search_with_stats(
        &self,
        query: PointRef<'_>,
        k: usize,
        params: &SearchParams,
    ) -> Result<(Vec<(u32, f32)>, SearchStats)> {
        let frozen = self.frozen()?;
        self.context(frozen).search(query, k, params, None)
    }

    /// Answer every query in parallel; results keep the input order.
    ///
    /// All queries are validated before any search starts.
    pub fn search_batch(
        &self,
        queries: &[PointRef<'_>],
        k: usize,
        exploration_width: usize,
    ) -> Result<Vec<Vec<(u32, f32)>>> {
        let frozen = self.frozen()?;
        let params = self.params.search.clone().with_width(exploration_width);
        params.validate(k)?;
        for &query in queries {
            self.store.check(query)?;
        }
        let ctx = self.context(frozen);
        queries
            .par_iter()
            .map(|&query| ctx.search(query, k, &params, None).map(|(hits, _)| hits))
            .collect()
    }

    /// [`search_batch`](Self::search_batch) over owned points.
    pub fn search_points(
        &self,
        queries: &[Point],
        k: usize,
        exploration_width: usize,
    ) -> Result<Vec<Vec<(u32, f32)>>> {
        let refs: Vec<PointRef<'_>> = queries.iter().map(Point::as_ref).collect();
        self.search_batch(&refs, k, exploration_width)
    }

    /// Query with every row of a CSR matrix.
    pub fn search_csr(
        &self,
        queries: &CsrMatrix,
        k: usize,
        exploration_width: usize,
    ) -> Result<Vec<Vec<(u32, f32)>>> {
        self.frozen()?;
        if self.store.kind() != PointKind::Sparse {
            return Err(RetrieveError::Shape(format!(
                "expected {} queries, got a sparse matrix",
                self.store.kind()
            )));
        }
        if queries.n_cols() != self.store.dimension() {
            return Err(RetrieveError::DimensionMismatch {
                query_dim: queries.n_cols(),
                doc_dim: self.store.dimension(),
            });
        }
        let refs: Vec<PointRef<'_>> = queries.rows().collect();
        self.search_batch(&refs, k, exploration_width)
    }

    /// The frozen k-NN graph.
    pub fn neighbor_graph(&self) -> Result<&KnnGraph> {
        Ok(&self.frozen()?.knn)
    }

    /// Adjacency walked by queries.
    pub fn search_graph(&self) -> Result<&SearchGraph> {
        Ok(&self.frozen()?.search_graph)
    }

    pub fn build_stats(&self) -> Option<&BuildStats> {
        self.built.as_ref().map(|f| &f.stats)
    }

    /// Distance evaluations made by all queries since the build. Rejected
    /// queries add nothing.
    pub fn query_distance_computations(&self) -> u64 {
        self.built
            .as_ref()
            .map_or(0, |f| f.query_evaluations.load(Ordering::Relaxed))
    }

    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn store(&self) -> &PointStore {
        &self.store
    }

    pub fn descriptor(&self) -> PointDescriptor {
        self.store.descriptor()
    }

    pub fn metric(&self) -> Metric {
        self.params.metric
    }

    pub fn params(&self) -> &NNDescentParams {
        &self.params
    }

    pub fn memory_bytes(&self) -> usize {
        self.store.memory_bytes()
            + self.built.as_ref().map_or(0, |f| {
                f.knn.memory_bytes() + f.search_graph.memory_bytes() + f.forest.memory_bytes()
            })
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            num_points: self.store.len(),
            kind: self.store.kind(),
            dimension: self.store.dimension(),
            nnz: self.store.nnz(),
            k: self.params.k,
            metric: self.params.metric,
            built: self.is_built(),
            knn_edges: self.built.as_ref().map_or(0, |f| f.knn.num_edges()),
            search_edges: self.built.as_ref().map_or(0, |f| f.search_graph.num_edges()),
            forest_trees: self.built.as_ref().map_or(0, |f| f.forest.len()),
            query_distance_computations: self.query_distance_computations(),
            memory_bytes: self.memory_bytes(),
        }
    }
}

/// Build an index over `points` in one call.
///
/// `metric` is resolved by name (see [`Metric`]); unknown names, an empty
/// point set, `k >= n`, zero trees and `leaf_size <= 1` are all
/// [`RetrieveError::Config`] errors raised before any graph work.
pub fn build_index(
    points: &[Point],
    metric: &str,
    k: usize,
    forest_trees: usize,
    leaf_size: usize,
    seed: u64,
) -> Result<NNDescentIndex> {
    let metric: Metric = metric.parse()?;
    let params = NNDescentParams {
        k,
        metric,
        n_trees: forest_trees,
        leaf_size,
        seed,
        ..Default::default()
    };
    params.validate(points.len())?;
    let mut index = NNDescentIndex::from_points(points, params)?;
    index.build()?;
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> NNDescentParams {
        NNDescentParams {
            k: 4,
            leaf_size: 6,
            n_trees: 3,
            ..Default::default()
        }
    }

    fn grid_index() -> NNDescentIndex {
        let mut index = NNDescentIndex::dense(2, small_params()).unwrap();
        for i in 0..64 {
            index.add_dense(&[(i % 8) as f32, (i / 8) as f32]).unwrap();
        }
        index
    }

    #[test]
    fn query_before_build_is_not_built() {
        let index = grid_index();
        assert_eq!(
            index.search(PointRef::Dense(&[0.0, 0.0]), 1, 8).unwrap_err(),
            RetrieveError::NotBuilt
        );
        assert!(matches!(index.neighbor_graph(), Err(RetrieveError::NotBuilt)));
    }

    #[test]
    fn add_after_build_is_rejected() {
        let mut index = grid_index();
        index.build().unwrap();
        assert_eq!(index.add_dense(&[1.0, 1.0]), Err(RetrieveError::AlreadyBuilt));
        assert_eq!(index.build(), Err(RetrieveError::AlreadyBuilt));
    }

    #[test]
    fn finds_grid_point() {
        let mut index = grid_index();
        index.build().unwrap();
        let hits = index.search(PointRef::Dense(&[3.0, 5.0]), 1, 16).unwrap();
        assert_eq!(hits, vec![(43, 0.0)]);
        let stats = index.stats();
        assert!(stats.built);
        assert_eq!(stats.num_points, 64);
        assert!(stats.knn_edges <= 64 * 4);
    }

    #[test]
    fn dedicated_pool_matches_global_pool() {
        let mut a = grid_index();
        a.build().unwrap();
        let mut b = NNDescentIndex::dense(
            2,
            NNDescentParams {
                n_threads: Some(2),
                ..small_params()
            },
        )
        .unwrap();
        for i in 0..64 {
            b.add_dense(&[(i % 8) as f32, (i / 8) as f32]).unwrap();
        }
        b.build().unwrap();
        assert_eq!(a.neighbor_graph().unwrap(), b.neighbor_graph().unwrap());
    }

    #[test]
    fn correlation_rejected_for_sparse() {
        let params = NNDescentParams {
            metric: Metric::Correlation,
            ..small_params()
        };
        let err = NNDescentIndex::sparse(100, params).unwrap_err();
        assert!(matches!(err, RetrieveError::UnsupportedMetric { .. }));
    }

    #[test]
    fn index_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NNDescentIndex>();
    }
}
