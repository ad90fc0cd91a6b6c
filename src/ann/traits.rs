//! Unified trait for k-NN indexes.

use crate::benchmark::exact::ExactIndex;
use crate::point::{PointDescriptor, PointRef};
use crate::{NNDescentIndex, RetrieveError};

/// Common surface of the approximate index and the brute-force baseline, so
/// benchmarks and tests can run the same workload against both.
pub trait ANNIndex {
    /// Add a point, returning its id.
    fn add(&mut self, point: PointRef<'_>) -> Result<u32, RetrieveError>;

    /// Build the index (required before search).
    fn build(&mut self) -> Result<(), RetrieveError>;

    /// Search for k nearest neighbors.
    fn search(&self, query: PointRef<'_>, k: usize) -> Result<Vec<(u32, f32)>, RetrieveError>;

    /// Get index size in bytes (approximate).
    fn size_bytes(&self) -> usize;

    /// Get index statistics.
    fn stats(&self) -> ANNStats;

    /// Kind and dimensionality of the indexed points.
    fn descriptor(&self) -> PointDescriptor;

    /// Get number of points.
    fn num_points(&self) -> usize;
}

/// Statistics about an ANN index.
#[derive(Debug, Clone)]
pub struct ANNStats {
    pub num_points: usize,
    pub descriptor: PointDescriptor,
    pub size_bytes: usize,
    pub algorithm: String,
}

impl ANNIndex for NNDescentIndex {
    fn add(&mut self, point: PointRef<'_>) -> Result<u32, RetrieveError> {
        self.add_ref(point)
    }

    fn build(&mut self) -> Result<(), RetrieveError> {
        self.build()
    }

    /// Uses the exploration width from the index's default search parameters.
    fn search(&self, query: PointRef<'_>, k: usize) -> Result<Vec<(u32, f32)>, RetrieveError> {
        let mut params = self.params().search.clone();
        params.exploration_width = params.exploration_width.max(k);
        self.search_with(query, k, &params)
    }

    fn size_bytes(&self) -> usize {
        self.memory_bytes()
    }

    fn stats(&self) -> ANNStats {
        ANNStats {
            num_points: self.len(),
            descriptor: self.descriptor(),
            size_bytes: self.memory_bytes(),
            algorithm: "NN-Descent".to_string(),
        }
    }

    fn descriptor(&self) -> PointDescriptor {
        self.descriptor()
    }

    fn num_points(&self) -> usize {
        self.len()
    }
}

impl ANNIndex for ExactIndex {
    fn add(&mut self, point: PointRef<'_>) -> Result<u32, RetrieveError> {
        self.add(point)
    }

    fn build(&mut self) -> Result<(), RetrieveError> {
        Ok(())
    }

    fn search(&self, query: PointRef<'_>, k: usize) -> Result<Vec<(u32, f32)>, RetrieveError> {
        self.search(query, k)
    }

    fn size_bytes(&self) -> usize {
        self.store().memory_bytes()
    }

    fn stats(&self) -> ANNStats {
        ANNStats {
            num_points: self.len(),
            descriptor: self.store().descriptor(),
            size_bytes: self.store().memory_bytes(),
            algorithm: "Exact".to_string(),
        }
    }

    fn descriptor(&self) -> PointDescriptor {
        self.store().descriptor()
    }

    fn num_points(&self) -> usize {
        self.len()
    }
}
