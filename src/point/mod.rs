//! Point representations and the point store.
//!
//! A point is either dense (a fixed-length coordinate slice) or sparse
//! (strictly increasing coordinate indices with their values; everything else
//! is implicitly zero). One index holds one kind only, and nothing in this
//! crate ever converts a sparse point to a dense array on the build or query
//! path. [`PointRef::to_dense`] exists for tests and ground-truth tooling.
//!
//! ```rust
//! use nndescent::point::{Point, PointKind, SparseVector};
//!
//! let p = Point::Sparse(SparseVector::new(1000, vec![3, 17], vec![0.5, 1.5])?);
//! assert_eq!(p.as_ref().kind(), PointKind::Sparse);
//! assert_eq!(p.as_ref().nnz(), 2);
//! # Ok::<(), nndescent::RetrieveError>(())
//! ```

mod csr;
mod store;

pub use csr::CsrMatrix;
pub use store::PointStore;

use crate::distance::Metric;
use crate::{Result, RetrieveError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Representation kind of the points held by an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    Dense,
    Sparse,
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointKind::Dense => f.write_str("dense"),
            PointKind::Sparse => f.write_str("sparse"),
        }
    }
}

/// Representation kind plus dimensionality.
///
/// For dense stores `dimension` is the exact coordinate count; for sparse
/// stores it is the declared upper bound on coordinate indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointDescriptor {
    pub kind: PointKind,
    pub dimension: usize,
}

/// Borrowed sparse vector: parallel `indices`/`values` slices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseRef<'a> {
    pub indices: &'a [u32],
    pub values: &'a [f32],
}

/// Borrowed view of one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointRef<'a> {
    Dense(&'a [f32]),
    Sparse(SparseRef<'a>),
}

impl<'a> PointRef<'a> {
    /// Sparse view over borrowed buffers (not validated).
    #[inline]
    pub fn sparse(indices: &'a [u32], values: &'a [f32]) -> Self {
        PointRef::Sparse(SparseRef { indices, values })
    }

    #[inline]
    pub fn kind(&self) -> PointKind {
        match self {
            PointRef::Dense(_) => PointKind::Dense,
            PointRef::Sparse(_) => PointKind::Sparse,
        }
    }

    /// Number of stored values (coordinate count for dense points).
    #[inline]
    pub fn nnz(&self) -> usize {
        match self {
            PointRef::Dense(v) => v.len(),
            PointRef::Sparse(s) => s.values.len(),
        }
    }

    /// Whether every stored value is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            PointRef::Dense(v) => v.iter().all(|x| x.is_finite()),
            PointRef::Sparse(s) => s.values.iter().all(|x| x.is_finite()),
        }
    }

    /// Distance to `other` under `metric`.
    #[inline]
    pub fn distance_to(self, other: PointRef<'_>, metric: Metric, dimension: usize) -> f32 {
        metric.distance(self, other, dimension)
    }

    /// Materialize a dense copy. Never used by the index itself.
    pub fn to_dense(&self, dimension: usize) -> Vec<f32> {
        match self {
            PointRef::Dense(v) => v.to_vec(),
            PointRef::Sparse(s) => {
                let mut out = vec![0.0; dimension];
                for (&i, &v) in s.indices.iter().zip(s.values) {
                    out[i as usize] = v;
                }
                out
            }
        }
    }
}

/// Owned sparse vector with a declared dimensionality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    dimension: usize,
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl SparseVector {
    /// Create a validated sparse vector.
    pub fn new(dimension: usize, indices: Vec<u32>, values: Vec<f32>) -> Result<Self> {
        validate_sparse(&indices, &values, dimension)?;
        Ok(Self {
            dimension,
            indices,
            values,
        })
    }

    /// Build from `(index, value)` pairs in any order. Zeros are dropped.
    pub fn from_pairs(dimension: usize, mut pairs: Vec<(u32, f32)>) -> Result<Self> {
        pairs.retain(|&(_, v)| v != 0.0);
        pairs.sort_by_key(|&(i, _)| i);
        let (indices, values) = pairs.into_iter().unzip();
        Self::new(dimension, indices, values)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn as_ref(&self) -> PointRef<'_> {
        PointRef::sparse(&self.indices, &self.values)
    }
}

/// Owned point, dense or sparse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Point {
    Dense(Vec<f32>),
    Sparse(SparseVector),
}

impl Point {
    pub fn as_ref(&self) -> PointRef<'_> {
        match self {
            Point::Dense(v) => PointRef::Dense(v),
            Point::Sparse(s) => s.as_ref(),
        }
    }

    /// Dense length, or the declared dimensionality of a sparse point.
    pub fn dimension(&self) -> usize {
        match self {
            Point::Dense(v) => v.len(),
            Point::Sparse(s) => s.dimension,
        }
    }

    pub fn descriptor(&self) -> PointDescriptor {
        PointDescriptor {
            kind: self.as_ref().kind(),
            dimension: self.dimension(),
        }
    }
}

impl From<Vec<f32>> for Point {
    fn from(v: Vec<f32>) -> Self {
        Point::Dense(v)
    }
}

impl From<SparseVector> for Point {
    fn from(v: SparseVector) -> Self {
        Point::Sparse(v)
    }
}

/// Check the sparse invariants: aligned buffers, strictly increasing indices,
/// every index below `dimension`.
pub(crate) fn validate_sparse(indices: &[u32], values: &[f32], dimension: usize) -> Result<()> {
    if indices.len() != values.len() {
        return Err(RetrieveError::InvalidSparseVector(format!(
            "{} indices but {} values",
            indices.len(),
            values.len()
        )));
    }
    if let Some(pos) = indices.windows(2).position(|w| w[0] >= w[1]) {
        return Err(RetrieveError::InvalidSparseVector(format!(
            "indices must be strictly increasing (position {}: {} then {})",
            pos + 1,
            indices[pos],
            indices[pos + 1]
        )));
    }
    if let Some(&last) = indices.last() {
        if last as usize >= dimension {
            return Err(RetrieveError::DimensionMismatch {
                query_dim: last as usize + 1,
                doc_dim: dimension,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_vector_rejects_unsorted_indices() {
        let err = SparseVector::new(10, vec![3, 1], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, RetrieveError::InvalidSparseVector(_)));
    }

    #[test]
    fn sparse_vector_rejects_duplicate_indices() {
        let err = SparseVector::new(10, vec![1, 1], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, RetrieveError::InvalidSparseVector(_)));
    }

    #[test]
    fn sparse_vector_rejects_out_of_range_index() {
        let err = SparseVector::new(4, vec![0, 4], vec![1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            RetrieveError::DimensionMismatch {
                query_dim: 5,
                doc_dim: 4
            }
        );
    }

    #[test]
    fn from_pairs_sorts_and_drops_zeros() {
        let v = SparseVector::from_pairs(8, vec![(5, 1.0), (2, 0.0), (1, 3.0)]).unwrap();
        assert_eq!(v.indices(), &[1, 5]);
        assert_eq!(v.values(), &[3.0, 1.0]);
    }

    #[test]
    fn to_dense_places_values() {
        let v = SparseVector::new(5, vec![1, 3], vec![2.0, 4.0]).unwrap();
        assert_eq!(v.as_ref().to_dense(5), vec![0.0, 2.0, 0.0, 4.0, 0.0]);
    }
}
