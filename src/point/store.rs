//! Arena storage for the indexed points.

use super::{validate_sparse, CsrMatrix, PointDescriptor, PointKind, PointRef, SparseRef};
use crate::{Result, RetrieveError};

/// Owns every coordinate of every indexed point.
///
/// Dense points live in one flat row-major buffer (SoA layout, like the graph
/// indexes elsewhere in the crate); sparse points live in CSR buffers. Other
/// components refer to points by `u32` id and borrow views through
/// [`PointStore::get`].
#[derive(Debug, Clone)]
pub struct PointStore {
    dimension: usize,
    storage: Storage,
}

#[derive(Debug, Clone)]
enum Storage {
    Dense {
        data: Vec<f32>,
    },
    Sparse {
        indptr: Vec<usize>,
        indices: Vec<u32>,
        values: Vec<f32>,
    },
}

impl PointStore {
    /// Empty store for dense points of exactly `dimension` coordinates.
    pub fn dense(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RetrieveError::Config("dimension must be greater than 0".into()));
        }
        Ok(Self {
            dimension,
            storage: Storage::Dense { data: Vec::new() },
        })
    }

    /// Empty store for sparse points with indices below `dimension`.
    pub fn sparse(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RetrieveError::Config("dimension must be greater than 0".into()));
        }
        Ok(Self {
            dimension,
            storage: Storage::Sparse {
                indptr: vec![0],
                indices: Vec::new(),
                values: Vec::new(),
            },
        })
    }

    /// Empty store matching `descriptor`.
    pub fn with_descriptor(descriptor: PointDescriptor) -> Result<Self> {
        match descriptor.kind {
            PointKind::Dense => Self::dense(descriptor.dimension),
            PointKind::Sparse => Self::sparse(descriptor.dimension),
        }
    }

    /// Take ownership of already-validated CSR buffers without copying.
    pub fn from_csr(matrix: CsrMatrix) -> Result<Self> {
        let (n_cols, indptr, indices, values) = matrix.into_parts();
        if n_cols == 0 {
            return Err(RetrieveError::Config("dimension must be greater than 0".into()));
        }
        Ok(Self {
            dimension: n_cols,
            storage: Storage::Sparse {
                indptr,
                indices,
                values,
            },
        })
    }

    /// Append a point, returning its id.
    pub fn add(&mut self, point: PointRef<'_>) -> Result<u32> {
        self.check(point)?;
        let id = u32::try_from(self.len())
            .map_err(|_| RetrieveError::Config("point store is limited to u32::MAX points".into()))?;
        match (&mut self.storage, point) {
            (Storage::Dense { data }, PointRef::Dense(v)) => data.extend_from_slice(v),
            (
                Storage::Sparse {
                    indptr,
                    indices,
                    values,
                },
                PointRef::Sparse(s),
            ) => {
                indices.extend_from_slice(s.indices);
                values.extend_from_slice(s.values);
                indptr.push(indices.len());
            }
            (_, point) => {
                return Err(RetrieveError::Shape(format!(
                    "expected a {} point, got a {} point",
                    self.kind(),
                    point.kind()
                )))
            }
        }
        Ok(id)
    }

    /// Validate that `point` matches this store's kind and dimensionality.
    ///
    /// Used for both ingestion and queries; never touches existing points.
    pub fn check(&self, point: PointRef<'_>) -> Result<()> {
        let kind = self.kind();
        if point.kind() != kind {
            return Err(RetrieveError::Shape(format!(
                "expected a {kind} point, got a {} point",
                point.kind()
            )));
        }
        match point {
            PointRef::Dense(v) => {
                if v.len() != self.dimension {
                    return Err(RetrieveError::DimensionMismatch {
                        query_dim: v.len(),
                        doc_dim: self.dimension,
                    });
                }
                Ok(())
            }
            PointRef::Sparse(s) => validate_sparse(s.indices, s.values, self.dimension),
        }
    }

    /// Borrow point `id`. Panics if `id` is out of range.
    #[inline]
    pub fn get(&self, id: u32) -> PointRef<'_> {
        let i = id as usize;
        match &self.storage {
            Storage::Dense { data } => {
                let start = i * self.dimension;
                PointRef::Dense(&data[start..start + self.dimension])
            }
            Storage::Sparse {
                indptr,
                indices,
                values,
            } => {
                let (start, end) = (indptr[i], indptr[i + 1]);
                PointRef::Sparse(SparseRef {
                    indices: &indices[start..end],
                    values: &values[start..end],
                })
            }
        }
    }

    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Dense { data } => data.len() / self.dimension,
            Storage::Sparse { indptr, .. } => indptr.len() - 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> PointKind {
        match self.storage {
            Storage::Dense { .. } => PointKind::Dense,
            Storage::Sparse { .. } => PointKind::Sparse,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn descriptor(&self) -> PointDescriptor {
        PointDescriptor {
            kind: self.kind(),
            dimension: self.dimension,
        }
    }

    /// Total stored values (`n * dimension` for dense stores).
    pub fn nnz(&self) -> usize {
        match &self.storage {
            Storage::Dense { data } => data.len(),
            Storage::Sparse { values, .. } => values.len(),
        }
    }

    /// Bytes held by coordinate buffers.
    pub fn memory_bytes(&self) -> usize {
        match &self.storage {
            Storage::Dense { data } => data.len() * std::mem::size_of::<f32>(),
            Storage::Sparse {
                indptr,
                indices,
                values,
            } => {
                indptr.len() * std::mem::size_of::<usize>()
                    + indices.len() * std::mem::size_of::<u32>()
                    + values.len() * std::mem::size_of::<f32>()
            }
        }
    }

    /// First point holding a non-finite value, if any.
    pub(crate) fn first_non_finite(&self, ids: &[u32]) -> Option<u32> {
        ids.iter().copied().find(|&id| !self.get(id).is_finite())
    }
}
