//! Compressed sparse row (CSR) ingestion buffers.

use super::{PointRef, SparseRef};
use crate::{Result, RetrieveError};

/// Sparse matrix in compressed-row layout: one row per point.
///
/// Row `i` spans `indices[indptr[i]..indptr[i + 1]]` and the matching slice
/// of `data`. This mirrors the usual on-disk sparse-matrix layout, so
/// vectorizer output can be handed over without re-packing.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<u32>,
    data: Vec<f32>,
}

impl CsrMatrix {
    /// Validate and wrap CSR buffers.
    ///
    /// Checks that `indptr` starts at zero, never decreases and ends at the
    /// number of stored values; that `indices` and `data` are aligned; and that
    /// column indices within each row are strictly increasing and below
    /// `n_cols`.
    pub fn try_new(
        n_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<u32>,
        data: Vec<f32>,
    ) -> Result<Self> {
        if indptr.is_empty() {
            return Err(RetrieveError::InvalidSparseVector(
                "row offsets must contain at least one entry".into(),
            ));
        }
        if indices.len() != data.len() {
            return Err(RetrieveError::InvalidSparseVector(format!(
                "{} column indices but {} values",
                indices.len(),
                data.len()
            )));
        }
        if indptr[0] != 0 {
            return Err(RetrieveError::InvalidSparseVector(format!(
                "first row offset must be 0, got {}",
                indptr[0]
            )));
        }
        if let Some(row) = indptr.windows(2).position(|w| w[0] > w[1]) {
            return Err(RetrieveError::InvalidSparseVector(format!(
                "row offsets decrease at row {row}"
            )));
        }
        let last = indptr[indptr.len() - 1];
        if last != indices.len() {
            return Err(RetrieveError::InvalidSparseVector(format!(
                "last row offset {last} does not match {} stored values",
                indices.len()
            )));
        }
        for row in 0..indptr.len() - 1 {
            let cols = &indices[indptr[row]..indptr[row + 1]];
            if cols.windows(2).any(|w| w[0] >= w[1]) {
                return Err(RetrieveError::InvalidSparseVector(format!(
                    "column indices in row {row} are not strictly increasing"
                )));
            }
            if let Some(&c) = cols.last() {
                if c as usize >= n_cols {
                    return Err(RetrieveError::InvalidSparseVector(format!(
                        "column index {c} in row {row} is out of range for {n_cols} columns"
                    )));
                }
            }
        }

        Ok(Self {
            n_cols,
            indptr,
            indices,
            data,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.indptr.len() - 1
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Borrow row `i`. Panics if `i >= n_rows()`.
    pub fn row(&self, i: usize) -> PointRef<'_> {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        PointRef::Sparse(SparseRef {
            indices: &self.indices[start..end],
            values: &self.data[start..end],
        })
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = PointRef<'_>> + '_ {
        (0..self.n_rows()).map(move |i| self.row(i))
    }

    pub(crate) fn into_parts(self) -> (usize, Vec<usize>, Vec<u32>, Vec<f32>) {
        (self.n_cols, self.indptr, self.indices, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_buffers() {
        let m = CsrMatrix::try_new(4, vec![0, 2, 2, 3], vec![0, 3, 1], vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(m.n_rows(), 3);
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.row(1).nnz(), 0);
        assert_eq!(m.row(2), PointRef::sparse(&[1], &[3.0]));
    }

    #[test]
    fn rejects_decreasing_offsets() {
        let err = CsrMatrix::try_new(4, vec![0, 2, 1, 3], vec![0, 3, 1], vec![1.0, 2.0, 3.0]);
        assert!(matches!(err, Err(RetrieveError::InvalidSparseVector(_))));
    }

    #[test]
    fn rejects_unsorted_columns() {
        let err = CsrMatrix::try_new(4, vec![0, 2], vec![3, 0], vec![1.0, 2.0]);
        assert!(matches!(err, Err(RetrieveError::InvalidSparseVector(_))));
    }

    #[test]
    fn rejects_misaligned_buffers() {
        let err = CsrMatrix::try_new(4, vec![0, 2], vec![0, 1], vec![1.0]);
        assert!(matches!(err, Err(RetrieveError::InvalidSparseVector(_))));
    }

    #[test]
    fn rejects_column_out_of_range() {
        let err = CsrMatrix::try_new(2, vec![0, 1], vec![2], vec![1.0]);
        assert!(matches!(err, Err(RetrieveError::InvalidSparseVector(_))));
    }

    #[test]
    fn rejects_offset_past_end() {
        let err = CsrMatrix::try_new(4, vec![0, 3], vec![0, 1], vec![1.0, 1.0]);
        assert!(matches!(err, Err(RetrieveError::InvalidSparseVector(_))));
    }
}
