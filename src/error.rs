//! Error types for nndescent.

use crate::point::PointKind;
use thiserror::Error;

/// Errors that can occur during indexing/search operations.
///
/// Configuration and shape problems are detected before any distance is
/// computed. A failed build never leaves a partially built index behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetrieveError {
    /// Invalid build or query parameter (includes unknown metric names).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Point representation (dense vs sparse) disagrees with the index.
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// Dimension mismatch between query and indexed points.
    #[error("dimension mismatch: query has {query_dim} dimensions, index has {doc_dim}")]
    DimensionMismatch { query_dim: usize, doc_dim: usize },

    /// Sparse vector or CSR buffers are malformed.
    #[error("invalid sparse vector: {0}")]
    InvalidSparseVector(String),

    /// The metric has no kernel for the store's representation.
    #[error("metric `{metric}` has no {kind} implementation")]
    UnsupportedMetric { metric: String, kind: PointKind },

    /// A distance evaluation produced an unusable value mid-build.
    #[error("build failed at point {point_id}: {reason}")]
    Build { point_id: u32, reason: String },

    /// Query or graph access before a successful build.
    #[error("index is not built")]
    NotBuilt,

    /// Points are read-only once the index is built.
    #[error("index is already built")]
    AlreadyBuilt,

    /// Cooperative cancellation was observed.
    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, RetrieveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_values() {
        let e = RetrieveError::DimensionMismatch {
            query_dim: 3,
            doc_dim: 4,
        };
        assert_eq!(
            e.to_string(),
            "dimension mismatch: query has 3 dimensions, index has 4"
        );

        let e = RetrieveError::UnsupportedMetric {
            metric: "correlation".into(),
            kind: PointKind::Sparse,
        };
        assert_eq!(
            e.to_string(),
            "metric `correlation` has no sparse implementation"
        );
    }
}
