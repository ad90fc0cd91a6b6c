//! nndescent: approximate k-nearest-neighbor graphs and search over dense
//! and sparse points.
//!
//! The index is built in three stages:
//!
//! - `forest/`: random projection trees give a cheap initial candidate graph
//! - `nndescent/`: local joins refine it until few updates remain
//! - `search`: best-first graph walk answers queries
//!
//! Points are either dense (`&[f32]`) or sparse (sorted index/value pairs).
//! Sparse points are never densified: storage is CSR, distances walk only
//! non-zeros, and random projections use sparse normals.
//!
//! ```rust
//! use nndescent::{build_index, Point, SparseVector, PointRef};
//!
//! let points: Vec<Point> = (0..40u32)
//!     .map(|i| {
//!         let v = SparseVector::new(100, vec![i % 10, 50 + i % 7], vec![1.0, 0.5]).unwrap();
//!         Point::Sparse(v)
//!     })
//!     .collect();
//! let index = build_index(&points, "cosine", 5, 4, 8, 7)?;
//! let hits = index.search(points[3].as_ref(), 3, 16)?;
//! assert!(hits[0].1 < 1e-6);
//! # Ok::<(), nndescent::RetrieveError>(())
//! ```
//!
//! # Critical Nuances
//!
//! ## Sparse data needs structure
//!
//! In high dimension, random sparse vectors share almost no coordinates, so
//! nearly every pair sits at cosine distance 1 and "nearest" carries no
//! information. Neighbor-of-neighbor refinement relies on real neighborhood
//! structure (topics, clusters), as any graph index does.
//!
//! ## The Hubness Problem
//!
//! In high-dimensional spaces, some points become **hubs**, appearing as
//! nearest neighbors to many other points, while **antihubs** rarely appear
//! in any neighbor list. The query graph adds reverse edges so antihubs stay
//! reachable.
//!
//! ## When Exact Search Beats Approximate
//!
//! - Small datasets (a few thousand points): brute force is simpler and fast
//! - Very high recall requirements (> 99.9%): ANN overhead not worth it
//!
//! [`benchmark::exact::ExactIndex`] is the brute-force baseline.

pub mod ann;
pub mod benchmark;
pub mod cancel;
pub mod distance;
pub mod error;
pub mod forest;
pub mod graph;
pub mod index;
pub mod nndescent;
pub mod point;
pub mod search;
pub mod simd;

// Re-exports
pub use ann::traits::ANNIndex;
pub use cancel::CancelToken;
pub use distance::Metric;
pub use error::{Result, RetrieveError};
pub use graph::{KnnGraph, SearchGraphParams};
pub use index::{build_index, IndexStats, NNDescentIndex};
pub use nndescent::{BuildStats, NNDescentParams};
pub use point::{CsrMatrix, Point, PointDescriptor, PointKind, PointRef, SparseVector};
pub use search::{SearchParams, SearchStats, SeedStrategy};
