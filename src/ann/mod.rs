//! Index-agnostic interfaces.
//!
//! [`ANNIndex`] is implemented by [`crate::NNDescentIndex`] and by the
//! brute-force [`crate::benchmark::exact::ExactIndex`]:
//!
//! ```rust
//! use nndescent::ann::ANNIndex;
//! use nndescent::benchmark::exact::ExactIndex;
//! use nndescent::{Metric, PointRef};
//!
//! let mut index = ExactIndex::dense(2, Metric::Manhattan)?;
//! index.add(PointRef::Dense(&[0.0, 0.0]))?;
//! index.add(PointRef::Dense(&[3.0, 1.0]))?;
//! ANNIndex::build(&mut index)?;
//! let hits = ANNIndex::search(&index, PointRef::Dense(&[2.0, 2.0]), 1)?;
//! assert_eq!(hits, vec![(1, 2.0)]);
//! # Ok::<(), nndescent::RetrieveError>(())
//! ```

pub mod traits;

pub use traits::{ANNIndex, ANNStats};
