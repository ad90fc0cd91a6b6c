//! k-NN graph structures.
//!
//! - [`NeighborList`]: mutable, bounded per-point list used during the forest
//!   seeding and NN-Descent refinement.
//! - [`KnnGraph`]: the frozen result, one ascending row of at most `k`
//!   `(id, distance)` entries per point.
//! - [`SearchGraph`]: adjacency the query engine walks, derived from the
//!   k-NN graph.
//!
//! The refinement-only "reverse candidate" lists never reach these types;
//! they are per-round scratch inside [`crate::nndescent`] and are dropped
//! before the graph is frozen.

mod knn;
mod neighbor_list;
mod search_graph;

pub use knn::KnnGraph;
pub use neighbor_list::{Neighbor, NeighborList};
pub(crate) use neighbor_list::cmp_entry;
pub use search_graph::{SearchGraph, SearchGraphParams};
