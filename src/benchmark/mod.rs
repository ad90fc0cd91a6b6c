//! Benchmark utilities for ANN evaluation.
//!
//! - [`exact`]: brute-force k-NN for ground truth
//! - [`metrics`]: recall@k (by id and by distance), precision@k, graph recall
//! - [`datasets`]: seeded synthetic dense and sparse data
//!
//! Reference: <https://ann-benchmarks.com/>

pub mod datasets;
pub mod exact;
pub mod metrics;

pub use datasets::{
    create_clustered_dataset, create_sparse_topic_dataset, create_uniform_dataset,
    create_uniform_sparse_dataset, Dataset, SparseTopics,
};
pub use exact::ExactIndex;
pub use metrics::{
    distance_recall_at_k, graph_recall, mean_recall, precision_at_k, recall_at_k,
};
