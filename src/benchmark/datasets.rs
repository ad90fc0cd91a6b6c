//! Synthetic dense and sparse datasets for benchmarking.

use crate::point::{Point, PointRef, SparseVector};
use crate::Result;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

/// A dataset for ANN benchmarking.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Points to index.
    pub train: Vec<Point>,
    /// Query points.
    pub test: Vec<Point>,
    /// Coordinate count (dense) or index bound (sparse).
    pub dimension: usize,
}

impl Dataset {
    pub fn n_train(&self) -> usize {
        self.train.len()
    }

    pub fn n_test(&self) -> usize {
        self.test.len()
    }

    pub fn train_refs(&self) -> Vec<PointRef<'_>> {
        self.train.iter().map(Point::as_ref).collect()
    }

    pub fn test_refs(&self) -> Vec<PointRef<'_>> {
        self.test.iter().map(Point::as_ref).collect()
    }
}

/// Uniform vectors in [0, 1]^d. A structureless baseline.
pub fn create_uniform_dataset(n_train: usize, n_test: usize, dimension: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sample = |n: usize| -> Vec<Point> {
        (0..n)
            .map(|_| Point::Dense((0..dimension).map(|_| rng.random::<f32>()).collect()))
            .collect()
    };
    let train = sample(n_train);
    let test = sample(n_test);
    Dataset {
        train,
        test,
        dimension,
    }
}

/// Create a clustered dataset (more realistic than uniform random).
///
/// Generates `n_clusters` cluster centers, then samples points
/// around each center with Gaussian noise.
pub fn create_clustered_dataset(
    n_train: usize,
    n_test: usize,
    dimension: usize,
    n_clusters: usize,
    cluster_std: f32,
    seed: u64,
) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);

    let centers: Vec<Vec<f32>> = (0..n_clusters)
        .map(|_| (0..dimension).map(|_| rng.random::<f32>()).collect())
        .collect();

    let sample_near_center = |rng: &mut StdRng, center: &[f32]| -> Point {
        Point::Dense(
            center
                .iter()
                .map(|&c| {
                    // Box-Muller for Gaussian
                    let u1: f32 = rng.random::<f32>().max(f32::MIN_POSITIVE);
                    let u2: f32 = rng.random();
                    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
                    c + z * cluster_std
                })
                .collect(),
        )
    };

    let train = (0..n_train)
        .map(|_| {
            let cluster_idx = rng.random_range(0..n_clusters);
            sample_near_center(&mut rng, &centers[cluster_idx])
        })
        .collect();

    let test = (0..n_test)
        .map(|_| {
            let cluster_idx = rng.random_range(0..n_clusters);
            sample_near_center(&mut rng, &centers[cluster_idx])
        })
        .collect();

    Dataset {
        train,
        test,
        dimension,
    }
}

/// Sparse vectors with `nnz` coordinates drawn uniformly from `dimension`,
/// values in `[0.1, 1)`.
///
/// At 20 of 5,000 coordinates a point shares a coordinate with roughly 80
/// others out of 1,000, so its nearest cosine neighbors are well defined but
/// most pairs sit at distance exactly 1.
pub fn create_uniform_sparse_dataset(
    n_train: usize,
    n_test: usize,
    dimension: usize,
    nnz: usize,
    seed: u64,
) -> Result<Dataset> {
    let mut rng = StdRng::seed_from_u64(seed);
    let nnz = nnz.min(dimension);
    let mut sample = |n: usize| -> Result<Vec<Point>> {
        (0..n)
            .map(|_| {
                let pairs: Vec<(u32, f32)> = index::sample(&mut rng, dimension, nnz)
                    .into_iter()
                    .map(|i| (i as u32, rng.random_range(0.1..1.0)))
                    .collect();
                sparse_from_pairs(dimension, pairs)
            })
            .collect()
    };
    let train = sample(n_train)?;
    let test = sample(n_test)?;
    Ok(Dataset {
        train,
        test,
        dimension,
    })
}

/// Shape of a synthetic sparse "bag of words" corpus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseTopics {
    /// Index bound of every vector.
    pub dimension: usize,
    pub n_topics: usize,
    /// Coordinates owned by each topic.
    pub vocabulary: usize,
    /// Non-zeros drawn from the point's topic.
    pub topic_nnz: usize,
    /// Extra non-zeros drawn from the whole space.
    pub noise_nnz: usize,
}

impl Default for SparseTopics {
    fn default() -> Self {
        Self {
            dimension: 5_000,
            n_topics: 20,
            vocabulary: 60,
            topic_nnz: 18,
            noise_nnz: 2,
        }
    }
}

/// Sparse vectors around latent topics, about `topic_nnz + noise_nnz`
/// non-zeros each.
///
/// Each topic owns a random slice of the coordinate space; a point takes
/// positive weights on a random subset of its topic's coordinates plus a few
/// weak ones anywhere. Points of one topic overlap heavily, giving clustered
/// neighborhoods rather than the thin overlaps of
/// [`create_uniform_sparse_dataset`].
pub fn create_sparse_topic_dataset(
    n_train: usize,
    n_test: usize,
    shape: SparseTopics,
    seed: u64,
) -> Result<Dataset> {
    let mut rng = StdRng::seed_from_u64(seed);
    let vocabulary = shape.vocabulary.min(shape.dimension);
    let topics: Vec<Vec<u32>> = (0..shape.n_topics.max(1))
        .map(|_| {
            index::sample(&mut rng, shape.dimension, vocabulary)
                .into_iter()
                .map(|i| i as u32)
                .collect()
        })
        .collect();

    let mut sample = |n: usize| -> Result<Vec<Point>> {
        (0..n)
            .map(|_| {
                let topic = &topics[rng.random_range(0..topics.len())];
                let take = shape.topic_nnz.min(topic.len());
                let mut pairs: Vec<(u32, f32)> = index::sample(&mut rng, topic.len(), take)
                    .into_iter()
                    .map(|i| (topic[i], rng.random_range(0.5..1.5)))
                    .collect();
                for _ in 0..shape.noise_nnz {
                    let i = rng.random_range(0..shape.dimension as u32);
                    pairs.push((i, rng.random_range(0.05..0.3)));
                }
                sparse_from_pairs(shape.dimension, pairs)
            })
            .collect()
    };
    let train = sample(n_train)?;
    let test = sample(n_test)?;
    Ok(Dataset {
        train,
        test,
        dimension: shape.dimension,
    })
}

/// Sort, sum duplicate coordinates, wrap.
fn sparse_from_pairs(dimension: usize, mut pairs: Vec<(u32, f32)>) -> Result<Point> {
    pairs.sort_unstable_by_key(|p| p.0);
    let mut indices: Vec<u32> = Vec::with_capacity(pairs.len());
    let mut values: Vec<f32> = Vec::with_capacity(pairs.len());
    for (i, v) in pairs {
        if indices.last() == Some(&i) {
            if let Some(last) = values.last_mut() {
                *last += v;
            }
        } else {
            indices.push(i);
            values.push(v);
        }
    }
    Ok(Point::Sparse(SparseVector::new(dimension, indices, values)?))
}
