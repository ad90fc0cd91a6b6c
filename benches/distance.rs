//! Benchmarks for distance computations.
//!
//! Dense kernels by dimension, and sparse kernels by non-zero count with the
//! dense equivalent alongside to show what densifying would cost.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nndescent::{Metric, PointRef};
use rand::prelude::*;

// === Generators ===

fn random_vectors(n: usize, dim: usize) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.random::<f32>() * 2.0 - 1.0).collect())
        .collect()
}

/// Sorted `(indices, values)` with `nnz` entries below `dim`.
fn random_sparse(nnz: usize, dim: usize, seed: u64) -> (Vec<u32>, Vec<f32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<u32> = rand::seq::index::sample(&mut rng, dim, nnz)
        .into_iter()
        .map(|i| i as u32)
        .collect();
    indices.sort_unstable();
    let values = (0..nnz).map(|_| rng.random::<f32>() + 0.1).collect();
    (indices, values)
}

fn densify(indices: &[u32], values: &[f32], dim: usize) -> Vec<f32> {
    let mut out = vec![0.0; dim];
    for (&i, &v) in indices.iter().zip(values) {
        out[i as usize] = v;
    }
    out
}

// === Benchmarks ===

fn bench_dense_metrics(c: &mut Criterion) {
    for metric in [Metric::Euclidean, Metric::Cosine, Metric::Manhattan] {
        let mut group = c.benchmark_group(format!("dense_{}", metric.name()));
        for dim in [32, 128, 384, 768].iter() {
            group.throughput(Throughput::Elements(*dim as u64));
            let vectors = random_vectors(2, *dim);
            let a = PointRef::Dense(&vectors[0]);
            let b = PointRef::Dense(&vectors[1]);
            group.bench_with_input(BenchmarkId::from_parameter(dim), dim, |bench, &dim| {
                bench.iter(|| metric.distance(black_box(a), black_box(b), dim));
            });
        }
        group.finish();
    }
}

fn bench_sparse_vs_dense(c: &mut Criterion) {
    let dim = 5_000;
    let mut group = c.benchmark_group("sparse_cosine");

    for nnz in [10, 20, 100, 500].iter() {
        group.throughput(Throughput::Elements(*nnz as u64));
        let (ai, av) = random_sparse(*nnz, dim, 1);
        let (bi, bv) = random_sparse(*nnz, dim, 2);
        let a = PointRef::sparse(&ai, &av);
        let b = PointRef::sparse(&bi, &bv);
        group.bench_with_input(BenchmarkId::new("sparse", nnz), nnz, |bench, _| {
            bench.iter(|| Metric::Cosine.distance(black_box(a), black_box(b), dim));
        });

        let da = densify(&ai, &av, dim);
        let db = densify(&bi, &bv, dim);
        group.bench_with_input(BenchmarkId::new("densified", nnz), nnz, |bench, _| {
            bench.iter(|| {
                Metric::Cosine.distance(
                    black_box(PointRef::Dense(&da)),
                    black_box(PointRef::Dense(&db)),
                    dim,
                )
            });
        });
    }

    group.finish();
}

fn bench_sparse_metrics(c: &mut Criterion) {
    let dim = 5_000;
    let (ai, av) = random_sparse(20, dim, 3);
    let (bi, bv) = random_sparse(20, dim, 4);
    let a = PointRef::sparse(&ai, &av);
    let b = PointRef::sparse(&bi, &bv);

    let mut group = c.benchmark_group("sparse_metric");
    for metric in Metric::ALL {
        if !metric.supports(nndescent::PointKind::Sparse) {
            continue;
        }
        group.bench_function(metric.name(), |bench| {
            bench.iter(|| metric.distance(black_box(a), black_box(b), dim));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_dense_metrics,
    bench_sparse_vs_dense,
    bench_sparse_metrics,
);
criterion_main!(benches);
