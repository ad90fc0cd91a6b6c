//! Property-based tests for nndescent components.
//!
//! These tests verify invariants that should hold regardless of input:
//! - Sparse kernels agree with their dense counterparts
//! - Neighbor lists keep the smallest entries whatever the arrival order
//! - Built graphs are well formed and builds are reproducible
//! - Queries are deterministic and sorted

use nndescent::graph::NeighborList;
use nndescent::{build_index, Metric, Point, PointKind, PointRef, SparseVector};
use proptest::prelude::*;

mod distance_props {
    use super::*;

    prop_compose! {
        /// A sparse vector over `dim` coordinates with values in (0, 4],
        /// plus its densified twin.
        fn arb_sparse(dim: usize)(
            mask in prop::collection::vec(any::<bool>(), dim),
            vals in prop::collection::vec(0.01f32..4.0, dim),
        ) -> (Vec<u32>, Vec<f32>, Vec<f32>) {
            let mut indices = Vec::new();
            let mut values = Vec::new();
            let mut dense = vec![0.0; dim];
            for i in 0..dim {
                if mask[i] {
                    indices.push(i as u32);
                    values.push(vals[i]);
                    dense[i] = vals[i];
                }
            }
            (indices, values, dense)
        }
    }

    proptest! {
        #[test]
        fn sparse_matches_dense(
            a in arb_sparse(24),
            b in arb_sparse(24),
        ) {
            for metric in Metric::ALL {
                if !metric.supports(PointKind::Sparse) {
                    continue;
                }
                let sparse = metric.distance(
                    PointRef::sparse(&a.0, &a.1),
                    PointRef::sparse(&b.0, &b.1),
                    24,
                );
                let dense = metric.distance(PointRef::Dense(&a.2), PointRef::Dense(&b.2), 24);
                let tol = 1e-3 * dense.abs().max(1.0);
                prop_assert!(
                    (sparse - dense).abs() <= tol,
                    "{}: sparse {} vs dense {}", metric, sparse, dense
                );
            }
        }

        #[test]
        fn distances_are_symmetric_and_non_negative(
            a in arb_sparse(16),
            b in arb_sparse(16),
        ) {
            for metric in Metric::ALL {
                let ab = metric.distance(PointRef::Dense(&a.2), PointRef::Dense(&b.2), 16);
                let ba = metric.distance(PointRef::Dense(&b.2), PointRef::Dense(&a.2), 16);
                prop_assert!(ab >= 0.0, "{}: {}", metric, ab);
                prop_assert!((ab - ba).abs() <= 1e-4 * ab.max(1.0), "{}", metric);
            }
        }

        #[test]
        fn self_distance_is_zero(a in arb_sparse(16)) {
            for metric in Metric::ALL {
                if !metric.supports(PointKind::Sparse) {
                    continue;
                }
                let d = metric.distance(
                    PointRef::sparse(&a.0, &a.1),
                    PointRef::sparse(&a.0, &a.1),
                    16,
                );
                prop_assert!(d.abs() < 1e-2, "{}: {}", metric, d);
            }
        }
    }
}

mod neighbor_list_props {
    use super::*;

    proptest! {
        #[test]
        fn keeps_smallest_regardless_of_order(
            dists in prop::collection::vec(0.0f32..10.0, 1..60),
            capacity in 1usize..12,
            rotate in 0usize..60,
        ) {
            let candidates: Vec<(u32, f32)> = dists
                .iter()
                .enumerate()
                .map(|(i, &d)| (i as u32, d))
                .collect();

            let mut forward = NeighborList::new(capacity);
            for &(id, d) in &candidates {
                forward.push(id, d, true);
            }
            let mut shuffled = candidates.clone();
            shuffled.reverse();
            let len = shuffled.len();
            shuffled.rotate_left(rotate % len);
            let mut other = NeighborList::new(capacity);
            for &(id, d) in &shuffled {
                other.push(id, d, true);
            }

            let ids = |l: &NeighborList| l.iter().map(|n| n.id).collect::<Vec<_>>();
            prop_assert_eq!(ids(&forward), ids(&other));

            let mut expected = candidates.clone();
            expected.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            expected.truncate(capacity);
            let expected: Vec<u32> = expected.into_iter().map(|c| c.0).collect();
            prop_assert_eq!(ids(&forward), expected);
        }
    }
}

mod graph_props {
    use super::*;

    fn dense_points(coords: &[(f32, f32)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::Dense(vec![x, y])).collect()
    }

    fn sparse_points(rows: &[Vec<u32>]) -> Vec<Point> {
        rows.iter()
            .map(|row| {
                let mut idx = row.clone();
                idx.sort_unstable();
                idx.dedup();
                let values = idx.iter().map(|&i| 1.0 + (i % 5) as f32).collect();
                Point::Sparse(SparseVector::new(64, idx, values).unwrap())
            })
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn dense_graph_is_well_formed(
            coords in prop::collection::vec((-50.0f32..50.0, -50.0f32..50.0), 20..80),
            k in 2usize..8,
            seed in any::<u64>(),
        ) {
            let points = dense_points(&coords);
            let index = build_index(&points, "euclidean", k, 3, 8, seed).unwrap();
            let graph = index.neighbor_graph().unwrap();
            prop_assert!(graph.validate().is_ok());
            prop_assert_eq!(graph.len(), points.len());
            for p in 0..points.len() as u32 {
                let ids = graph.neighbor_ids(p);
                let dists = graph.neighbor_distances(p);
                prop_assert!(ids.len() <= k);
                prop_assert!(!ids.contains(&p));
                let mut unique = ids.to_vec();
                unique.sort_unstable();
                unique.dedup();
                prop_assert_eq!(unique.len(), ids.len());
                prop_assert!(dists.windows(2).all(|w| w[0] <= w[1]));
                for (&q, &d) in ids.iter().zip(dists) {
                    let truth = Metric::Euclidean.distance(
                        points[p as usize].as_ref(),
                        points[q as usize].as_ref(),
                        2,
                    );
                    prop_assert!((truth - d).abs() <= 1e-4 * truth.max(1.0));
                }
            }
        }

        #[test]
        fn sparse_graph_is_well_formed(
            rows in prop::collection::vec(prop::collection::vec(0u32..64, 1..6), 20..60),
            seed in any::<u64>(),
        ) {
            let points = sparse_points(&rows);
            let index = build_index(&points, "jaccard", 4, 3, 8, seed).unwrap();
            let graph = index.neighbor_graph().unwrap();
            prop_assert!(graph.validate().is_ok());
            for p in 0..points.len() as u32 {
                prop_assert!(graph.neighbor_ids(p).len() <= 4);
                prop_assert!(!graph.neighbor_ids(p).contains(&p));
            }
        }

        #[test]
        fn builds_are_reproducible(
            coords in prop::collection::vec((-10.0f32..10.0, -10.0f32..10.0), 20..60),
            seed in any::<u64>(),
        ) {
            let points = dense_points(&coords);
            let a = build_index(&points, "manhattan", 4, 3, 8, seed).unwrap();
            let b = build_index(&points, "manhattan", 4, 3, 8, seed).unwrap();
            prop_assert_eq!(
                a.neighbor_graph().unwrap().to_arrays(),
                b.neighbor_graph().unwrap().to_arrays()
            );
        }

        #[test]
        fn queries_are_idempotent_and_sorted(
            coords in prop::collection::vec((-10.0f32..10.0, -10.0f32..10.0), 20..60),
            query in (-12.0f32..12.0, -12.0f32..12.0),
        ) {
            let points = dense_points(&coords);
            let index = build_index(&points, "euclidean", 4, 3, 8, 5).unwrap();
            let q = [query.0, query.1];
            let first = index.search(PointRef::Dense(&q), 3, 12).unwrap();
            let second = index.search(PointRef::Dense(&q), 3, 12).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert!(first.len() <= 3);
            prop_assert!(first.windows(2).all(|w| w[0].1 <= w[1].1));
            let mut ids: Vec<u32> = first.iter().map(|h| h.0).collect();
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), first.len());
        }
    }
}
