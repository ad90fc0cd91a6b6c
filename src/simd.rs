//! Vector operations shared by the distance kernels and the forest builder.
//!
//! Dense kernels accumulate in four independent lanes so the compiler can
//! auto-vectorize them without `unsafe` intrinsics. Sparse kernels walk two
//! ascending index arrays in lockstep, so their cost is proportional to the
//! combined number of non-zeros, never to the dimensionality.
//!
//! ```rust
//! use nndescent::simd::{dot, sparse_dot};
//!
//! assert_eq!(dot(&[1.0, 2.0], &[3.0, 4.0]), 11.0);
//! assert_eq!(sparse_dot(&[0, 7], &[1.0, 2.0], &[7], &[3.0]), 6.0);
//! ```

/// Dot product of two dense vectors.
#[inline]
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut acc = [0.0_f32; 4];
    let chunks_a = a.chunks_exact(4);
    let chunks_b = b.chunks_exact(4);
    let tail: f32 = chunks_a
        .remainder()
        .iter()
        .zip(chunks_b.remainder())
        .map(|(x, y)| x * y)
        .sum();
    for (ca, cb) in chunks_a.zip(chunks_b) {
        for lane in 0..4 {
            acc[lane] += ca[lane] * cb[lane];
        }
    }
    acc[0] + acc[1] + acc[2] + acc[3] + tail
}

/// L2 norm of a dense vector.
#[inline]
#[must_use]
pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Squared L2 distance between two dense vectors.
#[inline]
#[must_use]
pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut acc = [0.0_f32; 4];
    let chunks_a = a.chunks_exact(4);
    let chunks_b = b.chunks_exact(4);
    let tail: f32 = chunks_a
        .remainder()
        .iter()
        .zip(chunks_b.remainder())
        .map(|(x, y)| (x - y) * (x - y))
        .sum();
    for (ca, cb) in chunks_a.zip(chunks_b) {
        for lane in 0..4 {
            let d = ca[lane] - cb[lane];
            acc[lane] += d * d;
        }
    }
    acc[0] + acc[1] + acc[2] + acc[3] + tail
}

// ─────────────────────────────────────────────────────────────────────────────
// Sparse operations
// ─────────────────────────────────────────────────────────────────────────────

/// Sparse dot product using sorted index arrays.
///
/// Only indices present in both vectors contribute.
#[inline]
#[must_use]
pub fn sparse_dot(a_indices: &[u32], a_values: &[f32], b_indices: &[u32], b_values: &[f32]) -> f32 {
    let mut i = 0;
    let mut j = 0;
    let mut result = 0.0;

    while i < a_indices.len() && j < b_indices.len() {
        match a_indices[i].cmp(&b_indices[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                result += a_values[i] * b_values[j];
                i += 1;
                j += 1;
            }
        }
    }

    result
}

/// L2 norm of a sparse vector's stored values.
#[inline]
#[must_use]
pub fn sparse_norm(values: &[f32]) -> f32 {
    values.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Merge walk over the union of two sparse index sets.
///
/// Yields `(index, a_value, b_value)` in ascending index order, with `0.0`
/// standing in for an index missing from one side. Every sparse kernel that
/// needs more than the intersection is written on top of this.
#[derive(Debug, Clone)]
pub struct SparseMerge<'a> {
    a_indices: &'a [u32],
    a_values: &'a [f32],
    b_indices: &'a [u32],
    b_values: &'a [f32],
    i: usize,
    j: usize,
}

impl Iterator for SparseMerge<'_> {
    type Item = (u32, f32, f32);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let a = self.a_indices.get(self.i);
        let b = self.b_indices.get(self.j);
        match (a, b) {
            (None, None) => None,
            (Some(&ia), None) => {
                self.i += 1;
                Some((ia, self.a_values[self.i - 1], 0.0))
            }
            (None, Some(&ib)) => {
                self.j += 1;
                Some((ib, 0.0, self.b_values[self.j - 1]))
            }
            (Some(&ia), Some(&ib)) => match ia.cmp(&ib) {
                std::cmp::Ordering::Less => {
                    self.i += 1;
                    Some((ia, self.a_values[self.i - 1], 0.0))
                }
                std::cmp::Ordering::Greater => {
                    self.j += 1;
                    Some((ib, 0.0, self.b_values[self.j - 1]))
                }
                std::cmp::Ordering::Equal => {
                    self.i += 1;
                    self.j += 1;
                    Some((ia, self.a_values[self.i - 1], self.b_values[self.j - 1]))
                }
            },
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest_a = self.a_indices.len() - self.i;
        let rest_b = self.b_indices.len() - self.j;
        (rest_a.max(rest_b), Some(rest_a + rest_b))
    }
}

/// Walk the union of two sparse vectors. See [`SparseMerge`].
#[inline]
pub fn sparse_merge<'a>(
    a_indices: &'a [u32],
    a_values: &'a [f32],
    b_indices: &'a [u32],
    b_values: &'a [f32],
) -> SparseMerge<'a> {
    SparseMerge {
        a_indices,
        a_values,
        b_indices,
        b_values,
        i: 0,
        j: 0,
    }
}

/// Linear combination `wa * a + wb * b` of two sparse vectors.
///
/// Entries that cancel to exactly zero are dropped, so the output keeps the
/// strictly-increasing index invariant and holds only non-zeros.
pub fn sparse_axpby(
    wa: f32,
    a_indices: &[u32],
    a_values: &[f32],
    wb: f32,
    b_indices: &[u32],
    b_values: &[f32],
) -> (Vec<u32>, Vec<f32>) {
    let cap = a_indices.len() + b_indices.len();
    let mut indices = Vec::with_capacity(cap);
    let mut values = Vec::with_capacity(cap);
    for (idx, x, y) in sparse_merge(a_indices, a_values, b_indices, b_values) {
        let v = wa * x + wb * y;
        if v != 0.0 {
            indices.push(idx);
            values.push(v);
        }
    }
    (indices, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_basic() {
        let a = [1.0_f32, 2.0, 3.0, 4.0, 5.0];
        let b = [5.0_f32, 4.0, 3.0, 2.0, 1.0];
        assert!((dot(&a, &b) - 35.0).abs() < 1e-6);
    }

    #[test]
    fn test_norm() {
        let v = [3.0_f32, 4.0];
        assert!((norm(&v) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_distance_squared() {
        let a = [0.0_f32, 0.0, 0.0, 0.0, 1.0];
        let b = [3.0_f32, 4.0, 0.0, 0.0, 1.0];
        assert!((l2_distance_squared(&a, &b) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_sparse_dot() {
        let a_idx = [0, 2, 5];
        let a_val = [1.0, 2.0, 3.0];
        let b_idx = [1, 2, 5];
        let b_val = [1.0, 4.0, 2.0];
        // Matches at indices 2 (2.0*4.0=8.0) and 5 (3.0*2.0=6.0)
        let result = sparse_dot(&a_idx, &a_val, &b_idx, &b_val);
        assert!((result - 14.0).abs() < 1e-6);
    }

    #[test]
    fn merge_visits_union_in_order() {
        let merged: Vec<_> = sparse_merge(&[1, 4], &[1.0, 4.0], &[0, 4, 9], &[5.0, 6.0, 7.0]).collect();
        assert_eq!(
            merged,
            vec![(0, 0.0, 5.0), (1, 1.0, 0.0), (4, 4.0, 6.0), (9, 0.0, 7.0)]
        );
    }

    #[test]
    fn merge_with_empty_side() {
        let merged: Vec<_> = sparse_merge(&[], &[], &[3], &[2.0]).collect();
        assert_eq!(merged, vec![(3, 0.0, 2.0)]);
        assert_eq!(sparse_merge(&[], &[], &[], &[]).count(), 0);
    }

    #[test]
    fn axpby_drops_cancelled_entries() {
        let (idx, val) = sparse_axpby(1.0, &[0, 2], &[1.0, 2.0], -1.0, &[2, 3], &[2.0, 1.0]);
        assert_eq!(idx, vec![0, 3]);
        assert_eq!(val, vec![1.0, -1.0]);
    }
}
