//! Sparse distance kernels.
//!
//! All kernels run in O(nnz(a) + nnz(b)) using [`simd::sparse_merge`] or
//! [`simd::sparse_dot`]; coordinates absent from both inputs contribute
//! nothing (or, for Hamming, are known to match). Results agree with the
//! corresponding [`dense`](super::dense) kernel on the densified inputs up to
//! floating-point summation order.

use super::dense::{
    cosine_from_parts, dice_from_counts, hellinger_from_parts, jaccard_from_counts,
};
use crate::point::SparseRef;
use crate::simd;

#[inline]
fn merge<'a>(a: SparseRef<'a>, b: SparseRef<'a>) -> simd::SparseMerge<'a> {
    simd::sparse_merge(a.indices, a.values, b.indices, b.values)
}

#[inline]
pub fn euclidean(a: SparseRef<'_>, b: SparseRef<'_>) -> f32 {
    squared_euclidean(a, b).sqrt()
}

#[inline]
pub fn squared_euclidean(a: SparseRef<'_>, b: SparseRef<'_>) -> f32 {
    merge(a, b).map(|(_, x, y)| (x - y) * (x - y)).sum()
}

#[inline]
pub fn manhattan(a: SparseRef<'_>, b: SparseRef<'_>) -> f32 {
    merge(a, b).map(|(_, x, y)| (x - y).abs()).sum()
}

#[inline]
pub fn chebyshev(a: SparseRef<'_>, b: SparseRef<'_>) -> f32 {
    merge(a, b).map(|(_, x, y)| (x - y).abs()).fold(0.0, f32::max)
}

#[inline]
pub fn cosine(a: SparseRef<'_>, b: SparseRef<'_>) -> f32 {
    let dot = simd::sparse_dot(a.indices, a.values, b.indices, b.values);
    cosine_from_parts(dot, simd::sparse_norm(a.values), simd::sparse_norm(b.values))
}

pub fn jaccard(a: SparseRef<'_>, b: SparseRef<'_>) -> f32 {
    let (mut union, mut both) = (0usize, 0usize);
    for (_, x, y) in merge(a, b) {
        let (xa, yb) = (x != 0.0, y != 0.0);
        union += usize::from(xa || yb);
        both += usize::from(xa && yb);
    }
    jaccard_from_counts(union, both)
}

pub fn dice(a: SparseRef<'_>, b: SparseRef<'_>) -> f32 {
    let (mut both, mut differ) = (0usize, 0usize);
    for (_, x, y) in merge(a, b) {
        let (xa, yb) = (x != 0.0, y != 0.0);
        both += usize::from(xa && yb);
        differ += usize::from(xa != yb);
    }
    dice_from_counts(both, differ)
}

/// Hamming distance normalised by the declared dimensionality.
pub fn hamming(a: SparseRef<'_>, b: SparseRef<'_>, dimension: usize) -> f32 {
    if dimension == 0 {
        return 0.0;
    }
    let differ = merge(a, b).filter(|(_, x, y)| x != y).count();
    differ as f32 / dimension as f32
}

pub fn hellinger(a: SparseRef<'_>, b: SparseRef<'_>) -> f32 {
    let mut shared = 0.0_f32;
    for (_, x, y) in merge(a, b) {
        shared += (x * y).sqrt();
    }
    let l1_a: f32 = a.values.iter().sum();
    let l1_b: f32 = b.values.iter().sum();
    hellinger_from_parts(shared, l1_a, l1_b)
}

pub fn bray_curtis(a: SparseRef<'_>, b: SparseRef<'_>) -> f32 {
    let (mut num, mut den) = (0.0_f32, 0.0_f32);
    for (_, x, y) in merge(a, b) {
        num += (x - y).abs();
        den += (x + y).abs();
    }
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}
