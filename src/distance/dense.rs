//! Dense distance kernels. Callers guarantee equal lengths.

use crate::simd;

#[inline]
pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    simd::l2_distance_squared(a, b).sqrt()
}

#[inline]
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    simd::l2_distance_squared(a, b)
}

#[inline]
pub fn manhattan(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

#[inline]
pub fn chebyshev(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f32::max)
}

/// Cosine distance, clamped to `[0, 2]`.
#[inline]
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let na = simd::norm(a);
    let nb = simd::norm(b);
    cosine_from_parts(simd::dot(a, b), na, nb)
}

/// Shared by the dense and sparse kernels so both agree on zero vectors.
#[inline]
pub(crate) fn cosine_from_parts(dot: f32, norm_a: f32, norm_b: f32) -> f32 {
    if norm_a == 0.0 && norm_b == 0.0 {
        0.0
    } else if norm_a == 0.0 || norm_b == 0.0 {
        1.0
    } else {
        (1.0 - (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)).max(0.0)
    }
}

pub fn correlation(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len() as f32;
    if n == 0.0 {
        return 0.0;
    }
    let mu_a = a.iter().sum::<f32>() / n;
    let mu_b = b.iter().sum::<f32>() / n;
    let (mut dot, mut na, mut nb) = (0.0_f32, 0.0_f32, 0.0_f32);
    for (x, y) in a.iter().zip(b) {
        let (sx, sy) = (x - mu_a, y - mu_b);
        dot += sx * sy;
        na += sx * sx;
        nb += sy * sy;
    }
    cosine_from_parts(dot, na.sqrt(), nb.sqrt())
}

pub fn jaccard(a: &[f32], b: &[f32]) -> f32 {
    let (mut union, mut both) = (0usize, 0usize);
    for (x, y) in a.iter().zip(b) {
        let (xa, yb) = (*x != 0.0, *y != 0.0);
        union += usize::from(xa || yb);
        both += usize::from(xa && yb);
    }
    jaccard_from_counts(union, both)
}

#[inline]
pub(crate) fn jaccard_from_counts(union: usize, both: usize) -> f32 {
    if union == 0 {
        0.0
    } else {
        (union - both) as f32 / union as f32
    }
}

pub fn dice(a: &[f32], b: &[f32]) -> f32 {
    let (mut both, mut differ) = (0usize, 0usize);
    for (x, y) in a.iter().zip(b) {
        let (xa, yb) = (*x != 0.0, *y != 0.0);
        both += usize::from(xa && yb);
        differ += usize::from(xa != yb);
    }
    dice_from_counts(both, differ)
}

#[inline]
pub(crate) fn dice_from_counts(both: usize, differ: usize) -> f32 {
    if differ == 0 {
        0.0
    } else {
        differ as f32 / (2 * both + differ) as f32
    }
}

pub fn hamming(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() {
        return 0.0;
    }
    let differ = a.iter().zip(b).filter(|(x, y)| x != y).count();
    differ as f32 / a.len() as f32
}

pub fn hellinger(a: &[f32], b: &[f32]) -> f32 {
    let mut shared = 0.0_f32;
    let mut l1_a = 0.0_f32;
    let mut l1_b = 0.0_f32;
    for (x, y) in a.iter().zip(b) {
        shared += (x * y).sqrt();
        l1_a += x;
        l1_b += y;
    }
    hellinger_from_parts(shared, l1_a, l1_b)
}

#[inline]
pub(crate) fn hellinger_from_parts(shared: f32, l1_a: f32, l1_b: f32) -> f32 {
    if l1_a == 0.0 && l1_b == 0.0 {
        0.0
    } else if l1_a == 0.0 || l1_b == 0.0 {
        1.0
    } else {
        // NaN from negative inputs propagates on purpose.
        let ratio = shared / (l1_a * l1_b).sqrt();
        if ratio.is_nan() {
            f32::NAN
        } else {
            (1.0 - ratio).max(0.0).sqrt()
        }
    }
}

pub fn bray_curtis(a: &[f32], b: &[f32]) -> f32 {
    let (mut num, mut den) = (0.0_f32, 0.0_f32);
    for (x, y) in a.iter().zip(b) {
        num += (x - y).abs();
        den += (x + y).abs();
    }
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_three_four_five() {
        assert!((euclidean(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_distance_is_zero_for_identical() {
        let a = [1.0_f32, 2.0, 3.0];
        assert!(cosine(&a, &a).abs() < 1e-6);
    }

    #[test]
    fn cosine_handles_zero_vectors() {
        assert_eq!(cosine(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn chebyshev_takes_largest_gap() {
        assert_eq!(chebyshev(&[1.0, 5.0, 2.0], &[2.0, 1.0, 2.0]), 4.0);
    }

    #[test]
    fn jaccard_on_supports() {
        // supports {0,1} and {1,2}: union 3, intersection 1
        let d = jaccard(&[1.0, 1.0, 0.0], &[0.0, 2.0, 5.0]);
        assert!((d - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn hamming_fraction() {
        assert_eq!(hamming(&[1.0, 2.0, 3.0, 4.0], &[1.0, 0.0, 3.0, 0.0]), 0.5);
    }

    #[test]
    fn hellinger_identical_distributions() {
        let p = [0.25_f32, 0.25, 0.5];
        assert!(hellinger(&p, &p) < 1e-3);
    }

    #[test]
    fn hellinger_negative_input_is_nan() {
        assert!(hellinger(&[-1.0, 2.0], &[1.0, 2.0]).is_nan());
    }

    #[test]
    fn correlation_of_shifted_copy_is_zero() {
        let a = [1.0_f32, 2.0, 3.0, 4.0];
        let b = [11.0_f32, 12.0, 13.0, 14.0];
        assert!(correlation(&a, &b) < 1e-5);
    }

    #[test]
    fn bray_curtis_disjoint() {
        assert_eq!(bray_curtis(&[1.0, 0.0], &[0.0, 1.0]), 1.0);
    }
}
