//! Random splitting hyperplanes for dense and sparse points.

use crate::point::PointRef;
use crate::simd;

/// Hyperplane `{x : <normal, x> + offset = 0}`.
///
/// The normal is built from two pivot points drawn from the node being split,
/// so for sparse data it is itself sparse (the union of two supports) and the
/// margin of any point costs one sparse dot product.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Hyperplane {
    normal: Normal,
    offset: f32,
}

#[derive(Debug, Clone, PartialEq)]
enum Normal {
    Dense(Vec<f32>),
    Sparse { indices: Vec<u32>, values: Vec<f32> },
}

impl Hyperplane {
    /// Hyperplane separating `left` from `right`.
    ///
    /// Angular splits use the difference of the unit-normalised pivots and
    /// pass through the origin; Euclidean splits use the perpendicular
    /// bisector of the segment between the pivots. Returns `None` when the
    /// pivots coincide (zero normal).
    pub(crate) fn between(left: PointRef<'_>, right: PointRef<'_>, angular: bool) -> Option<Self> {
        match (left, right) {
            (PointRef::Dense(l), PointRef::Dense(r)) => {
                let (wl, wr) = pivot_weights(simd::norm(l), simd::norm(r), angular);
                let normal: Vec<f32> = l.iter().zip(r).map(|(x, y)| wl * x - wr * y).collect();
                if normal.iter().all(|&v| v == 0.0) {
                    return None;
                }
                let offset = if angular {
                    0.0
                } else {
                    -(simd::dot(&normal, l) + simd::dot(&normal, r)) / 2.0
                };
                Some(Self {
                    normal: Normal::Dense(normal),
                    offset,
                })
            }
            (PointRef::Sparse(l), PointRef::Sparse(r)) => {
                let (wl, wr) = pivot_weights(
                    simd::sparse_norm(l.values),
                    simd::sparse_norm(r.values),
                    angular,
                );
                let (indices, values) =
                    simd::sparse_axpby(wl, l.indices, l.values, -wr, r.indices, r.values);
                if indices.is_empty() {
                    return None;
                }
                let offset = if angular {
                    0.0
                } else {
                    -(simd::sparse_dot(&indices, &values, l.indices, l.values)
                        + simd::sparse_dot(&indices, &values, r.indices, r.values))
                        / 2.0
                };
                Some(Self {
                    normal: Normal::Sparse { indices, values },
                    offset,
                })
            }
            _ => None,
        }
    }

    /// Signed margin of `p`; positive means the left child.
    #[inline]
    pub(crate) fn margin(&self, p: PointRef<'_>) -> f32 {
        let projection = match (&self.normal, p) {
            (Normal::Dense(n), PointRef::Dense(x)) => simd::dot(n, x),
            (Normal::Sparse { indices, values }, PointRef::Sparse(x)) => {
                simd::sparse_dot(indices, values, x.indices, x.values)
            }
            _ => 0.0,
        };
        projection + self.offset
    }

    /// Stored normal coefficients.
    pub(crate) fn nnz(&self) -> usize {
        match &self.normal {
            Normal::Dense(n) => n.len(),
            Normal::Sparse { indices, .. } => indices.len(),
        }
    }

    pub(crate) fn memory_bytes(&self) -> usize {
        match &self.normal {
            Normal::Dense(n) => n.len() * std::mem::size_of::<f32>(),
            Normal::Sparse { indices, values } => {
                indices.len() * std::mem::size_of::<u32>() + values.len() * std::mem::size_of::<f32>()
            }
        }
    }
}

/// Scale factors applied to the two pivots.
#[inline]
fn pivot_weights(norm_l: f32, norm_r: f32, angular: bool) -> (f32, f32) {
    if !angular {
        return (1.0, 1.0);
    }
    let wl = if norm_l > 0.0 { 1.0 / norm_l } else { 1.0 };
    let wr = if norm_r > 0.0 { 1.0 / norm_r } else { 1.0 };
    (wl, wr)
}
