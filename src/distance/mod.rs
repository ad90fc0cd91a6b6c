//! Distance metrics over dense and sparse points.
//!
//! Every metric is a pure, deterministic, symmetric function of two points of
//! the same representation. Each has a dense kernel in [`dense`] and, where
//! one can be written without densifying, a sparse kernel in [`sparse`] that
//! walks only the non-zeros of both inputs.
//!
//! ## Important nuance
//!
//! Not every entry here is a true metric. [`Metric::SquaredEuclidean`] breaks
//! the triangle inequality, and [`Metric::Dice`] and [`Metric::Cosine`] are
//! semimetrics. NN-Descent does not rely on the triangle inequality, so all of
//! them build valid graphs; expect somewhat lower recall on the non-metric
//! ones. [`Metric::Hellinger`] assumes non-negative inputs and yields NaN
//! otherwise, which aborts a build.
//!
//! Metrics are resolved by name once, at configuration time:
//!
//! ```rust
//! use nndescent::distance::Metric;
//!
//! let m: Metric = "l2".parse()?;
//! assert_eq!(m, Metric::Euclidean);
//! assert!("unknown".parse::<Metric>().is_err());
//! # Ok::<(), nndescent::RetrieveError>(())
//! ```

pub mod dense;
pub mod sparse;

use crate::point::{PointKind, PointRef};
use crate::{Result, RetrieveError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named distance function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Euclidean (L2) distance.
    Euclidean,
    /// Squared Euclidean distance. Not a metric.
    SquaredEuclidean,
    /// Manhattan (L1) distance.
    Manhattan,
    /// Chebyshev (L-infinity) distance.
    Chebyshev,
    /// Cosine distance $1 - \cos(a,b)$; zero vectors are at distance 1 from
    /// everything but each other.
    Cosine,
    /// Pearson correlation distance. Dense only.
    Correlation,
    /// Jaccard distance over the non-zero supports.
    Jaccard,
    /// Dice dissimilarity over the non-zero supports.
    Dice,
    /// Fraction of coordinates that differ.
    Hamming,
    /// Hellinger distance for non-negative (e.g. probability) vectors.
    Hellinger,
    /// Bray-Curtis dissimilarity.
    BrayCurtis,
}

impl Metric {
    pub const ALL: [Metric; 11] = [
        Metric::Euclidean,
        Metric::SquaredEuclidean,
        Metric::Manhattan,
        Metric::Chebyshev,
        Metric::Cosine,
        Metric::Correlation,
        Metric::Jaccard,
        Metric::Dice,
        Metric::Hamming,
        Metric::Hellinger,
        Metric::BrayCurtis,
    ];

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::SquaredEuclidean => "sqeuclidean",
            Metric::Manhattan => "manhattan",
            Metric::Chebyshev => "chebyshev",
            Metric::Cosine => "cosine",
            Metric::Correlation => "correlation",
            Metric::Jaccard => "jaccard",
            Metric::Dice => "dice",
            Metric::Hamming => "hamming",
            Metric::Hellinger => "hellinger",
            Metric::BrayCurtis => "bray_curtis",
        }
    }

    /// Whether a kernel exists for points of `kind`.
    pub fn supports(self, kind: PointKind) -> bool {
        match kind {
            PointKind::Dense => true,
            PointKind::Sparse => !matches!(self, Metric::Correlation),
        }
    }

    /// Fail with [`RetrieveError::UnsupportedMetric`] unless [`Metric::supports`].
    pub fn check_supports(self, kind: PointKind) -> Result<()> {
        if self.supports(kind) {
            Ok(())
        } else {
            Err(RetrieveError::UnsupportedMetric {
                metric: self.name().to_string(),
                kind,
            })
        }
    }

    /// Whether random projection trees should split on angles rather than
    /// on perpendicular bisectors.
    pub fn is_angular(self) -> bool {
        matches!(
            self,
            Metric::Cosine | Metric::Correlation | Metric::Hellinger | Metric::Jaccard | Metric::Dice
        )
    }

    /// Whether the triangle inequality holds.
    pub fn is_true_metric(self) -> bool {
        !matches!(self, Metric::SquaredEuclidean | Metric::Cosine | Metric::Dice)
    }

    /// Compute the distance between two points.
    ///
    /// `dimension` is the dense length or the declared sparse dimensionality
    /// (only the normalised metrics read it). If the representations differ,
    /// or the metric has no sparse kernel, this returns `f32::INFINITY` so the
    /// pair is never selected as neighbors; the index rejects such inputs
    /// before they reach this point.
    #[inline]
    #[must_use]
    pub fn distance(self, a: PointRef<'_>, b: PointRef<'_>, dimension: usize) -> f32 {
        match (a, b) {
            (PointRef::Dense(a), PointRef::Dense(b)) => self.dense_distance(a, b),
            (PointRef::Sparse(a), PointRef::Sparse(b)) => match self {
                Metric::Euclidean => sparse::euclidean(a, b),
                Metric::SquaredEuclidean => sparse::squared_euclidean(a, b),
                Metric::Manhattan => sparse::manhattan(a, b),
                Metric::Chebyshev => sparse::chebyshev(a, b),
                Metric::Cosine => sparse::cosine(a, b),
                Metric::Correlation => f32::INFINITY,
                Metric::Jaccard => sparse::jaccard(a, b),
                Metric::Dice => sparse::dice(a, b),
                Metric::Hamming => sparse::hamming(a, b, dimension),
                Metric::Hellinger => sparse::hellinger(a, b),
                Metric::BrayCurtis => sparse::bray_curtis(a, b),
            },
            _ => f32::INFINITY,
        }
    }

    /// Dense kernel dispatch. Mismatched lengths yield `f32::INFINITY`.
    #[inline]
    #[must_use]
    pub fn dense_distance(self, a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return f32::INFINITY;
        }
        match self {
            Metric::Euclidean => dense::euclidean(a, b),
            Metric::SquaredEuclidean => dense::squared_euclidean(a, b),
            Metric::Manhattan => dense::manhattan(a, b),
            Metric::Chebyshev => dense::chebyshev(a, b),
            Metric::Cosine => dense::cosine(a, b),
            Metric::Correlation => dense::correlation(a, b),
            Metric::Jaccard => dense::jaccard(a, b),
            Metric::Dice => dense::dice(a, b),
            Metric::Hamming => dense::hamming(a, b),
            Metric::Hellinger => dense::hellinger(a, b),
            Metric::BrayCurtis => dense::bray_curtis(a, b),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = RetrieveError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let metric = match normalized.as_str() {
            "euclidean" | "l2" => Metric::Euclidean,
            "sqeuclidean" | "squared_euclidean" => Metric::SquaredEuclidean,
            "manhattan" | "l1" | "taxicab" | "cityblock" => Metric::Manhattan,
            "chebyshev" | "linf" | "linfinity" | "infinity" => Metric::Chebyshev,
            "cosine" => Metric::Cosine,
            "correlation" => Metric::Correlation,
            "jaccard" => Metric::Jaccard,
            "dice" => Metric::Dice,
            "hamming" => Metric::Hamming,
            "hellinger" => Metric::Hellinger,
            "bray_curtis" | "braycurtis" => Metric::BrayCurtis,
            _ => {
                return Err(RetrieveError::Config(format!("unknown metric `{s}`")));
            }
        };
        Ok(metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for m in Metric::ALL {
            assert_eq!(m.name().parse::<Metric>().unwrap(), m);
        }
    }

    #[test]
    fn aliases_resolve() {
        assert_eq!("L1".parse::<Metric>().unwrap(), Metric::Manhattan);
        assert_eq!("bray-curtis".parse::<Metric>().unwrap(), Metric::BrayCurtis);
        assert_eq!("linfinity".parse::<Metric>().unwrap(), Metric::Chebyshev);
    }

    #[test]
    fn unknown_name_is_config_error() {
        let err = "minkowski-ish".parse::<Metric>().unwrap_err();
        assert!(matches!(err, RetrieveError::Config(_)));
    }

    #[test]
    fn correlation_is_dense_only() {
        assert!(Metric::Correlation.supports(PointKind::Dense));
        assert!(matches!(
            Metric::Correlation.check_supports(PointKind::Sparse),
            Err(RetrieveError::UnsupportedMetric { .. })
        ));
        assert!(Metric::Cosine.check_supports(PointKind::Sparse).is_ok());
    }

    #[test]
    fn mixed_kinds_are_infinitely_far() {
        let a = PointRef::Dense(&[1.0, 0.0]);
        let b = PointRef::sparse(&[0], &[1.0]);
        assert_eq!(Metric::Euclidean.distance(a, b, 2), f32::INFINITY);
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&Metric::BrayCurtis).unwrap();
        assert_eq!(json, "\"bray_curtis\"");
    }
}
