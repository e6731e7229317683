//! Distance strategies used by [`KdTree`](super::KdTree) queries.
//!
//! Every strategy answers two questions: the distance between two points, and
//! a lower bound on the distance from a point to any point inside an
//! axis-aligned rectangle. The second is what makes branch-and-bound pruning
//! possible, so it must never overestimate.
//!
//! All built-in strategies return *squared* Euclidean distances; radii passed to
//! range queries are therefore squared radii as well.

/// A point-to-point distance with a matching point-to-rectangle lower bound.
pub trait DistanceFn: Send + Sync {
    /// Distance between `a` and `b` (equal length slices).
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;

    /// Smallest possible distance from `point` to anything inside `[min, max]`.
    ///
    /// `NaN` bounds or coordinates must contribute `0` so that the affected
    /// branch is never pruned.
    fn distance_to_rect(&self, point: &[f64], min: &[f64], max: &[f64]) -> f64;
}

impl<D: DistanceFn + ?Sized> DistanceFn for &D {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        (**self).distance(a, b)
    }

    #[inline]
    fn distance_to_rect(&self, point: &[f64], min: &[f64], max: &[f64]) -> f64 {
        (**self).distance_to_rect(point, min, max)
    }
}

impl<D: DistanceFn + ?Sized> DistanceFn for Box<D> {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        (**self).distance(a, b)
    }

    #[inline]
    fn distance_to_rect(&self, point: &[f64], min: &[f64], max: &[f64]) -> f64 {
        (**self).distance_to_rect(point, min, max)
    }
}

/// Gap between `p` and the interval `[lo, hi]` along one axis.
///
/// Comparisons against `NaN` are false, so a `NaN` anywhere yields `0`.
#[inline]
pub(crate) fn axis_gap(p: f64, lo: f64, hi: f64) -> f64 {
    if p < lo {
        lo - p
    } else if p > hi {
        p - hi
    } else {
        0.0
    }
}

/// Squared Euclidean distance in any dimension.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclidean;

impl DistanceFn for SquaredEuclidean {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| {
                let d = x - y;
                d * d
            })
            .sum()
    }

    #[inline]
    fn distance_to_rect(&self, point: &[f64], min: &[f64], max: &[f64]) -> f64 {
        point
            .iter()
            .zip(min.iter().zip(max.iter()))
            .map(|(&p, (&lo, &hi))| {
                let g = axis_gap(p, lo, hi);
                g * g
            })
            .sum()
    }
}

/// Squared Euclidean distance unrolled for 2D points.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclidean2D;

impl DistanceFn for SquaredEuclidean2D {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        let dx = a[0] - b[0];
        let dy = a[1] - b[1];
        dx * dx + dy * dy
    }

    #[inline]
    fn distance_to_rect(&self, point: &[f64], min: &[f64], max: &[f64]) -> f64 {
        let gx = axis_gap(point[0], min[0], max[0]);
        let gy = axis_gap(point[1], min[1], max[1]);
        gx * gx + gy * gy
    }
}

/// Squared Euclidean distance unrolled for 3D points.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclidean3D;

impl DistanceFn for SquaredEuclidean3D {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        let dx = a[0] - b[0];
        let dy = a[1] - b[1];
        let dz = a[2] - b[2];
        dx * dx + dy * dy + dz * dz
    }

    #[inline]
    fn distance_to_rect(&self, point: &[f64], min: &[f64], max: &[f64]) -> f64 {
        let gx = axis_gap(point[0], min[0], max[0]);
        let gy = axis_gap(point[1], min[1], max[1]);
        let gz = axis_gap(point[2], min[2], max[2]);
        gx * gx + gy * gy + gz * gz
    }
}

/// Squared Euclidean distance with a per-dimension weight applied to each difference.
///
/// `d(a, b) = Σ (w[i] * (a[i] - b[i]))²`
#[derive(Debug, Clone)]
pub struct WeightedSquaredEuclidean {
    weights: Vec<f64>,
}

impl WeightedSquaredEuclidean {
    /// Create a weighted metric. The weight slice length fixes the dimensionality.
    pub fn new(weights: Vec<f64>) -> Self {
        Self { weights }
    }

    /// Per-dimension weights.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl DistanceFn for WeightedSquaredEuclidean {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), self.weights.len());
        a.iter()
            .zip(b.iter())
            .zip(self.weights.iter())
            .map(|((x, y), w)| {
                let d = w * (x - y);
                d * d
            })
            .sum()
    }

    #[inline]
    fn distance_to_rect(&self, point: &[f64], min: &[f64], max: &[f64]) -> f64 {
        point
            .iter()
            .zip(min.iter().zip(max.iter()))
            .zip(self.weights.iter())
            .map(|((&p, (&lo, &hi)), w)| {
                let g = w * axis_gap(p, lo, hi);
                g * g
            })
            .sum()
    }
}

/// Pick the squared Euclidean strategy for a dimensionality.
///
/// Weighted metrics are used as-is; otherwise 2D and 3D get the unrolled variants.
pub fn squared_euclidean_for(dims: usize, weights: Option<&[f64]>) -> Box<dyn DistanceFn> {
    match (weights, dims) {
        (Some(w), _) => Box::new(WeightedSquaredEuclidean::new(w.to_vec())),
        (None, 2) => Box::new(SquaredEuclidean2D),
        (None, 3) => Box::new(SquaredEuclidean3D),
        (None, _) => Box::new(SquaredEuclidean),
    }
}
