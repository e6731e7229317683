//! Bucketed k-d tree over N-dimensional `f64` points.
//!
//! The tree is built by incremental insertion. Points land in leaf buckets;
//! when a bucket grows past its capacity it is split at the midpoint of its
//! widest (optionally weighted) axis. Every node keeps the axis-aligned
//! bounding box of the points beneath it, which the query routines in
//! [`search`] use for branch-and-bound pruning.
//!
//! The dimension count is a runtime value and distances are supplied per query
//! as a [`DistanceFn`] strategy, so a single tree type serves 2D, 3D and
//! higher-dimensional data.
//!
//! ## Degenerate buckets
//!
//! A leaf whose points all share one coordinate is flagged `single_point` and
//! is never split: no split value could separate identical points, so the
//! bucket is allowed to grow past capacity instead. A split that would leave
//! one child empty sets the same flag; the next distinct insert clears it.
//!
//! Infinite coordinates are kept. When the midpoint of an axis with an
//! infinite bound is not finite, the split falls back to the lower bound.
//!
//! ## NaN coordinates
//!
//! A `NaN` coordinate poisons the bound of every node on its insertion path for
//! that axis. Such an axis is never chosen for splitting and contributes
//! nothing to rectangle distances, so the branch is simply never pruned.
//!
//! ## Concurrency
//!
//! Queries take `&self` and keep all traversal state in a per-call
//! [`SearchScratch`], so a fully built tree can be shared across threads.

mod distance;
mod search;

pub use distance::{
    squared_euclidean_for, DistanceFn, SquaredEuclidean, SquaredEuclidean2D, SquaredEuclidean3D,
    WeightedSquaredEuclidean,
};
pub use search::{Neighbor, SearchScratch};

use crate::error::{Error, Result};

/// Default leaf bucket capacity.
pub const DEFAULT_BUCKET_SIZE: usize = 24;

/// Construction parameters for a [`KdTree`].
#[derive(Debug, Clone)]
pub struct KdTreeParams {
    /// Maximum number of points in a leaf before it is split.
    pub bucket_size: usize,
    /// Optional per-dimension weights used when choosing split axes.
    pub weights: Option<Vec<f64>>,
}

impl Default for KdTreeParams {
    fn default() -> Self {
        Self {
            bucket_size: DEFAULT_BUCKET_SIZE,
            weights: None,
        }
    }
}

impl KdTreeParams {
    /// Set the leaf bucket capacity.
    pub fn with_bucket_size(mut self, bucket_size: usize) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    /// Set per-dimension weights.
    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node<T> {
    pub(crate) min: Vec<f64>,
    pub(crate) max: Vec<f64>,
    pub(crate) kind: NodeKind<T>,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind<T> {
    Leaf {
        /// Row-major coordinates, `dims` values per point.
        coords: Vec<f64>,
        values: Vec<T>,
        single_point: bool,
    },
    Stem {
        dim: usize,
        split: f64,
        left: usize,
        right: usize,
    },
}

/// A k-d tree mapping N-dimensional points to payloads of type `T`.
#[derive(Debug, Clone)]
pub struct KdTree<T> {
    dims: usize,
    bucket_size: usize,
    weights: Option<Vec<f64>>,
    /// Arena; the root is always node 0.
    pub(crate) nodes: Vec<Node<T>>,
    len: usize,
}

impl<T> KdTree<T> {
    /// Create an empty tree with default parameters.
    pub fn new(dims: usize) -> Result<Self> {
        Self::with_params(dims, KdTreeParams::default())
    }

    /// Create an empty tree with explicit parameters.
    pub fn with_params(dims: usize, params: KdTreeParams) -> Result<Self> {
        if dims == 0 {
            return Err(Error::InvalidParameter {
                name: "dims",
                message: "must be at least 1",
            });
        }
        if params.bucket_size == 0 {
            return Err(Error::InvalidParameter {
                name: "bucket_size",
                message: "must be at least 1",
            });
        }
        if let Some(w) = &params.weights {
            if w.len() != dims {
                return Err(Error::DimensionMismatch {
                    expected: dims,
                    found: w.len(),
                });
            }
            if w.iter().any(|x| !x.is_finite() || *x < 0.0) {
                return Err(Error::InvalidParameter {
                    name: "weights",
                    message: "must be finite and non-negative",
                });
            }
        }

        Ok(Self {
            dims,
            bucket_size: params.bucket_size,
            weights: params.weights,
            nodes: vec![empty_leaf(dims)],
            len: 0,
        })
    }

    /// Number of dimensions.
    pub fn dimensions(&self) -> usize {
        self.dims
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no points.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Leaf bucket capacity.
    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Per-dimension weights, if configured.
    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    /// Bounding box `(min, max)` of all stored points, or `None` if empty.
    pub fn bounds(&self) -> Option<(&[f64], &[f64])> {
        if self.is_empty() {
            return None;
        }
        let root = &self.nodes[0];
        Some((&root.min, &root.max))
    }

    /// The squared Euclidean strategy matching this tree's dimensionality and weights.
    pub fn distance_fn(&self) -> Box<dyn DistanceFn> {
        squared_euclidean_for(self.dims, self.weights.as_deref())
    }

    /// Number of nodes (stems and leaves).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Insert a point with its payload.
    pub fn insert(&mut self, coords: &[f64], value: T) -> Result<()> {
        if coords.len() != self.dims {
            return Err(Error::DimensionMismatch {
                expected: self.dims,
                found: coords.len(),
            });
        }

        let mut idx = 0;
        loop {
            let node = &mut self.nodes[idx];
            extend_bounds(&mut node.min, &mut node.max, coords);
            match node.kind {
                NodeKind::Stem {
                    dim,
                    split,
                    left,
                    right,
                } => {
                    idx = if coords[dim] <= split { left } else { right };
                }
                NodeKind::Leaf { .. } => break,
            }
        }

        let overfull = match &mut self.nodes[idx].kind {
            NodeKind::Leaf {
                coords: stored,
                values,
                single_point,
            } => {
                if *single_point && !stored.is_empty() && stored[..self.dims] != *coords {
                    *single_point = false;
                }
                stored.extend_from_slice(coords);
                values.push(value);
                values.len() > self.bucket_size && !*single_point
            }
            NodeKind::Stem { .. } => unreachable!("descent always ends at a leaf"),
        };
        self.len += 1;

        if overfull {
            self.split(idx);
        }
        Ok(())
    }

    /// Iterate over all stored `(coords, value)` pairs in leaf order.
    pub fn iter(&self) -> impl Iterator<Item = (&[f64], &T)> + '_ {
        let dims = self.dims;
        self.nodes.iter().flat_map(move |node| {
            let (coords, values) = match &node.kind {
                NodeKind::Leaf { coords, values, .. } => (coords.as_slice(), values.as_slice()),
                NodeKind::Stem { .. } => (&[][..], &[][..]),
            };
            coords.chunks_exact(dims).zip(values.iter())
        })
    }

    /// Split an overfull leaf, then any child that is still overfull.
    fn split(&mut self, leaf: usize) {
        let mut work = vec![leaf];
        while let Some(idx) = work.pop() {
            let node = &self.nodes[idx];
            let (count, single_point) = match &node.kind {
                NodeKind::Leaf {
                    values,
                    single_point,
                    ..
                } => (values.len(), *single_point),
                NodeKind::Stem { .. } => continue,
            };
            if count <= self.bucket_size || single_point {
                continue;
            }
            let Some(dim) = self.split_dim(&node.min, &node.max) else {
                continue;
            };

            let lo = node.min[dim];
            let hi = node.max[dim];
            let mut split = lo * 0.5 + hi * 0.5;
            if !split.is_finite() || split >= hi {
                // Adjacent floats round the midpoint up onto `hi`; infinite
                // bounds give an infinite or NaN midpoint.
                split = lo;
            }

            let NodeKind::Leaf { coords, .. } = &node.kind else {
                continue;
            };
            let left_count = coords
                .chunks_exact(self.dims)
                .filter(|p| p[dim] <= split)
                .count();
            if left_count == 0 || left_count == count {
                // No split value separates these points.
                if let NodeKind::Leaf { single_point, .. } = &mut self.nodes[idx].kind {
                    *single_point = true;
                }
                continue;
            }

            let placeholder = NodeKind::Stem {
                dim,
                split,
                left: 0,
                right: 0,
            };
            let NodeKind::Leaf { coords, values, .. } =
                std::mem::replace(&mut self.nodes[idx].kind, placeholder)
            else {
                unreachable!("checked to be a leaf above");
            };

            let mut left = empty_leaf(self.dims);
            let mut right = empty_leaf(self.dims);
            for (p, v) in coords.chunks_exact(self.dims).zip(values) {
                let target = if p[dim] <= split { &mut left } else { &mut right };
                push_into_leaf(target, p, v);
            }

            let left_idx = self.nodes.len();
            let right_idx = left_idx + 1;
            self.nodes.push(left);
            self.nodes.push(right);
            self.nodes[idx].kind = NodeKind::Stem {
                dim,
                split,
                left: left_idx,
                right: right_idx,
            };
            work.push(left_idx);
            work.push(right_idx);
        }
    }

    /// Axis of maximum weighted extent, ignoring zero-width and `NaN` axes.
    ///
    /// Falls back to raw extent when every weighted extent is zero.
    fn split_dim(&self, min: &[f64], max: &[f64]) -> Option<usize> {
        let widest = |weighted: bool| {
            let mut best: Option<(usize, f64)> = None;
            for d in 0..self.dims {
                let w = match (&self.weights, weighted) {
                    (Some(ws), true) => ws[d],
                    _ => 1.0,
                };
                let extent = w * (max[d] - min[d]);
                // NaN extents fail this comparison and are skipped.
                if extent > best.map_or(0.0, |b| b.1) {
                    best = Some((d, extent));
                }
            }
            best.map(|b| b.0)
        };
        widest(true).or_else(|| widest(false))
    }
}

fn empty_leaf<T>(dims: usize) -> Node<T> {
    Node {
        min: vec![f64::INFINITY; dims],
        max: vec![f64::NEG_INFINITY; dims],
        kind: NodeKind::Leaf {
            coords: Vec::new(),
            values: Vec::new(),
            single_point: true,
        },
    }
}

fn push_into_leaf<T>(node: &mut Node<T>, coords: &[f64], value: T) {
    extend_bounds(&mut node.min, &mut node.max, coords);
    if let NodeKind::Leaf {
        coords: stored,
        values,
        single_point,
    } = &mut node.kind
    {
        if *single_point && !stored.is_empty() && stored[..coords.len()] != *coords {
            *single_point = false;
        }
        stored.extend_from_slice(coords);
        values.push(value);
    }
}

/// Grow `[min, max]` to include `p`. A `NaN` coordinate makes that axis `NaN` for good.
#[inline]
fn extend_bounds(min: &mut [f64], max: &mut [f64], p: &[f64]) {
    for ((lo, hi), &v) in min.iter_mut().zip(max.iter_mut()).zip(p) {
        if v.is_nan() {
            *lo = f64::NAN;
            *hi = f64::NAN;
        } else if !lo.is_nan() {
            if v < *lo {
                *lo = v;
            }
            if v > *hi {
                *hi = v;
            }
        }
    }
}
