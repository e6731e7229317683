//! Point storage and the index-backed neighbourhood queries used by clustering.
//!
//! A [`PointSet`] holds coordinates from parallel `x`/`y`/`z` arrays (or rows)
//! in a flat row-major buffer. A [`PointSpace`] indexes a point set once in a
//! [`KdTree`] keyed by original point index and answers the per-point queries a
//! clustering run needs. Both are read-only after construction.
//!
//! Distances reported here are plain (weighted) Euclidean distances; the tree
//! itself works in squared units.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::kdtree::{DistanceFn, KdTree, KdTreeParams, SearchScratch};

/// Coordinates of `n` points in `dims` dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    dims: usize,
    coords: Vec<f64>,
}

impl PointSet {
    /// Points from parallel `x` and `y` arrays.
    pub fn from_xy(x: &[f32], y: &[f32]) -> Result<Self> {
        check_len("y", x.len(), y.len())?;
        let coords = x
            .iter()
            .zip(y)
            .flat_map(|(&a, &b)| [f64::from(a), f64::from(b)])
            .collect();
        Ok(Self { dims: 2, coords })
    }

    /// Points from parallel `x`, `y` and `z` arrays.
    pub fn from_xyz(x: &[f32], y: &[f32], z: &[f32]) -> Result<Self> {
        check_len("y", x.len(), y.len())?;
        check_len("z", x.len(), z.len())?;
        let coords = x
            .iter()
            .zip(y)
            .zip(z)
            .flat_map(|((&a, &b), &c)| [f64::from(a), f64::from(b), f64::from(c)])
            .collect();
        Ok(Self { dims: 3, coords })
    }

    /// Points from rows of equal length.
    ///
    /// An empty slice gives an empty two-dimensional set.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Ok(Self {
                dims: 2,
                coords: Vec::new(),
            });
        };
        let dims = first.len();
        if dims == 0 {
            return Err(Error::InvalidParameter {
                name: "dimension",
                message: "must be at least 1",
            });
        }
        let mut coords = Vec::with_capacity(rows.len() * dims);
        for row in rows {
            if row.len() != dims {
                return Err(Error::DimensionMismatch {
                    expected: dims,
                    found: row.len(),
                });
            }
            coords.extend(row.iter().map(|&v| f64::from(v)));
        }
        Ok(Self { dims, coords })
    }

    /// Points from a flat row-major `f64` buffer.
    pub fn from_flat(dims: usize, coords: Vec<f64>) -> Result<Self> {
        if dims == 0 {
            return Err(Error::InvalidParameter {
                name: "dimension",
                message: "must be at least 1",
            });
        }
        if coords.len() % dims != 0 {
            return Err(Error::LengthMismatch {
                name: "coords",
                expected: coords.len() / dims * dims,
                found: coords.len(),
            });
        }
        Ok(Self { dims, coords })
    }

    /// Number of dimensions.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.coords.len() / self.dims
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Coordinates of point `i`.
    pub fn point(&self, i: usize) -> &[f64] {
        &self.coords[i * self.dims..(i + 1) * self.dims]
    }

    /// Iterate over point coordinates in index order.
    pub fn iter(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.coords.chunks_exact(self.dims)
    }

    /// `(volume, axes)` of the axis-aligned bounding box, ignoring `NaN` coordinates.
    ///
    /// Zero-width axes are skipped so that flat data (e.g. all `z == 0`) still
    /// reports the area of the populated axes; `axes` counts the axes used.
    /// Returns `(0.0, 0)` when every axis is flat.
    pub fn bounding_volume(&self) -> (f64, usize) {
        let mut min = vec![f64::INFINITY; self.dims];
        let mut max = vec![f64::NEG_INFINITY; self.dims];
        for p in self.iter() {
            for d in 0..self.dims {
                if p[d] < min[d] {
                    min[d] = p[d];
                }
                if p[d] > max[d] {
                    max[d] = p[d];
                }
            }
        }
        let mut volume = 1.0;
        let mut used = 0;
        for d in 0..self.dims {
            let extent = max[d] - min[d];
            if extent > 0.0 && extent.is_finite() {
                volume *= extent;
                used += 1;
            }
        }
        if used == 0 {
            (0.0, 0)
        } else {
            (volume, used)
        }
    }
}

fn check_len(name: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(Error::LengthMismatch {
            name,
            expected,
            found,
        });
    }
    Ok(())
}

/// A [`PointSet`] indexed for neighbourhood queries.
pub struct PointSpace {
    points: Arc<PointSet>,
    tree: KdTree<usize>,
    dist: Box<dyn DistanceFn>,
}

impl std::fmt::Debug for PointSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointSpace")
            .field("len", &self.len())
            .field("dims", &self.dims())
            .field("nodes", &self.tree.node_count())
            .finish()
    }
}

impl PointSpace {
    /// Index `points` with default tree parameters.
    pub fn new(points: PointSet) -> Result<Self> {
        Self::with_params(points, KdTreeParams::default())
    }

    /// Index `points` with explicit tree parameters (bucket size, axis weights).
    pub fn with_params(points: PointSet, params: KdTreeParams) -> Result<Self> {
        let mut tree = KdTree::with_params(points.dims(), params)?;
        for (i, p) in points.iter().enumerate() {
            tree.insert(p, i)?;
        }
        let dist = tree.distance_fn();
        debug!(
            points = points.len(),
            dims = points.dims(),
            nodes = tree.node_count(),
            "built spatial index"
        );
        Ok(Self {
            points: Arc::new(points),
            tree,
            dist,
        })
    }

    /// Shared handle to the indexed coordinates.
    pub fn points(&self) -> &Arc<PointSet> {
        &self.points
    }

    /// The underlying tree (payload = original point index).
    pub fn tree(&self) -> &KdTree<usize> {
        &self.tree
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether there are no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of dimensions.
    pub fn dims(&self) -> usize {
        self.points.dims()
    }

    /// Euclidean (weighted, if configured) distance between points `i` and `j`.
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.dist
            .distance(self.points.point(i), self.points.point(j))
            .sqrt()
    }

    /// Collect `(index, distance)` for every point within `radius` of point `i`,
    /// the point itself included, into `out` (cleared first).
    pub fn neighbors_within(
        &self,
        i: usize,
        radius: f64,
        scratch: &mut SearchScratch,
        out: &mut Vec<(usize, f64)>,
    ) -> Result<()> {
        out.clear();
        self.tree.for_each_within(
            self.points.point(i),
            radius * radius,
            &self.dist,
            scratch,
            |n| out.push((*n.value, n.distance.sqrt())),
        )
    }

    /// The `k` nearest points to point `i` (itself included), nearest first.
    pub fn nearest(&self, i: usize, k: usize) -> Result<Vec<(usize, f64)>> {
        let hits = self.tree.nearest(self.points.point(i), k, &self.dist)?;
        Ok(hits
            .into_iter()
            .map(|n| (*n.value, n.distance.sqrt()))
            .collect())
    }
}
