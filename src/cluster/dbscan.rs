//! DBSCAN: Density-Based Spatial Clustering of Applications with Noise.
//!
//! # The Algorithm (Ester et al., 1996)
//!
//! DBSCAN groups points based on neighborhood density. Unlike k-means, it:
//!
//! - Discovers clusters of arbitrary shape
//! - Automatically determines the number of clusters
//! - Identifies noise points (outliers)
//!
//! ## Core Concepts
//!
//! - **Epsilon (ε)**: Maximum distance between two points to be neighbors.
//! - **MinPts**: Minimum neighbors within ε (the point itself included) for a
//!   point to be "core".
//! - **Core point**: Has at least MinPts neighbors within ε.
//! - **Border point**: Within ε of a core point but not core itself.
//! - **Noise point**: Neither core nor border.
//!
//! ## Algorithm Steps
//!
//! 1. For each unvisited point P:
//!    - Find neighbors within ε
//!    - If |neighbors| < MinPts, mark as noise (may change later)
//!    - Else P is core: start new cluster, expand from neighbors
//!
//! 2. Expansion: For each core point's neighbors:
//!    - Add to cluster
//!    - If core, expand from it as well (work queue, no recursion)
//!
//! ## Complexity
//!
//! Neighborhood queries go through a [`PointSpace`] k-d tree, so the run is
//! roughly O(n log n) for well-spread data instead of the naive O(n²).
//!
//! ## References
//!
//! Ester et al. (1996). "A Density-Based Algorithm for Discovering Clusters
//! in Large Spatial Databases with Noise." KDD-96.

use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use super::result::{Assignment, ClusteringResult, Membership};
use super::traits::Clustering;
use crate::error::{Error, Result};
use crate::hull::{Bounds, Hull};
use crate::kdtree::{KdTreeParams, SearchScratch};
use crate::space::{PointSet, PointSpace};

/// Cluster id used for noise.
pub const NOISE: usize = 0;

/// DBSCAN clustering algorithm.
#[derive(Debug, Clone)]
pub struct Dbscan {
    /// Epsilon: maximum distance for neighborhood.
    epsilon: f64,
    /// Minimum points for core point classification.
    min_pts: usize,
    /// Index construction parameters.
    index: KdTreeParams,
}

/// One visited point, in visiting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbscanOrder {
    /// Original index of the point.
    pub parent: usize,
    /// Number of points within ε, the point itself included.
    pub count: usize,
    /// Cluster id from the full (core and border) run.
    pub cluster_id: usize,
}

impl Dbscan {
    /// Create a new DBSCAN clusterer.
    ///
    /// # Arguments
    ///
    /// * `epsilon` - Maximum distance between two points to be neighbors.
    /// * `min_pts` - Minimum number of points (itself included) to form a dense region.
    ///
    /// # Typical Values
    ///
    /// - `epsilon`: Often determined by k-distance plot (k = min_pts - 1).
    /// - `min_pts`: 2 * dimension is a common heuristic.
    pub fn new(epsilon: f64, min_pts: usize) -> Self {
        Self {
            epsilon,
            min_pts,
            index: KdTreeParams::default(),
        }
    }

    /// Set epsilon (neighborhood radius).
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set minimum points for core classification.
    pub fn with_min_pts(mut self, min_pts: usize) -> Self {
        self.min_pts = min_pts;
        self
    }

    /// Set the spatial index parameters (bucket size, axis weights).
    pub fn with_index_params(mut self, index: KdTreeParams) -> Self {
        self.index = index;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                message: "must be positive and finite",
            });
        }
        if self.min_pts == 0 {
            return Err(Error::InvalidParameter {
                name: "min_pts",
                message: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Cluster points from parallel `x`/`y` arrays.
    pub fn run_xy(&self, x: &[f32], y: &[f32]) -> Result<DbscanResult> {
        self.validate()?;
        self.run(&PointSpace::with_params(PointSet::from_xy(x, y)?, self.index.clone())?)
    }

    /// Cluster points from parallel `x`/`y`/`z` arrays.
    pub fn run_xyz(&self, x: &[f32], y: &[f32], z: &[f32]) -> Result<DbscanResult> {
        self.validate()?;
        self.run(&PointSpace::with_params(PointSet::from_xyz(x, y, z)?, self.index.clone())?)
    }

    /// Cluster an already indexed point space.
    pub fn run(&self, space: &PointSpace) -> Result<DbscanResult> {
        self.validate()?;

        let n = space.len();
        let mut ids = vec![NOISE; n];
        let mut counts = vec![0usize; n];
        let mut visited = vec![false; n];
        let mut order: Vec<usize> = Vec::with_capacity(n);
        let mut scratch = SearchScratch::new();
        let mut neighbors: Vec<(usize, f64)> = Vec::new();
        let mut to_process: Vec<usize> = Vec::new();
        let mut cluster_id = NOISE;

        for point_idx in 0..n {
            if visited[point_idx] {
                continue;
            }
            visited[point_idx] = true;
            order.push(point_idx);

            space.neighbors_within(point_idx, self.epsilon, &mut scratch, &mut neighbors)?;
            counts[point_idx] = neighbors.len();

            if neighbors.len() < self.min_pts {
                // Not enough neighbors: noise for now, may become a border point later.
                continue;
            }

            cluster_id += 1;
            ids[point_idx] = cluster_id;
            to_process.clear();
            to_process.extend(neighbors.iter().map(|&(j, _)| j).filter(|&j| j != point_idx));

            while let Some(neighbor_idx) = to_process.pop() {
                // Noise seen earlier can still be claimed as a border point, so
                // label before checking `visited`.
                if ids[neighbor_idx] == NOISE {
                    ids[neighbor_idx] = cluster_id;
                }
                if visited[neighbor_idx] {
                    continue;
                }
                visited[neighbor_idx] = true;
                order.push(neighbor_idx);

                space.neighbors_within(neighbor_idx, self.epsilon, &mut scratch, &mut neighbors)?;
                counts[neighbor_idx] = neighbors.len();
                if neighbors.len() >= self.min_pts {
                    to_process.extend(
                        neighbors
                            .iter()
                            .map(|&(j, _)| j)
                            .filter(|&j| !visited[j] || ids[j] == NOISE),
                    );
                }
            }
        }

        debug!(
            points = n,
            clusters = cluster_id,
            epsilon = self.epsilon,
            min_pts = self.min_pts,
            "dbscan finished"
        );

        let order = order
            .into_iter()
            .map(|p| DbscanOrder {
                parent: p,
                count: counts[p],
                cluster_id: ids[p],
            })
            .collect();
        Ok(DbscanResult {
            min_pts: self.min_pts,
            epsilon: self.epsilon,
            order,
            counts,
            full_ids: ids.clone(),
            num_full_clusters: cluster_id,
            assignment: Assignment::new(Arc::clone(space.points()), ids, cluster_id, Membership::Flat),
        })
    }
}

impl Default for Dbscan {
    fn default() -> Self {
        Self::new(0.5, 5)
    }
}

impl Clustering for Dbscan {
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>> {
        self.validate()?;
        let space = PointSpace::with_params(PointSet::from_rows(data)?, self.index.clone())?;
        Ok(self.run(&space)?.cluster_ids().to_vec())
    }
}

/// Extended DBSCAN interface with noise detection.
pub trait DbscanExt {
    /// Fit and predict, returning labels where noise is marked as `None`.
    fn fit_predict_with_noise(&self, data: &[Vec<f32>]) -> Result<Vec<Option<usize>>>;

    /// Check if a label represents noise.
    fn is_noise(label: usize) -> bool {
        label == NOISE
    }
}

impl DbscanExt for Dbscan {
    fn fit_predict_with_noise(&self, data: &[Vec<f32>]) -> Result<Vec<Option<usize>>> {
        Ok(self
            .fit_predict(data)?
            .into_iter()
            .map(|l| if l == NOISE { None } else { Some(l) })
            .collect())
    }
}

/// Output of a direct DBSCAN run.
#[derive(Debug)]
pub struct DbscanResult {
    min_pts: usize,
    epsilon: f64,
    order: Vec<DbscanOrder>,
    counts: Vec<usize>,
    full_ids: Vec<usize>,
    num_full_clusters: usize,
    assignment: Assignment,
}

impl DbscanResult {
    /// Minimum points used for the run.
    pub fn min_pts(&self) -> usize {
        self.min_pts
    }

    /// Neighborhood radius used for the run.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Visited points in visiting order.
    pub fn order(&self) -> &[DbscanOrder] {
        &self.order
    }

    /// Whether point `i` had at least `min_pts` neighbors.
    pub fn is_core(&self, i: usize) -> bool {
        self.counts[i] >= self.min_pts
    }

    /// Re-label from the stored run.
    ///
    /// With `core_only`, border points become noise; otherwise the full
    /// labeling is restored. Cluster ids are kept dense. Returns the number
    /// of clusters.
    pub fn extract(&mut self, core_only: bool) -> usize {
        if !core_only {
            self.assignment
                .replace(self.full_ids.clone(), self.num_full_clusters, Membership::Flat);
            return self.num_full_clusters;
        }

        // Every cluster contains its seeding core point, so ids stay dense.
        let ids: Vec<usize> = self
            .full_ids
            .iter()
            .zip(&self.counts)
            .map(|(&c, &count)| if count >= self.min_pts { c } else { NOISE })
            .collect();
        self.assignment
            .replace(ids, self.num_full_clusters, Membership::Flat);
        self.num_full_clusters
    }
}

impl ClusteringResult for DbscanResult {
    fn cluster_ids(&self) -> &[usize] {
        self.assignment.ids()
    }

    fn num_clusters(&self) -> usize {
        self.assignment.num_clusters()
    }

    fn cluster_members(&self, cluster_id: usize) -> Vec<usize> {
        self.assignment.members(cluster_id)
    }

    fn convex_hull(&self, cluster_id: usize) -> Option<&Hull> {
        self.assignment.hull(cluster_id)
    }

    fn bounds(&self, cluster_id: usize) -> Option<&Bounds> {
        self.assignment.bounds(cluster_id)
    }

    fn scramble_clusters<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let map = self.assignment.scramble(rng);
        for id in &mut self.full_ids {
            *id = map[*id];
        }
        for e in &mut self.order {
            e.cluster_id = map[e.cluster_id];
        }
    }
}
