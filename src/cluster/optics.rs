//! OPTICS: Ordering Points To Identify the Clustering Structure.
//!
//! # The Algorithm (Ankerst et al., 1999)
//!
//! OPTICS generalizes DBSCAN. Instead of committing to one radius it visits
//! the points in an order where every point is reached as densely as
//! possible from the points visited before it, and records for each point:
//!
//! - **Core distance**: distance to its `min_pts`-th nearest neighbour (the
//!   point itself counts), undefined if that neighbour lies beyond the
//!   generating distance ε.
//! - **Reachability distance**: `max(core(q), d(q, p))` for the best core
//!   point `q` visited before `p`; undefined for the first point of every
//!   connected component.
//!
//! Plotting reachability against the ordering gives the "reachability plot":
//! valleys are clusters. Any DBSCAN clustering with radius `ε' <= ε` can be
//! cut from it (see [`OpticsResult::extract_dbscan_clustering`]), and the xi
//! method finds a hierarchy of valleys (see [`OpticsResult::extract_clusters`]).
//!
//! Undefined distances are reported as `f64::INFINITY`.
//!
//! ## Processing
//!
//! Unprocessed candidates live in a binary heap keyed by their best known
//! reachability. Improving a candidate pushes a new entry; stale entries are
//! skipped when popped. Equal reachabilities are broken by insertion order,
//! or by point index with [`OpticsParams::strict_id_order`].
//!
//! ## References
//!
//! Ankerst, Breunig, Kriegel, Sander (1999). "OPTICS: Ordering Points To
//! Identify the Clustering Structure." SIGMOD '99.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use super::dbscan::NOISE;
use super::extract::{label_forest, threshold_clusters, xi_ranges, Profile};
use super::hierarchy::{nest_ranges, OpticsCluster};
use super::result::{Assignment, ClusteringResult, Membership};
use super::traits::Clustering;
use super::util::estimate_generating_distance;
use crate::error::{Error, Result};
use crate::heap::BoundedHeap;
use crate::hull::{Bounds, Hull};
use crate::kdtree::{KdTreeParams, SearchScratch};
use crate::space::{PointSet, PointSpace};

/// Parameters for an OPTICS run.
#[derive(Debug, Clone)]
pub struct OpticsParams {
    /// Minimum neighbourhood size (the point itself included) for a core point.
    pub min_pts: usize,
    /// Neighbourhood radius ε. Estimated from the data when `None`.
    pub generating_distance: Option<f64>,
    /// Break reachability ties by point index instead of insertion order.
    pub strict_id_order: bool,
    /// Optional per-dimension weights for the distance.
    pub weights: Option<Vec<f64>>,
}

impl Default for OpticsParams {
    fn default() -> Self {
        Self {
            min_pts: 5,
            generating_distance: None,
            strict_id_order: false,
            weights: None,
        }
    }
}

impl OpticsParams {
    /// Set the minimum neighbourhood size.
    pub fn with_min_pts(mut self, min_pts: usize) -> Self {
        self.min_pts = min_pts;
        self
    }

    /// Set the generating distance.
    pub fn with_generating_distance(mut self, eps: f64) -> Self {
        self.generating_distance = Some(eps);
        self
    }

    /// Break ties by point index.
    pub fn with_strict_id_order(mut self, strict: bool) -> Self {
        self.strict_id_order = strict;
        self
    }

    /// Set per-dimension weights.
    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.min_pts == 0 {
            return Err(Error::InvalidParameter {
                name: "min_pts",
                message: "must be at least 1",
            });
        }
        if let Some(eps) = self.generating_distance {
            if !(eps > 0.0 && eps.is_finite()) {
                return Err(Error::InvalidParameter {
                    name: "generating_distance",
                    message: "must be positive and finite",
                });
            }
        }
        Ok(())
    }

    fn index_params(&self) -> KdTreeParams {
        match &self.weights {
            Some(w) => KdTreeParams::default().with_weights(w.clone()),
            None => KdTreeParams::default(),
        }
    }
}

/// Parameters for xi (steepness) cluster extraction.
#[derive(Debug, Clone)]
pub struct XiParams {
    /// Relative drop in reachability that counts as steep, in `(0, 1)`.
    pub xi: f64,
    /// Smallest cluster, in points. Defaults to `min_pts`.
    pub min_cluster_size: Option<usize>,
    /// Longest run of non-steep points inside a steep area. Defaults to `min_pts`.
    pub max_non_steep: Option<usize>,
    /// Keep only the outermost clusters.
    pub top_level_only: bool,
}

impl Default for XiParams {
    fn default() -> Self {
        Self {
            xi: 0.05,
            min_cluster_size: None,
            max_non_steep: None,
            top_level_only: false,
        }
    }
}

impl XiParams {
    /// Xi parameters with the given steepness.
    pub fn new(xi: f64) -> Self {
        Self {
            xi,
            ..Self::default()
        }
    }

    /// Set the minimum cluster size.
    pub fn with_min_cluster_size(mut self, size: usize) -> Self {
        self.min_cluster_size = Some(size);
        self
    }

    /// Set the longest tolerated non-steep run.
    pub fn with_max_non_steep(mut self, run: usize) -> Self {
        self.max_non_steep = Some(run);
        self
    }

    /// Keep only top-level clusters.
    pub fn with_top_level_only(mut self, top: bool) -> Self {
        self.top_level_only = top;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.xi > 0.0 && self.xi < 1.0) {
            return Err(Error::InvalidParameter {
                name: "xi",
                message: "must lie strictly between 0 and 1",
            });
        }
        if self.min_cluster_size == Some(0) {
            return Err(Error::InvalidParameter {
                name: "min_cluster_size",
                message: "must be at least 1",
            });
        }
        Ok(())
    }
}

/// OPTICS clusterer.
#[derive(Debug, Clone, Default)]
pub struct Optics {
    params: OpticsParams,
}

/// One entry of the OPTICS ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpticsOrder {
    /// Original index of the point.
    pub parent: usize,
    /// Core point the reachability was measured from.
    pub predecessor: Option<usize>,
    /// Core distance (`INFINITY` if not a core point).
    pub core_distance: f64,
    /// Reachability distance (`INFINITY` if undefined).
    pub reachability_distance: f64,
}

/// Classification of a point at the generating distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointClass {
    /// Not within ε of any core point.
    Noise,
    /// Within ε of a core point, but not core itself.
    Border,
    /// At least `min_pts` neighbours within ε.
    Core,
}

#[derive(Debug, Clone, Copy)]
struct Seed {
    reach: f64,
    tie: usize,
    id: usize,
}

impl PartialEq for Seed {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Seed {}

impl Ord for Seed {
    // Reversed: BinaryHeap is a max-heap, we pop the smallest reachability.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .reach
            .total_cmp(&self.reach)
            .then_with(|| other.tie.cmp(&self.tie))
    }
}

impl PartialOrd for Seed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Optics {
    /// OPTICS with `min_pts` and an explicit generating distance.
    pub fn new(min_pts: usize, generating_distance: f64) -> Self {
        Self::with_params(
            OpticsParams::default()
                .with_min_pts(min_pts)
                .with_generating_distance(generating_distance),
        )
    }

    /// OPTICS with full parameters.
    pub fn with_params(params: OpticsParams) -> Self {
        Self { params }
    }

    /// The configured parameters.
    pub fn params(&self) -> &OpticsParams {
        &self.params
    }

    /// Order points from parallel `x`/`y` arrays.
    pub fn run_xy(&self, x: &[f32], y: &[f32]) -> Result<OpticsResult> {
        self.params.validate()?;
        let space = PointSpace::with_params(PointSet::from_xy(x, y)?, self.params.index_params())?;
        self.run(&space)
    }

    /// Order points from parallel `x`/`y`/`z` arrays.
    pub fn run_xyz(&self, x: &[f32], y: &[f32], z: &[f32]) -> Result<OpticsResult> {
        self.params.validate()?;
        let space =
            PointSpace::with_params(PointSet::from_xyz(x, y, z)?, self.params.index_params())?;
        self.run(&space)
    }

    /// Order an already indexed point space.
    ///
    /// The space's own weights are used; [`OpticsParams::weights`] only applies
    /// to spaces built by this clusterer.
    pub fn run(&self, space: &PointSpace) -> Result<OpticsResult> {
        self.params.validate()?;
        let eps = self.resolve_generating_distance(space);
        let mut state = OpticsRun::new(space.len(), self.params.min_pts, self.params.strict_id_order);
        state.order_all(space, eps)?;

        let result = state.finish(Arc::clone(space.points()), self.params.min_pts, eps);
        debug!(
            points = space.len(),
            min_pts = self.params.min_pts,
            generating_distance = eps,
            core = result.core.iter().filter(|c| c.is_finite()).count(),
            "optics ordering computed"
        );
        Ok(result)
    }

    fn resolve_generating_distance(&self, space: &PointSpace) -> f64 {
        if let Some(eps) = self.params.generating_distance {
            return eps;
        }
        let points = space.points();
        let (volume, axes) = points.bounding_volume();
        if let Some(eps) = estimate_generating_distance(self.params.min_pts, volume, points.len(), axes) {
            debug!(eps, volume, axes, "estimated generating distance");
            return eps;
        }
        // Degenerate spread: fall back to the widest extent, or a unit radius.
        let widest = space
            .tree()
            .bounds()
            .map(|(min, max)| {
                min.iter()
                    .zip(max)
                    .map(|(lo, hi)| hi - lo)
                    .filter(|e| e.is_finite())
                    .fold(0.0f64, f64::max)
            })
            .unwrap_or(0.0);
        if widest > 0.0 {
            widest
        } else {
            1.0
        }
    }
}

impl Clustering for Optics {
    /// Flat labels from a cut at the generating distance.
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>> {
        self.params.validate()?;
        let space = PointSpace::with_params(PointSet::from_rows(data)?, self.params.index_params())?;
        let mut result = self.run(&space)?;
        result.extract_dbscan_clustering(result.generating_distance(), false)?;
        Ok(result.cluster_ids().to_vec())
    }
}

/// Mutable state of one ordering pass.
struct OpticsRun {
    min_pts: usize,
    strict_id_order: bool,
    processed: Vec<bool>,
    reach: Vec<f64>,
    core: Vec<f64>,
    predecessor: Vec<Option<usize>>,
    counts: Vec<usize>,
    late_reach: Vec<f64>,
    late_pred: Vec<Option<usize>>,
    order: Vec<usize>,
    seeds: BinaryHeap<Seed>,
    next_tie: usize,
}

impl OpticsRun {
    fn new(n: usize, min_pts: usize, strict_id_order: bool) -> Self {
        Self {
            min_pts,
            strict_id_order,
            processed: vec![false; n],
            reach: vec![f64::INFINITY; n],
            core: vec![f64::INFINITY; n],
            predecessor: vec![None; n],
            counts: vec![0; n],
            late_reach: vec![f64::INFINITY; n],
            late_pred: vec![None; n],
            order: Vec::with_capacity(n),
            seeds: BinaryHeap::new(),
            next_tie: 0,
        }
    }

    fn push_seed(&mut self, id: usize, reach: f64) {
        let tie = if self.strict_id_order {
            id
        } else {
            self.next_tie += 1;
            self.next_tie
        };
        self.seeds.push(Seed { reach, tie, id });
    }

    fn order_all(&mut self, space: &PointSpace, eps: f64) -> Result<()> {
        let mut scratch = SearchScratch::new();
        let mut neighbors: Vec<(usize, f64)> = Vec::new();
        let mut kth = BoundedHeap::smallest(self.min_pts);

        for start in 0..space.len() {
            if self.processed[start] {
                continue;
            }
            self.push_seed(start, f64::INFINITY);

            while let Some(Seed { reach, id, .. }) = self.seeds.pop() {
                if self.processed[id] || reach > self.reach[id] {
                    continue;
                }
                self.processed[id] = true;
                self.order.push(id);

                space.neighbors_within(id, eps, &mut scratch, &mut neighbors)?;
                self.counts[id] = neighbors.len();

                kth.reset(self.min_pts);
                for &(_, d) in &neighbors {
                    kth.offer(d, ());
                }
                let core = kth.threshold();
                self.core[id] = core;
                if core.is_infinite() {
                    continue;
                }

                for &(j, d) in &neighbors {
                    let candidate = core.max(d);
                    if self.processed[j] {
                        if j != id && candidate < self.late_reach[j] {
                            self.late_reach[j] = candidate;
                            self.late_pred[j] = Some(id);
                        }
                    } else if candidate < self.reach[j] {
                        self.reach[j] = candidate;
                        self.predecessor[j] = Some(id);
                        self.push_seed(j, candidate);
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(self, points: Arc<PointSet>, min_pts: usize, eps: f64) -> OpticsResult {
        let n = self.order.len();
        let mut position = vec![0usize; n];
        for (pos, &i) in self.order.iter().enumerate() {
            position[i] = pos;
        }
        OpticsResult {
            min_pts,
            generating_distance: eps,
            order: Arc::from(self.order),
            position,
            reach: self.reach,
            core: self.core,
            predecessor: self.predecessor,
            counts: self.counts,
            late_reach: self.late_reach,
            late_pred: self.late_pred,
            clusters: Vec::new(),
            assignment: Assignment::unassigned(points),
        }
    }
}

/// Output of an OPTICS run: the ordering plus the current extraction.
///
/// Until one of the extraction methods is called every point is noise.
#[derive(Debug)]
pub struct OpticsResult {
    min_pts: usize,
    generating_distance: f64,
    order: Arc<[usize]>,
    position: Vec<usize>,
    reach: Vec<f64>,
    core: Vec<f64>,
    predecessor: Vec<Option<usize>>,
    counts: Vec<usize>,
    late_reach: Vec<f64>,
    late_pred: Vec<Option<usize>>,
    clusters: Vec<OpticsCluster>,
    assignment: Assignment,
}

impl OpticsResult {
    /// Minimum neighbourhood size used for the run.
    pub fn min_pts(&self) -> usize {
        self.min_pts
    }

    /// Generating distance used for the run (given or estimated).
    pub fn generating_distance(&self) -> f64 {
        self.generating_distance
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the run covered no points.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Original point indices in visiting order.
    pub fn ordering(&self) -> &[usize] {
        &self.order
    }

    /// Entry at ordering position `pos`.
    pub fn entry(&self, pos: usize) -> Option<OpticsOrder> {
        let &i = self.order.get(pos)?;
        Some(OpticsOrder {
            parent: i,
            predecessor: self.predecessor[i],
            core_distance: self.core[i],
            reachability_distance: self.reach[i],
        })
    }

    /// All ordering entries.
    pub fn order(&self) -> Vec<OpticsOrder> {
        (0..self.len()).filter_map(|pos| self.entry(pos)).collect()
    }

    /// Ordering position of point `i`.
    pub fn position(&self, i: usize) -> usize {
        self.position[i]
    }

    /// Reachability distances in ordering order (the reachability plot).
    pub fn reachability_profile(&self) -> Vec<f64> {
        self.order.iter().map(|&i| self.reach[i]).collect()
    }

    /// Core distances in ordering order.
    pub fn core_distance_profile(&self) -> Vec<f64> {
        self.order.iter().map(|&i| self.core[i]).collect()
    }

    /// Reachability distance of point `i`.
    pub fn reachability_distance(&self, i: usize) -> f64 {
        self.reach[i]
    }

    /// Core distance of point `i`.
    pub fn core_distance(&self, i: usize) -> f64 {
        self.core[i]
    }

    /// Core point that point `i` was reached from.
    pub fn predecessor(&self, i: usize) -> Option<usize> {
        self.predecessor[i]
    }

    /// Points within the generating distance of `i`, itself included.
    pub fn neighbor_count(&self, i: usize) -> usize {
        self.counts[i]
    }

    /// Noise, border or core at the generating distance.
    pub fn point_class(&self, i: usize) -> PointClass {
        if self.core[i].is_finite() {
            PointClass::Core
        } else if self.reach[i].is_finite() || self.late_reach[i].is_finite() {
            PointClass::Border
        } else {
            PointClass::Noise
        }
    }

    /// Top-level clusters of the last xi extraction.
    ///
    /// Empty after a threshold extraction.
    pub fn clusters(&self) -> &[OpticsCluster] {
        &self.clusters
    }

    /// Every cluster of the last xi extraction, parents before children.
    pub fn all_clusters(&self) -> impl Iterator<Item = &OpticsCluster> + '_ {
        self.clusters.iter().flat_map(|c| c.iter())
    }

    fn profile(&self) -> Profile<'_> {
        Profile {
            order: &self.order,
            reach: &self.reach,
            core: &self.core,
            late_reach: &self.late_reach,
            late_pred: &self.late_pred,
        }
    }

    /// Flat DBSCAN clustering at radius `eps`.
    ///
    /// `eps` must not exceed the generating distance. With `core_only`, border
    /// points are labelled noise. Returns the number of clusters.
    pub fn extract_dbscan_clustering(&mut self, eps: f64, core_only: bool) -> Result<usize> {
        if !(eps > 0.0 && eps.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                message: "must be positive and finite",
            });
        }
        if eps > self.generating_distance {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                message: "must not exceed the generating distance",
            });
        }
        let (ids, k) = threshold_clusters(&self.profile(), eps, core_only);
        self.clusters.clear();
        self.assignment.replace(ids, k, Membership::Flat);
        debug!(epsilon = eps, core_only, clusters = k, "threshold clusters extracted");
        Ok(k)
    }

    /// Hierarchical clustering by the xi method. Returns the number of clusters.
    ///
    /// Each point is labelled with the deepest cluster containing it (the
    /// outermost one with [`XiParams::top_level_only`]). Cluster geometry covers
    /// the whole range of a cluster, nested clusters included.
    pub fn extract_clusters(&mut self, params: &XiParams) -> Result<usize> {
        params.validate()?;
        let min_size = params.min_cluster_size.unwrap_or(self.min_pts);
        let max_non_steep = params.max_non_steep.unwrap_or(self.min_pts);

        let ranges = xi_ranges(&self.reachability_profile(), params.xi, min_size, max_non_steep);
        let candidates = ranges.len();
        let mut forest = nest_ranges(ranges);
        if params.top_level_only {
            for (k, root) in forest.iter_mut().enumerate() {
                *root = OpticsCluster::new(root.start, root.end, k + 1);
            }
        }

        let (ids, ranges) = label_forest(&self.order, &forest);
        let k = ranges.len();
        self.clusters = forest;
        self.assignment.replace(
            ids,
            k,
            Membership::Ranges {
                order: Arc::clone(&self.order),
                ranges,
            },
        );
        debug!(
            xi = params.xi,
            candidates,
            clusters = k,
            top_level = self.clusters.len(),
            "xi clusters extracted"
        );
        Ok(k)
    }

    /// Number of points labelled noise by the current extraction.
    pub fn noise_count(&self) -> usize {
        self.assignment.ids().iter().filter(|&&c| c == NOISE).count()
    }
}

impl ClusteringResult for OpticsResult {
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
        for root in &mut self.clusters {
            root.relabel(&map);
        }
    }
}
