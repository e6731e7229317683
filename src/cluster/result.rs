//! Cluster-id assignments shared by OPTICS and DBSCAN results.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::hull::{Bounds, ClusterGeometry, GeometryCache, Hull};
use crate::space::PointSet;

use super::dbscan::NOISE;

/// Operations available on any clustering result.
pub trait ClusteringResult {
    /// Cluster id per original point index (`0` = noise).
    fn cluster_ids(&self) -> &[usize];

    /// Number of clusters; ids run `1..=num_clusters`.
    fn num_clusters(&self) -> usize;

    /// Original indices of the points in `cluster_id`, ascending.
    ///
    /// Empty for noise or unknown ids.
    fn cluster_members(&self, cluster_id: usize) -> Vec<usize>;

    /// Convex hull of `cluster_id`, computed on first request.
    ///
    /// `None` for id `0`, ids above [`num_clusters`](Self::num_clusters), or
    /// clusters without finite coordinates.
    fn convex_hull(&self, cluster_id: usize) -> Option<&Hull>;

    /// Bounding box of `cluster_id`, computed on first request.
    fn bounds(&self, cluster_id: usize) -> Option<&Bounds>;

    /// Randomly permute cluster ids without changing membership.
    ///
    /// Noise stays `0`. Cached geometry is discarded.
    fn scramble_clusters<R: Rng + ?Sized>(&mut self, rng: &mut R);
}

/// How cluster membership is derived.
#[derive(Debug, Clone)]
pub(crate) enum Membership {
    /// Members of id `c` are the points labelled `c`.
    Flat,
    /// Members of id `c` are the points at ordering positions `ranges[c - 1]`,
    /// which includes the members of nested clusters.
    Ranges {
        order: Arc<[usize]>,
        ranges: Vec<(usize, usize)>,
    },
}

/// A labeling of a point set plus its lazily computed geometry.
#[derive(Debug)]
pub(crate) struct Assignment {
    points: Arc<PointSet>,
    ids: Vec<usize>,
    num_clusters: usize,
    membership: Membership,
    geometry: GeometryCache,
}

impl Assignment {
    pub(crate) fn new(
        points: Arc<PointSet>,
        ids: Vec<usize>,
        num_clusters: usize,
        membership: Membership,
    ) -> Self {
        Self {
            points,
            ids,
            num_clusters,
            membership,
            geometry: GeometryCache::new(num_clusters),
        }
    }

    /// Everything noise; the state before any extraction.
    pub(crate) fn unassigned(points: Arc<PointSet>) -> Self {
        let n = points.len();
        Self::new(points, vec![NOISE; n], 0, Membership::Flat)
    }

    /// Swap in a new labeling, dropping all cached geometry.
    pub(crate) fn replace(&mut self, ids: Vec<usize>, num_clusters: usize, membership: Membership) {
        *self = Self::new(Arc::clone(&self.points), ids, num_clusters, membership);
    }

    pub(crate) fn ids(&self) -> &[usize] {
        &self.ids
    }

    pub(crate) fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    pub(crate) fn members(&self, cluster_id: usize) -> Vec<usize> {
        if cluster_id == NOISE || cluster_id > self.num_clusters {
            return Vec::new();
        }
        match &self.membership {
            Membership::Flat => self
                .ids
                .iter()
                .enumerate()
                .filter(|&(_, &c)| c == cluster_id)
                .map(|(i, _)| i)
                .collect(),
            Membership::Ranges { order, ranges } => {
                let (s, e) = ranges[cluster_id - 1];
                let mut members = order[s..=e].to_vec();
                members.sort_unstable();
                members
            }
        }
    }

    fn geometry(&self, cluster_id: usize) -> Option<&ClusterGeometry> {
        self.geometry.get_or_compute(cluster_id, || {
            let members = self.members(cluster_id);
            ClusterGeometry::from_points(self.points.dims(), members.iter().map(|&i| self.points.point(i)))
        })
    }

    pub(crate) fn hull(&self, cluster_id: usize) -> Option<&Hull> {
        self.geometry(cluster_id).map(|g| &g.hull)
    }

    pub(crate) fn bounds(&self, cluster_id: usize) -> Option<&Bounds> {
        self.geometry(cluster_id).map(|g| &g.bounds)
    }

    /// Permute ids `1..=num_clusters`. Returns the map `old id -> new id`
    /// (index `0` maps noise to itself).
    pub(crate) fn scramble<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<usize> {
        let mut targets: Vec<usize> = (1..=self.num_clusters).collect();
        targets.shuffle(rng);
        let mut map = Vec::with_capacity(self.num_clusters + 1);
        map.push(NOISE);
        map.extend(targets);

        let ids = self.ids.iter().map(|&c| map[c]).collect();
        let membership = match &self.membership {
            Membership::Flat => Membership::Flat,
            Membership::Ranges { order, ranges } => {
                let mut permuted = ranges.clone();
                for (old, &range) in ranges.iter().enumerate() {
                    permuted[map[old + 1] - 1] = range;
                }
                Membership::Ranges {
                    order: Arc::clone(order),
                    ranges: permuted,
                }
            }
        };
        self.replace(ids, self.num_clusters, membership);
        map
    }

    #[cfg(test)]
    pub(crate) fn geometry_computed(&self) -> usize {
        self.geometry.computed()
    }
}
