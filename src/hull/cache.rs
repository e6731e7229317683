//! Lazily computed per-cluster geometry.
//!
//! One slot per cluster id, each filled at most once on first request. A new
//! extraction or re-labeling replaces the whole cache rather than patching it.
//! Slots are independent, so geometry for different clusters can be computed
//! concurrently through a shared reference.

use std::sync::OnceLock;

use super::{Bounds, Hull, HullBuilder};

/// Hull and bounds of one cluster.
#[derive(Debug, Clone)]
pub(crate) struct ClusterGeometry {
    pub(crate) hull: Hull,
    pub(crate) bounds: Bounds,
}

impl ClusterGeometry {
    /// Geometry of the given member points, or `None` if no member has finite coordinates.
    pub(crate) fn from_points<'a>(dims: usize, points: impl IntoIterator<Item = &'a [f64]>) -> Option<Self> {
        let mut builder = HullBuilder::new(dims);
        for p in points {
            builder.add(p);
        }
        Some(Self {
            hull: builder.build()?,
            bounds: builder.bounds()?,
        })
    }
}

#[derive(Debug, Default)]
pub(crate) struct GeometryCache {
    /// Slot `i` holds cluster id `i + 1`.
    slots: Vec<OnceLock<Option<ClusterGeometry>>>,
}

impl GeometryCache {
    pub(crate) fn new(num_clusters: usize) -> Self {
        Self {
            slots: (0..num_clusters).map(|_| OnceLock::new()).collect(),
        }
    }

    /// Geometry for `cluster_id`, computing it with `compute` on first access.
    ///
    /// Ids outside `1..=num_clusters` yield `None`.
    pub(crate) fn get_or_compute(
        &self,
        cluster_id: usize,
        compute: impl FnOnce() -> Option<ClusterGeometry>,
    ) -> Option<&ClusterGeometry> {
        let slot = self.slots.get(cluster_id.checked_sub(1)?)?;
        slot.get_or_init(compute).as_ref()
    }

    /// Number of slots already filled.
    #[cfg(test)]
    pub(crate) fn computed(&self) -> usize {
        self.slots.iter().filter(|s| s.get().is_some()).count()
    }
}
