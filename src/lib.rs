//! Density-based clustering on a bucketed k-d tree.
//!
//! `kdscan` orders and clusters 2D, 3D and N-dimensional point sets.
//!
//! - [`kdtree`]: a bucketed k-d tree with reentrant nearest-neighbour and
//!   range queries and pluggable (weighted) squared-Euclidean distances
//! - [`heap`]: the fixed-capacity heap behind k-nearest searches
//! - [`space`]: point storage plus the neighbourhood queries clustering needs
//! - [`cluster`]: OPTICS and DBSCAN, threshold and xi extraction, cluster
//!   hierarchies, id scrambling
//! - [`hull`]: convex hulls and bounding boxes of cluster members
//! - [`renumber`]: compaction of arbitrary integer ids to `0..n`
//! - [`metrics`]: Rand index for comparing labelings

#![forbid(unsafe_code)]

pub mod cluster;
pub mod error;
pub mod heap;
pub mod hull;
pub mod kdtree;
pub mod metrics;
pub mod renumber;
pub mod space;

pub use cluster::{
    Clustering, ClusteringResult, Dbscan, DbscanExt, Optics, OpticsCluster, OpticsParams,
    OpticsResult, XiParams, NOISE,
};
pub use error::{Error, Result};
pub use space::{PointSet, PointSpace};
