//! Density-based clustering over a spatial index.
//!
//! Both algorithms here work on a [`PointSpace`](crate::space::PointSpace):
//! points indexed once in a k-d tree so that every ε-neighbourhood query is
//! a tree search instead of a scan.
//!
//! ## Algorithms
//!
//! ### DBSCAN
//!
//! Density-based clustering that can discover non-convex clusters and identify
//! outliers (noise points). DBSCAN does not require specifying the number of
//! clusters in advance, but it commits to one radius ε.
//!
//! ### OPTICS
//!
//! OPTICS visits the points in density order and records a core and a
//! reachability distance for each. The ordering is the product; clusterings
//! are extracted from it afterwards:
//!
//! - a flat cut at any `ε' <= ε`, matching DBSCAN at `ε'`;
//! - the xi method, which finds valleys of the reachability plot and nests
//!   them into a hierarchy of [`OpticsCluster`]s.
//!
//! ## Results
//!
//! Runs return result objects implementing [`ClusteringResult`]: a cluster id
//! per original point (`0` = noise), members, lazily computed convex hulls and
//! bounding boxes, and id scrambling for statistical tests.
//!
//! ## Usage
//!
//! ```rust
//! use kdscan::cluster::{Clustering, ClusteringResult, Dbscan, Optics, XiParams};
//!
//! let data = vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.1],
//!     vec![0.0, 0.1],
//!     vec![10.0, 10.0],
//!     vec![10.1, 10.1],
//!     vec![10.0, 10.1],
//! ];
//!
//! // Flat labels with DBSCAN
//! let labels = Dbscan::new(0.5, 3).fit_predict(&data).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[3]);
//!
//! // OPTICS ordering, then two different extractions
//! let x: Vec<f32> = data.iter().map(|p| p[0]).collect();
//! let y: Vec<f32> = data.iter().map(|p| p[1]).collect();
//! let mut result = Optics::new(3, 1.0).run_xy(&x, &y).unwrap();
//! assert_eq!(result.extract_dbscan_clustering(0.5, false).unwrap(), 2);
//! let hull = result.convex_hull(1).unwrap();
//! assert!(hull.area() > 0.0);
//!
//! result.extract_clusters(&XiParams::new(0.1)).unwrap();
//! ```

mod dbscan;
mod extract;
mod hierarchy;
mod optics;
mod result;
mod traits;
mod util;

pub use dbscan::{Dbscan, DbscanExt, DbscanOrder, DbscanResult, NOISE};
pub use hierarchy::OpticsCluster;
pub use optics::{Optics, OpticsOrder, OpticsParams, OpticsResult, PointClass, XiParams};
pub use result::ClusteringResult;
pub use traits::Clustering;
