//! Consensus clustering
//!
//! Indexed points and distance metrics, the DBSCAN collaborator, and the
//! cross-axis intersection that yields the candidate id set.

pub mod dbscan;
pub mod intersect;
pub mod point;

pub use dbscan::{cluster, ClusterParams};
pub use intersect::intersect;
pub use point::{ClusterPoint, DistanceMetric, IndexedPoint};
