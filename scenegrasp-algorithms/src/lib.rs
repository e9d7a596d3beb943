//! scenegrasp-algorithms: Scene decomposition algorithms.
//!
//! This crate provides the geometric stages of the pipeline:
//! - **Region of interest** - closed-interval pass-through on one axis
//! - **Plane segmentation** - seeded RANSAC with optional least-squares refit
//! - **Euclidean** - breadth-first region growing over an R-tree
//! - **Graph** - Union-Find connected components with parallel neighbor queries
//!

mod euclidean;
mod graph;
mod processing;
mod roi;
mod segmentation;
pub mod spatial;

pub use euclidean::EuclideanClustering;
pub use graph::GraphClustering;
pub use processing::{algorithm_for, extract_clusters, segment_scene, SceneDecomposition};
pub use roi::RegionOfInterestFilter;
pub use segmentation::{
    count_inliers, inlier_indices, PlaneHypothesis, PlaneSegmenter, Segmentation,
};
pub use spatial::SpatialIndex;

// Re-export core clustering types
pub use scenegrasp_core::clustering::{
    ClusteringAlgorithm, ClusteringConfig, ClusteringMethod, ClusteringStatistics,
};
