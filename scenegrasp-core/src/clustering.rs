//! Clustering types and configuration.

use crate::error::{Error, Result};
use crate::point::{Point, PointSet};
use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A connected group of points representing a single object.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cluster {
    /// Indices of the members in the set that was clustered.
    pub indices: Vec<usize>,
    /// Copies of the member points, in the same order as `indices`.
    pub points: PointSet,
}

impl Cluster {
    /// Creates an empty cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gathers the members at `indices` from `source`.
    #[must_use]
    pub fn from_indices(source: &PointSet, indices: Vec<usize>) -> Self {
        let points = source.select(&indices);
        Self { indices, points }
    }

    /// Returns the number of points in the cluster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the cluster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns an iterator over the points.
    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.iter()
    }

    #[must_use]
    pub fn centroid(&self) -> Option<Vector3<f32>> {
        self.points.centroid()
    }
}

/// Clusters of one frame, in extraction order.
pub type ClusterSet = Vec<Cluster>;

/// Connected-component algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ClusteringMethod {
    /// Breadth-first region growing from each unvisited seed.
    #[default]
    Euclidean,
    /// Union-find over neighbor pairs, queried in parallel.
    Graph,
}

impl std::fmt::Display for ClusteringMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusteringMethod::Euclidean => write!(f, "Euclidean"),
            ClusteringMethod::Graph => write!(f, "Graph (union-find)"),
        }
    }
}

/// Configuration for object cluster extraction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClusteringConfig {
    /// Maximum distance (meters) between neighboring points of one cluster.
    pub tolerance: f32,
    /// Minimum number of points to form a valid cluster.
    pub min_cluster_size: usize,
    /// Maximum number of points in a cluster (for filtering large artifacts).
    pub max_cluster_size: Option<usize>,
    /// Algorithm used to find connected components.
    pub method: ClusteringMethod,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.01, // 1 cm
            min_cluster_size: 750,
            max_cluster_size: None,
            method: ClusteringMethod::Euclidean,
        }
    }
}

impl ClusteringConfig {
    /// Creates a new clustering configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the neighbor tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the minimum cluster size.
    #[must_use]
    pub fn with_min_cluster_size(mut self, size: usize) -> Self {
        self.min_cluster_size = size;
        self
    }

    /// Sets the maximum cluster size.
    #[must_use]
    pub fn with_max_cluster_size(mut self, size: usize) -> Self {
        self.max_cluster_size = Some(size);
        self
    }

    /// Sets the clustering method.
    #[must_use]
    pub fn with_method(mut self, method: ClusteringMethod) -> Self {
        self.method = method;
        self
    }

    /// Returns true if a component of `size` points is kept.
    #[inline]
    #[must_use]
    pub fn accepts(&self, size: usize) -> bool {
        size >= self.min_cluster_size && self.max_cluster_size.is_none_or(|max| size <= max)
    }

    /// Checks the parameters.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for a non-positive tolerance or an empty size range.
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(Error::Config(format!(
                "cluster tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if let Some(max) = self.max_cluster_size {
            if max < self.min_cluster_size {
                return Err(Error::Config(format!(
                    "max cluster size {max} is below min cluster size {}",
                    self.min_cluster_size
                )));
            }
        }
        Ok(())
    }
}

/// Counters reported by a clustering pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusteringStatistics {
    pub points_processed: usize,
    /// Connected components before size filtering.
    pub components_found: usize,
    pub clusters_kept: usize,
    pub rejected_small: usize,
    pub rejected_large: usize,
}

/// Clusters and counters produced by one extraction pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusteringResult {
    pub clusters: ClusterSet,
    pub statistics: ClusteringStatistics,
}

/// Trait for connected-component clustering algorithms.
///
/// Implementations must be deterministic: for a fixed input order and
/// configuration they return the same clusters in the same order.
pub trait ClusteringAlgorithm: Send + Sync {
    /// Partitions `points` into clusters.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `config` is invalid.
    fn cluster(&self, points: &PointSet, config: &ClusteringConfig) -> Result<ClusteringResult>;

    /// Returns the name of the algorithm.
    fn name(&self) -> &'static str;
}
