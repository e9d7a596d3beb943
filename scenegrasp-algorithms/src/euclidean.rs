//! Euclidean cluster extraction.
//!
//! Region growing over an R-tree: every unvisited point seeds a breadth-first
//! expansion that absorbs all points within the tolerance radius. Seeds are
//! taken in ascending index order, so the output order is the order in which
//! each component's smallest index appears in the input.

use crate::spatial::SpatialIndex;
use scenegrasp_core::{
    Cluster, ClusteringAlgorithm, ClusteringConfig, ClusteringResult, ClusteringStatistics,
    PointSet, Result,
};
use std::collections::VecDeque;

/// Breadth-first Euclidean clustering.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanClustering;

impl EuclideanClustering {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ClusteringAlgorithm for EuclideanClustering {
    fn cluster(&self, points: &PointSet, config: &ClusteringConfig) -> Result<ClusteringResult> {
        config.validate()?;

        let n = points.len();
        let mut statistics = ClusteringStatistics {
            points_processed: n,
            ..ClusteringStatistics::default()
        };
        if n == 0 {
            return Ok(ClusteringResult {
                clusters: Vec::new(),
                statistics,
            });
        }

        let index = SpatialIndex::new(points);
        let mut visited = vec![false; n];
        let mut queue = VecDeque::new();
        let mut neighbors = Vec::new();
        let mut clusters = Vec::new();

        for seed in 0..n {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;
            queue.push_back(seed);

            let mut members = Vec::new();
            while let Some(current) = queue.pop_front() {
                members.push(current);
                index.within_radius_into(&points[current], config.tolerance, &mut neighbors);
                for &neighbor in &neighbors {
                    if !visited[neighbor] {
                        visited[neighbor] = true;
                        queue.push_back(neighbor);
                    }
                }
            }

            statistics.components_found += 1;
            let size = members.len();
            if config.accepts(size) {
                members.sort_unstable();
                clusters.push(Cluster::from_indices(points, members));
            } else if size < config.min_cluster_size {
                statistics.rejected_small += 1;
            } else {
                statistics.rejected_large += 1;
            }
        }

        statistics.clusters_kept = clusters.len();
        log::debug!(
            "euclidean: {} points, {} components, {} clusters kept",
            n,
            statistics.components_found,
            statistics.clusters_kept
        );
        Ok(ClusteringResult {
            clusters,
            statistics,
        })
    }

    fn name(&self) -> &'static str {
        "Euclidean"
    }
}
