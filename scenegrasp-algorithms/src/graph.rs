//! Graph-based clustering algorithm.
//!
//! Neighbor lists are gathered in parallel from the spatial index, then a
//! union-find structure merges every neighboring pair into connected
//! components. Produces the same clusters as [`crate::EuclideanClustering`].

use crate::spatial::SpatialIndex;
use rayon::prelude::*;
use scenegrasp_core::{
    Cluster, ClusteringAlgorithm, ClusteringConfig, ClusteringResult, ClusteringStatistics,
    PointSet, Result,
};

/// Graph-based clustering using union-find.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphClustering;

impl GraphClustering {
    /// Creates a new graph-based clustering instance.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Union-Find data structure for connected component detection.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        let mut current = x;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    fn union(&mut self, x: usize, y: usize) {
        let px = self.find(x);
        let py = self.find(y);

        if px == py {
            return;
        }

        match self.rank[px].cmp(&self.rank[py]) {
            std::cmp::Ordering::Less => self.parent[px] = py,
            std::cmp::Ordering::Greater => self.parent[py] = px,
            std::cmp::Ordering::Equal => {
                self.parent[py] = px;
                self.rank[px] = self.rank[px].saturating_add(1);
            }
        }
    }
}

impl ClusteringAlgorithm for GraphClustering {
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
        let adjacency: Vec<Vec<usize>> = points
            .as_slice()
            .par_iter()
            .enumerate()
            .map(|(i, p)| {
                let mut neighbors = index.within_radius(p, config.tolerance);
                neighbors.retain(|&j| j > i);
                neighbors
            })
            .collect();

        let mut uf = UnionFind::new(n);
        for (i, neighbors) in adjacency.iter().enumerate() {
            for &j in neighbors {
                uf.union(i, j);
            }
        }

        // Scanning in index order keys each component by its smallest member.
        let mut slot_of_root = vec![usize::MAX; n];
        let mut components: Vec<Vec<usize>> = Vec::new();
        for i in 0..n {
            let root = uf.find(i);
            if slot_of_root[root] == usize::MAX {
                slot_of_root[root] = components.len();
                components.push(Vec::new());
            }
            components[slot_of_root[root]].push(i);
        }

        statistics.components_found = components.len();
        let mut clusters = Vec::new();
        for members in components {
            let size = members.len();
            if config.accepts(size) {
                clusters.push(Cluster::from_indices(points, members));
            } else if size < config.min_cluster_size {
                statistics.rejected_small += 1;
            } else {
                statistics.rejected_large += 1;
            }
        }

        statistics.clusters_kept = clusters.len();
        log::debug!(
            "graph: {} points, {} components, {} clusters kept",
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
        "Graph"
    }
}
