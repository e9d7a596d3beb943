//! High-level helpers that chain filtering, segmentation and clustering.

use crate::euclidean::EuclideanClustering;
use crate::graph::GraphClustering;
use crate::roi::RegionOfInterestFilter;
use crate::segmentation::PlaneSegmenter;
use scenegrasp_core::{
    ClusteringAlgorithm, ClusteringConfig, ClusteringMethod, ClusteringResult, PointSet, Result,
    RoiConfig, SegmentationConfig, Surface,
};

/// Returns the algorithm implementing `method`.
#[must_use]
pub fn algorithm_for(method: ClusteringMethod) -> Box<dyn ClusteringAlgorithm> {
    match method {
        ClusteringMethod::Euclidean => Box::new(EuclideanClustering::new()),
        ClusteringMethod::Graph => Box::new(GraphClustering::new()),
    }
}

/// Clusters `points` with the algorithm selected in `config`.
///
/// # Errors
/// Returns an error if `config` is invalid.
pub fn extract_clusters(points: &PointSet, config: &ClusteringConfig) -> Result<ClusteringResult> {
    algorithm_for(config.method).cluster(points, config)
}

/// Every intermediate product of one scene decomposition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneDecomposition {
    /// Points that passed the region-of-interest filter.
    pub filtered: PointSet,
    pub surface: Option<Surface>,
    /// Filtered points not on the surface.
    pub remainder: PointSet,
    /// Empty when no surface was found.
    pub clustering: ClusteringResult,
}

impl SceneDecomposition {
    #[must_use]
    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.clustering.clusters.len()
    }
}

/// Filters, segments and clusters one point set.
///
/// Clustering is skipped when no support surface is found.
///
/// # Errors
/// Returns an error if the clustering configuration is invalid.
pub fn segment_scene(
    points: &PointSet,
    roi: &RoiConfig,
    segmentation: &SegmentationConfig,
    clustering: &ClusteringConfig,
) -> Result<SceneDecomposition> {
    let filtered = RegionOfInterestFilter::new(roi.clone()).filter(points);
    let (surface, remainder) = PlaneSegmenter::new(segmentation.clone())
        .segment(&filtered)
        .into_parts();

    let clustering = if surface.is_some() {
        extract_clusters(&remainder, clustering)?
    } else {
        ClusteringResult::default()
    };

    Ok(SceneDecomposition {
        filtered,
        surface,
        remainder,
        clustering,
    })
}
