//! Single-frame processing.
//!
//! Drives one frame through ingestion, filtering, segmentation, clustering
//! and grasp fan-out, recording every state it passes through:
//!
//! ```text
//! Ingested -> Filtered -> Segmented -> NoSurface -> Done
//!                                   -> SurfaceFound -> Clustered -> NoClusters -> Done
//!                                                                -> ClustersFound -> PerClusterGrasp -> Done
//! ```
//!
//! Every path ends in `Done` with whatever was computed; nothing is retried.

use crate::cancel::CancelToken;
use crate::orchestrator::GraspTargetOrchestrator;
use crate::Result;
use scenegrasp_algorithms::{extract_clusters, PlaneSegmenter, RegionOfInterestFilter};
use scenegrasp_core::{
    ClusteringConfig, FrameHeader, FrameOutcome, FrameState, GraspPlanner, PointSet, RawFrame,
    SceneReport, ScenegraspConfig,
};
use scenegrasp_io::CloudIngestor;
use std::time::Instant;

/// Processes frames synchronously on the calling thread.
pub struct FrameProcessor<P> {
    ingestor: CloudIngestor,
    roi: RegionOfInterestFilter,
    segmenter: PlaneSegmenter,
    clustering: ClusteringConfig,
    orchestrator: GraspTargetOrchestrator<P>,
}

impl<P: GraspPlanner> FrameProcessor<P> {
    /// Builds a processor from a validated configuration.
    ///
    /// # Errors
    /// Returns a configuration error if any stage parameter is invalid.
    pub fn new(config: &ScenegraspConfig, planner: P) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ingestor: CloudIngestor::new(),
            roi: RegionOfInterestFilter::new(config.roi.clone()),
            segmenter: PlaneSegmenter::new(config.segmentation.clone()),
            clustering: config.clustering.clone(),
            orchestrator: GraspTargetOrchestrator::new(planner)
                .with_parallel(config.pipeline.parallel_grasps),
        })
    }

    #[must_use]
    pub fn planner(&self) -> &P {
        self.orchestrator.planner()
    }

    /// Decodes and processes one raw frame.
    ///
    /// A malformed frame is logged and reported as an empty frame.
    #[must_use]
    pub fn process(&self, frame: &RawFrame, cancel: &CancelToken) -> SceneReport {
        let started = Instant::now();
        match self.ingestor.ingest(frame) {
            Ok(cloud) => {
                let mut report = self.process_points(frame.header.clone(), cloud.points, cancel);
                report.raw_points = cloud.stats.declared;
                report.invalid_points = cloud.stats.invalid;
                report.elapsed = started.elapsed();
                report
            }
            Err(err) => {
                log::warn!("frame {}: {err}", frame.header.seq);
                let mut report = SceneReport::empty(frame.header.clone());
                report.raw_points = frame.point_count();
                report.states = vec![FrameState::Ingested, FrameState::Done];
                report.elapsed = started.elapsed();
                report
            }
        }
    }

    /// Processes an already decoded, finite point set.
    #[must_use]
    pub fn process_points(
        &self,
        header: FrameHeader,
        points: PointSet,
        cancel: &CancelToken,
    ) -> SceneReport {
        let started = Instant::now();
        let seq = header.seq;
        let mut report = SceneReport::empty(header);
        report.raw_points = points.len();

        let enter = |report: &mut SceneReport, state: FrameState| {
            log::debug!("frame {seq}: {state:?}");
            report.states.push(state);
        };

        enter(&mut report, FrameState::Ingested);
        let filtered = self.roi.filter(&points);
        enter(&mut report, FrameState::Filtered);

        let (surface, remainder) = self.segmenter.segment(&filtered).into_parts();
        enter(&mut report, FrameState::Segmented);
        report.filtered = filtered;
        report.remainder = remainder;

        let Some(surface) = surface else {
            enter(&mut report, FrameState::NoSurface);
            report.outcome = if report.filtered.is_empty() {
                FrameOutcome::Empty
            } else {
                FrameOutcome::RawCloudOnly
            };
            enter(&mut report, FrameState::Done);
            report.elapsed = started.elapsed();
            return report;
        };
        enter(&mut report, FrameState::SurfaceFound);

        let clusters = match extract_clusters(&report.remainder, &self.clustering) {
            Ok(result) => result.clusters,
            Err(err) => {
                log::warn!("frame {seq}: clustering failed: {err}");
                Vec::new()
            }
        };
        enter(&mut report, FrameState::Clustered);

        if clusters.is_empty() {
            enter(&mut report, FrameState::NoClusters);
            report.outcome = FrameOutcome::SurfaceOnly;
        } else {
            enter(&mut report, FrameState::ClustersFound);
            enter(&mut report, FrameState::PerClusterGrasp);
            report.objects = self.orchestrator.dispatch(&surface, clusters, cancel);
            report.outcome = FrameOutcome::Objects;
        }
        report.surface = Some(surface);
        enter(&mut report, FrameState::Done);

        report.elapsed = started.elapsed();
        report
    }
}
