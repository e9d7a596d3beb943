//! scenegrasp-core: Core types and traits for tabletop scene decomposition.
//!
//! This crate provides the frame-scoped data model (points, support surface,
//! object clusters, grasp pairs), stage configuration, and the collaborator
//! traits for frame sources, grasp planners and scene sinks.
//!

pub mod clustering;
pub mod config;
pub mod error;
pub mod frame;
pub mod grasp;
pub mod point;
pub mod scene;
pub mod surface;

pub use clustering::{
    Cluster, ClusterSet, ClusteringAlgorithm, ClusteringConfig, ClusteringMethod, ClusteringResult,
    ClusteringStatistics,
};
pub use config::{PipelineConfig, RoiConfig, ScenegraspConfig, SegmentationConfig};
pub use error::{Error, GraspError, IngestError, Result};
pub use frame::{FieldType, FrameHeader, FrameSource, PointField, RawFrame};
pub use grasp::{GraspPair, GraspPlanner};
pub use point::{Axis, Point, PointSet, Rgb};
pub use scene::{FrameOutcome, FrameState, GraspOutcome, ObjectReport, SceneReport, SceneSink};
pub use surface::{Plane, Surface, SurfaceModel};
