//! Per-frame scene reports and the sink collaborator trait.

use crate::clustering::Cluster;
use crate::error::Result;
use crate::frame::FrameHeader;
use crate::grasp::GraspPair;
use crate::point::PointSet;
use crate::surface::Surface;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// States a frame passes through on its way to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FrameState {
    Ingested,
    Filtered,
    Segmented,
    NoSurface,
    SurfaceFound,
    Clustered,
    NoClusters,
    ClustersFound,
    PerClusterGrasp,
    Done,
}

/// What a finished frame contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FrameOutcome {
    /// Nothing usable in the frame.
    Empty,
    /// No support surface; only the filtered cloud.
    RawCloudOnly,
    /// A surface but no object large enough.
    SurfaceOnly,
    /// Surface and at least one object.
    Objects,
}

impl std::fmt::Display for FrameOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameOutcome::Empty => write!(f, "empty"),
            FrameOutcome::RawCloudOnly => write!(f, "raw cloud only"),
            FrameOutcome::SurfaceOnly => write!(f, "surface only"),
            FrameOutcome::Objects => write!(f, "objects"),
        }
    }
}

/// Result of the grasp computation for one object.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GraspOutcome {
    Found(GraspPair),
    /// The planner declined or reported a degenerate target.
    Declined(String),
    /// The planner failed or panicked.
    Failed(String),
    /// The frame was superseded before this object was planned.
    Cancelled,
}

impl GraspOutcome {
    #[must_use]
    pub fn grasp(&self) -> Option<&GraspPair> {
        match self {
            GraspOutcome::Found(pair) => Some(pair),
            _ => None,
        }
    }
}

/// One detected object and its grasp result.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectReport {
    /// Position of the cluster in the frame's cluster set.
    pub index: usize,
    pub cluster: Cluster,
    pub outcome: GraspOutcome,
}

impl ObjectReport {
    #[must_use]
    pub fn grasp(&self) -> Option<&GraspPair> {
        self.outcome.grasp()
    }
}

/// Everything computed for one frame.
///
/// Reports are immutable once built and shared with the sink behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SceneReport {
    pub header: FrameHeader,
    pub outcome: FrameOutcome,
    /// States visited, in order, ending with [`FrameState::Done`].
    pub states: Vec<FrameState>,
    /// Point records in the raw frame.
    pub raw_points: usize,
    /// Samples dropped for non-finite coordinates.
    pub invalid_points: usize,
    /// Cloud after region-of-interest filtering.
    pub filtered: PointSet,
    pub surface: Option<Surface>,
    /// Filtered points not on the surface.
    pub remainder: PointSet,
    /// Objects in cluster-set order.
    pub objects: Vec<ObjectReport>,
    pub elapsed: Duration,
}

impl SceneReport {
    /// Report for a frame that produced nothing.
    #[must_use]
    pub fn empty(header: FrameHeader) -> Self {
        Self {
            header,
            outcome: FrameOutcome::Empty,
            states: Vec::new(),
            raw_points: 0,
            invalid_points: 0,
            filtered: PointSet::new(),
            surface: None,
            remainder: PointSet::new(),
            objects: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Number of objects with a grasp pair.
    #[must_use]
    pub fn grasp_count(&self) -> usize {
        self.objects.iter().filter(|o| o.grasp().is_some()).count()
    }

    /// Grasp pair of each object, by cluster index.
    pub fn grasps(&self) -> impl Iterator<Item = (usize, Option<&GraspPair>)> {
        self.objects.iter().map(|o| (o.index, o.grasp()))
    }
}

/// Consumer of finished frames (display, recording, downstream planning).
///
/// A sink owns its output resources and is driven from a single thread.
pub trait SceneSink: Send {
    /// Presents one completed frame.
    ///
    /// # Errors
    /// Returns [`crate::Error::Sink`] if the output could not be produced.
    fn present(&mut self, report: &SceneReport) -> Result<()>;
}

impl<S: SceneSink + ?Sized> SceneSink for Box<S> {
    fn present(&mut self, report: &SceneReport) -> Result<()> {
        (**self).present(report)
    }
}
