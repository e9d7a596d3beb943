//! Stage and pipeline configuration.
//!
//! Defaults reproduce the tabletop tuning: depth window 0 to 1.5 m, 1 cm plane
//! threshold with 50 RANSAC iterations, 1 cm cluster tolerance and at least
//! 750 points per object.

use crate::clustering::ClusteringConfig;
use crate::error::{Error, Result};
use crate::point::Axis;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Region-of-interest (pass-through) filter configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RoiConfig {
    /// Axis the limits apply to.
    pub axis: Axis,
    /// Inclusive lower limit (meters).
    pub min: f32,
    /// Inclusive upper limit (meters).
    pub max: f32,
    /// Keep the points outside the interval instead.
    pub negative: bool,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            axis: Axis::Z,
            min: 0.0,
            max: 1.5,
            negative: false,
        }
    }
}

impl RoiConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, min: f32, max: f32) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    #[must_use]
    pub fn with_negative(mut self, negative: bool) -> Self {
        self.negative = negative;
        self
    }

    /// # Errors
    /// Returns [`Error::Config`] for non-finite limits or `min > max`.
    pub fn validate(&self) -> Result<()> {
        if !(self.min.is_finite() && self.max.is_finite()) {
            return Err(Error::Config(format!(
                "ROI limits must be finite, got [{}, {}]",
                self.min, self.max
            )));
        }
        if self.min > self.max {
            return Err(Error::Config(format!(
                "ROI lower limit {} exceeds upper limit {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// RANSAC plane segmentation configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SegmentationConfig {
    /// Maximum point-to-plane distance (meters) for an inlier.
    pub distance_threshold: f32,
    /// Number of hypotheses sampled.
    pub max_iterations: usize,
    /// Seed of the sampling generator.
    pub seed: u64,
    /// Refit the winning plane to all of its inliers.
    pub refine_coefficients: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 0.01,
            max_iterations: 50,
            seed: 0x5EED,
            refine_coefficients: true,
        }
    }
}

impl SegmentationConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_distance_threshold(mut self, threshold: f32) -> Self {
        self.distance_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_refine_coefficients(mut self, refine: bool) -> Self {
        self.refine_coefficients = refine;
        self
    }

    /// # Errors
    /// Returns [`Error::Config`] for a non-positive threshold.
    pub fn validate(&self) -> Result<()> {
        if !(self.distance_threshold.is_finite() && self.distance_threshold > 0.0) {
            return Err(Error::Config(format!(
                "plane distance threshold must be positive, got {}",
                self.distance_threshold
            )));
        }
        Ok(())
    }
}

/// Runtime behavior of the live pipeline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Bounded queue depth between the processing thread and the sink.
    pub sink_queue_depth: usize,
    /// Cancel the in-flight frame when a newer one arrives.
    pub cancel_superseded: bool,
    /// Run grasp computations for the clusters of a frame in parallel.
    pub parallel_grasps: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sink_queue_depth: 2,
            cancel_superseded: false,
            parallel_grasps: true,
        }
    }
}

impl PipelineConfig {
    /// Set the sink queue depth.
    ///
    /// Values less than 1 are clamped to 1.
    #[must_use]
    pub fn with_sink_queue_depth(mut self, depth: usize) -> Self {
        self.sink_queue_depth = depth.max(1);
        self
    }

    #[must_use]
    pub fn with_cancel_superseded(mut self, cancel: bool) -> Self {
        self.cancel_superseded = cancel;
        self
    }

    #[must_use]
    pub fn with_parallel_grasps(mut self, parallel: bool) -> Self {
        self.parallel_grasps = parallel;
        self
    }
}

/// Complete configuration of a scenegrasp node.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScenegraspConfig {
    /// Name of the source of incoming frames.
    pub topic: String,
    pub roi: RoiConfig,
    pub segmentation: SegmentationConfig,
    pub clustering: ClusteringConfig,
    pub pipeline: PipelineConfig,
}

impl ScenegraspConfig {
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    /// Validates every stage.
    ///
    /// # Errors
    /// Returns the first [`Error::Config`] found.
    pub fn validate(&self) -> Result<()> {
        self.roi.validate()?;
        self.segmentation.validate()?;
        self.clustering.validate()?;
        if self.pipeline.sink_queue_depth == 0 {
            return Err(Error::Config("sink queue depth must be at least 1".into()));
        }
        Ok(())
    }
}
