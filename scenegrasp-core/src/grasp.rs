//! Grasp pair type and the planner collaborator trait.

use crate::clustering::Cluster;
use crate::error::GraspError;
use crate::point::Point;
use crate::surface::Surface;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Two opposing contact locations for a parallel gripper.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GraspPair {
    pub first: Point,
    pub second: Point,
    /// Planner-specific ranking value, higher is better.
    pub score: Option<f32>,
}

impl GraspPair {
    #[must_use]
    pub fn new(first: Point, second: Point) -> Self {
        Self {
            first,
            second,
            score: None,
        }
    }

    #[must_use]
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    /// Distance between the two contacts.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.first.distance_squared(&self.second).sqrt()
    }
}

/// Computes a grasp for one object resting on the support surface.
///
/// Implementations are expected to be deterministic for a fixed geometric
/// input. They are called concurrently for different objects of the same
/// frame.
pub trait GraspPlanner: Send + Sync {
    /// Planner name, used in logs.
    fn name(&self) -> &'static str;

    /// Computes the best grasp pair for `object`.
    ///
    /// # Errors
    /// Returns a [`GraspError`] when no grasp can be produced for this object.
    fn compute_grasp(&self, surface: &Surface, object: &Cluster) -> Result<GraspPair, GraspError>;
}

impl<P: GraspPlanner + ?Sized> GraspPlanner for std::sync::Arc<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn compute_grasp(&self, surface: &Surface, object: &Cluster) -> Result<GraspPair, GraspError> {
        (**self).compute_grasp(surface, object)
    }
}

impl<P: GraspPlanner + ?Sized> GraspPlanner for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn compute_grasp(&self, surface: &Surface, object: &Cluster) -> Result<GraspPair, GraspError> {
        (**self).compute_grasp(surface, object)
    }
}
