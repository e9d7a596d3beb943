//! Per-object grasp fan-out.
//!
//! One planner invocation per cluster, each isolated from the others: a
//! declined, failed or panicking invocation only affects its own object.
//! Results always come back in cluster order.

use crate::cancel::CancelToken;
use rayon::prelude::*;
use scenegrasp_core::{
    Cluster, ClusterSet, GraspError, GraspOutcome, GraspPlanner, ObjectReport, Surface,
};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Dispatches grasp computations for the objects of one frame.
#[derive(Debug, Clone)]
pub struct GraspTargetOrchestrator<P> {
    planner: P,
    parallel: bool,
}

impl<P: GraspPlanner> GraspTargetOrchestrator<P> {
    #[must_use]
    pub fn new(planner: P) -> Self {
        Self {
            planner,
            parallel: true,
        }
    }

    /// Runs the invocations on the rayon pool instead of sequentially.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn planner(&self) -> &P {
        &self.planner
    }

    /// Computes one grasp per cluster.
    ///
    /// The returned reports are in `clusters` order. Clusters not yet started
    /// when `cancel` fires are reported as [`GraspOutcome::Cancelled`].
    #[must_use]
    pub fn dispatch(
        &self,
        surface: &Surface,
        clusters: ClusterSet,
        cancel: &CancelToken,
    ) -> Vec<ObjectReport> {
        let plan = |(index, cluster): (usize, Cluster)| {
            let outcome = self.plan_one(surface, &cluster, index, cancel);
            ObjectReport {
                index,
                cluster,
                outcome,
            }
        };

        if self.parallel {
            clusters.into_par_iter().enumerate().map(plan).collect()
        } else {
            clusters.into_iter().enumerate().map(plan).collect()
        }
    }

    fn plan_one(
        &self,
        surface: &Surface,
        cluster: &Cluster,
        index: usize,
        cancel: &CancelToken,
    ) -> GraspOutcome {
        if cancel.is_cancelled() {
            return GraspOutcome::Cancelled;
        }

        let result = catch_unwind(AssertUnwindSafe(|| {
            self.planner.compute_grasp(surface, cluster)
        }));
        match result {
            Ok(Ok(pair)) => GraspOutcome::Found(pair),
            Ok(Err(GraspError::Declined(reason))) => {
                log::debug!("object {index}: {} declined: {reason}", self.planner.name());
                GraspOutcome::Declined(reason)
            }
            Ok(Err(err @ GraspError::DegenerateObject { .. })) => {
                log::debug!("object {index}: {err}");
                GraspOutcome::Declined(err.to_string())
            }
            Ok(Err(GraspError::Failed(reason))) => {
                log::warn!("object {index}: {} failed: {reason}", self.planner.name());
                GraspOutcome::Failed(reason)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::warn!(
                    "object {index}: {} panicked: {message}",
                    self.planner.name()
                );
                GraspOutcome::Failed(format!("planner panicked: {message}"))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
