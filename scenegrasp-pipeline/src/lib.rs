//! scenegrasp-pipeline: Frame processing and live runtime for scenegrasp.
//!
//! This crate ties the stages together:
//! - **`FrameProcessor`** - one frame through filtering, segmentation,
//!   clustering and grasp fan-out, with the visited states recorded
//! - **`GraspTargetOrchestrator`** - one isolated planner call per object,
//!   results in cluster order
//! - **`LivePipeline`** - latest-wins ingress, single in-flight frame and a
//!   sink worker behind a bounded queue
//! - **`PrincipalAxisPlanner`** - baseline footprint-based grasp planner
//!

mod cancel;
mod error;
mod orchestrator;
mod planner;
mod processor;
mod runtime;
mod sink;
mod slot;

pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use orchestrator::GraspTargetOrchestrator;
pub use planner::PrincipalAxisPlanner;
pub use processor::FrameProcessor;
pub use runtime::{LivePipeline, RunOptions, RunSummary, StopHandle};
pub use sink::{SinkStats, SinkWorker};
pub use slot::FrameSlot;
