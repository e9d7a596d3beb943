//! Continuous frame processing.
//!
//! Three threads cooperate:
//! - ingress pulls frames from the source into a latest-wins slot,
//! - the caller's thread processes one frame at a time from that slot,
//! - the sink worker presents finished reports from a bounded queue.
//!
//! Ingress never waits for processing and processing never waits for the
//! sink, so a slow consumer only ever causes frames or reports to be dropped.

use crate::cancel::CancelToken;
use crate::processor::FrameProcessor;
use crate::sink::{SinkStats, SinkWorker};
use crate::slot::FrameSlot;
use crate::{Error, Result};
use scenegrasp_core::{
    FrameSource, GraspPlanner, PipelineConfig, RawFrame, SceneSink, ScenegraspConfig,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Ingress gives up after this many source errors in a row.
const MAX_CONSECUTIVE_SOURCE_ERRORS: u32 = 8;

/// Limits for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop pulling after this many frames.
    pub max_frames: Option<u64>,
    /// Pause between frames pulled from the source.
    pub frame_interval: Option<Duration>,
}

impl RunOptions {
    /// Pull a single frame, then stop.
    #[must_use]
    pub fn once() -> Self {
        Self {
            max_frames: Some(1),
            frame_interval: None,
        }
    }

    #[must_use]
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    #[must_use]
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }
}

/// Requests a running pipeline to stop after the frame in progress.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames delivered by the source.
    pub frames_received: u64,
    /// Frames taken from the slot and processed.
    pub frames_processed: u64,
    /// Frames replaced in the slot before processing started.
    pub frames_superseded: u64,
    /// Processed frames whose report was discarded after cancellation.
    pub frames_cancelled: u64,
    pub source_errors: u64,
    pub sink: SinkStats,
}

struct PendingFrame {
    frame: RawFrame,
    cancel: CancelToken,
}

#[derive(Debug, Default)]
struct IngressStats {
    received: u64,
    errors: u64,
}

/// Closes the slot when ingress ends, including by panic.
struct CloseOnDrop<'a, T>(&'a FrameSlot<T>);

impl<T> Drop for CloseOnDrop<'_, T> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Live pipeline: source, frame processor and sink on separate threads.
pub struct LivePipeline<P> {
    processor: FrameProcessor<P>,
    pipeline: PipelineConfig,
    options: RunOptions,
    stop: StopHandle,
}

impl<P: GraspPlanner> LivePipeline<P> {
    /// Builds the pipeline from a configuration and a grasp planner.
    ///
    /// # Errors
    /// Returns a configuration error if any stage parameter is invalid.
    pub fn new(config: &ScenegraspConfig, planner: P) -> Result<Self> {
        Ok(Self {
            processor: FrameProcessor::new(config, planner)?,
            pipeline: config.pipeline.clone(),
            options: RunOptions::default(),
            stop: StopHandle::default(),
        })
    }

    #[must_use]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn processor(&self) -> &FrameProcessor<P> {
        &self.processor
    }

    /// Handle that stops [`run`](Self::run) from another thread.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Runs until the source is exhausted, the frame limit is reached or a
    /// stop is requested, then drains the sink.
    ///
    /// # Errors
    /// Returns an error if a worker thread cannot be started or panics.
    pub fn run<Src, S>(&self, source: &mut Src, sink: S) -> Result<RunSummary>
    where
        Src: FrameSource + ?Sized,
        S: SceneSink + 'static,
    {
        let sink = SinkWorker::spawn(sink, self.pipeline.sink_queue_depth)?;
        let slot = FrameSlot::<PendingFrame>::new();
        let mut summary = RunSummary::default();
        log::info!("processing frames from {}", source.topic());

        let ingress = thread::scope(|scope| -> Result<IngressStats> {
            let producer = thread::Builder::new()
                .name("scenegrasp-ingress".into())
                .spawn_scoped(scope, || self.ingress(source, &slot))
                .map_err(|err| Error::Spawn {
                    name: "ingress",
                    source: err,
                })?;

            while let Some(pending) = slot.take() {
                let report = self.processor.process(&pending.frame, &pending.cancel);
                summary.frames_processed += 1;
                if pending.cancel.is_cancelled() {
                    summary.frames_cancelled += 1;
                    log::info!(
                        "frame {} superseded during processing, report discarded",
                        report.header.seq
                    );
                    continue;
                }
                sink.submit(Arc::new(report));
            }

            producer
                .join()
                .map_err(|_| Error::WorkerPanicked("ingress"))
        })?;

        summary.frames_received = ingress.received;
        summary.source_errors = ingress.errors;
        summary.frames_superseded = slot.replaced();
        summary.sink = sink.finish()?;
        log::info!(
            "run finished: {} received, {} processed, {} superseded, {} cancelled, {} presented",
            summary.frames_received,
            summary.frames_processed,
            summary.frames_superseded,
            summary.frames_cancelled,
            summary.sink.presented
        );
        Ok(summary)
    }

    fn ingress<Src>(&self, source: &mut Src, slot: &FrameSlot<PendingFrame>) -> IngressStats
    where
        Src: FrameSource + ?Sized,
    {
        let _close = CloseOnDrop(slot);
        let mut stats = IngressStats::default();
        let mut consecutive_errors = 0;
        let mut last_offered: Option<CancelToken> = None;

        while !self.stop.is_stopped() {
            if self.options.max_frames.is_some_and(|max| stats.received >= max) {
                break;
            }
            match source.next_frame() {
                Ok(Some(frame)) => {
                    consecutive_errors = 0;
                    stats.received += 1;

                    let cancel = CancelToken::new();
                    if let Some(previous) = last_offered.replace(cancel.clone()) {
                        if self.pipeline.cancel_superseded {
                            previous.cancel();
                        }
                    }
                    if let Some(replaced) = slot.offer(PendingFrame { frame, cancel }) {
                        log::warn!(
                            "frame {} superseded before processing",
                            replaced.frame.header.seq
                        );
                    }
                }
                Ok(None) => {
                    log::debug!("source {} exhausted", source.topic());
                    break;
                }
                Err(err) => {
                    stats.errors += 1;
                    consecutive_errors += 1;
                    log::warn!("source {}: {err}", source.topic());
                    if consecutive_errors >= MAX_CONSECUTIVE_SOURCE_ERRORS {
                        log::error!(
                            "source {} failed {consecutive_errors} times in a row, stopping",
                            source.topic()
                        );
                        break;
                    }
                }
            }
            if let Some(interval) = self.options.frame_interval {
                thread::sleep(interval);
            }
        }
        stats
    }
}
