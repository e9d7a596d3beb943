//! Sink worker thread fed by a bounded channel.

use crate::{Error, Result};
use scenegrasp_core::{SceneReport, SceneSink};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Counters of a finished sink worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub presented: u64,
    pub failed: u64,
    /// Reports rejected because the queue was full.
    pub dropped: u64,
}

/// Owns a [`SceneSink`] on a dedicated thread.
///
/// Submitting never blocks: when the queue is full the report is dropped
/// and counted.
pub struct SinkWorker {
    sender: Option<SyncSender<Arc<SceneReport>>>,
    handle: Option<JoinHandle<(u64, u64)>>,
    dropped: Arc<AtomicU64>,
}

impl SinkWorker {
    /// Starts the worker with room for `depth` pending reports.
    ///
    /// # Errors
    /// Returns [`Error::Spawn`] if the thread cannot be created.
    pub fn spawn<S: SceneSink + 'static>(mut sink: S, depth: usize) -> Result<Self> {
        let (sender, receiver) = sync_channel::<Arc<SceneReport>>(depth.max(1));
        let handle = thread::Builder::new()
            .name("scenegrasp-sink".into())
            .spawn(move || {
                let mut presented = 0;
                let mut failed = 0;
                for report in receiver {
                    match sink.present(&report) {
                        Ok(()) => presented += 1,
                        Err(err) => {
                            failed += 1;
                            log::warn!("sink failed on frame {}: {err}", report.header.seq);
                        }
                    }
                }
                (presented, failed)
            })
            .map_err(|source| Error::Spawn {
                name: "sink",
                source,
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            dropped: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Queues a report. Returns false if it was dropped.
    pub fn submit(&self, report: Arc<SceneReport>) -> bool {
        let Some(sender) = self.sender.as_ref() else {
            return false;
        };
        match sender.try_send(report) {
            Ok(()) => true,
            Err(TrySendError::Full(report)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "sink queue full, dropping report for frame {}",
                    report.header.seq
                );
                false
            }
            Err(TrySendError::Disconnected(report)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "sink stopped, dropping report for frame {}",
                    report.header.seq
                );
                false
            }
        }
    }

    /// Reports dropped so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Closes the queue, waits for pending reports and stops the thread.
    ///
    /// # Errors
    /// Returns [`Error::WorkerPanicked`] if the sink panicked.
    pub fn finish(mut self) -> Result<SinkStats> {
        self.sender.take();
        let (presented, failed) = match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| Error::WorkerPanicked("sink"))?,
            None => (0, 0),
        };
        Ok(SinkStats {
            presented,
            failed,
            dropped: self.dropped(),
        })
    }
}

impl Drop for SinkWorker {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
