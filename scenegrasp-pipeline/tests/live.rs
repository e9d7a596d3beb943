mod common;

use common::{config, frame, two_object_scene};
use scenegrasp_core::{
    Cluster, Error, FrameSource, GraspError, GraspPair, GraspPlanner, Point, PointSet, RawFrame,
    SceneReport, SceneSink, Surface,
};
use scenegrasp_io::{read_pcd, write_pcd, DataFormat, DirectorySink, DirectorySource, FrameSummary};
use scenegrasp_pipeline::{LivePipeline, PrincipalAxisPlanner, RunOptions, StopHandle};
use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

/// Replays scripted frames and errors, optionally waiting on a gate before
/// handing out the second frame.
struct ScriptedSource {
    items: VecDeque<scenegrasp_core::Result<RawFrame>>,
    delivered: usize,
    gate: Option<Receiver<()>>,
}

impl ScriptedSource {
    fn frames(frames: impl IntoIterator<Item = RawFrame>) -> Self {
        Self {
            items: frames.into_iter().map(Ok).collect(),
            delivered: 0,
            gate: None,
        }
    }

    fn with_gate(mut self, gate: Receiver<()>) -> Self {
        self.gate = Some(gate);
        self
    }
}

impl FrameSource for ScriptedSource {
    fn topic(&self) -> &str {
        "scripted"
    }

    fn next_frame(&mut self) -> scenegrasp_core::Result<Option<RawFrame>> {
        if self.delivered == 1 {
            if let Some(gate) = &self.gate {
                let _ = gate.recv_timeout(Duration::from_secs(10));
            }
        }
        self.delivered += 1;
        self.items.pop_front().transpose()
    }
}

#[derive(Clone, Default)]
struct Recording(Arc<Mutex<Vec<SceneReport>>>);

impl Recording {
    fn seqs(&self) -> Vec<u64> {
        self.0.lock().unwrap().iter().map(|r| r.header.seq).collect()
    }
}

impl SceneSink for Recording {
    fn present(&mut self, report: &SceneReport) -> scenegrasp_core::Result<()> {
        self.0
            .lock()
            .map_err(|_| Error::Sink("poisoned".into()))?
            .push(report.clone());
        Ok(())
    }
}

/// Signals the first call, then stalls long enough for a newer frame to arrive.
struct StallingPlanner {
    started: Mutex<Option<Sender<()>>>,
}

impl GraspPlanner for StallingPlanner {
    fn name(&self) -> &'static str {
        "stalling"
    }

    fn compute_grasp(&self, _: &Surface, object: &Cluster) -> Result<GraspPair, GraspError> {
        if let Some(started) = self.started.lock().unwrap().take() {
            let _ = started.send(());
            thread::sleep(Duration::from_millis(300));
        }
        Ok(GraspPair::new(object.points[0], object.points[0]))
    }
}

/// Requests a stop once `limit` reports have been presented.
struct StoppingSink {
    stop: StopHandle,
    presented: usize,
    limit: usize,
}

impl SceneSink for StoppingSink {
    fn present(&mut self, _: &SceneReport) -> scenegrasp_core::Result<()> {
        self.presented += 1;
        if self.presented >= self.limit {
            self.stop.stop();
        }
        Ok(())
    }
}

fn small_frame(seq: u64) -> RawFrame {
    frame(seq, &[Point::new(0.0, 0.0, 1.0), Point::new(0.01, 0.0, 1.0)])
}

#[test]
fn test_once_processes_single_frame() {
    let pipeline = LivePipeline::new(&config(), PrincipalAxisPlanner::new())
        .unwrap()
        .with_options(RunOptions::once());
    let mut source = ScriptedSource::frames([frame(0, &two_object_scene()), small_frame(1)]);
    let sink = Recording::default();

    let summary = pipeline.run(&mut source, sink.clone()).unwrap();

    assert_eq!(summary.frames_received, 1);
    assert_eq!(summary.frames_processed, 1);
    assert_eq!(summary.sink.presented, 1);
    let reports = sink.0.lock().unwrap();
    assert_eq!(reports[0].objects.len(), 2);
    assert_eq!(reports[0].grasp_count(), 2);
}

#[test]
fn test_every_frame_is_processed_or_superseded() {
    let mut config = config();
    config.pipeline.sink_queue_depth = 64;
    let pipeline = LivePipeline::new(&config, PrincipalAxisPlanner::new()).unwrap();
    let mut source = ScriptedSource::frames((0..20).map(small_frame));
    let sink = Recording::default();

    let summary = pipeline.run(&mut source, sink.clone()).unwrap();

    assert_eq!(summary.frames_received, 20);
    assert_eq!(summary.frames_processed + summary.frames_superseded, 20);
    assert_eq!(summary.sink.presented, summary.frames_processed);
    let seqs = sink.seqs();
    assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    // The newest frame is never superseded.
    assert_eq!(seqs.last(), Some(&19));
}

#[test]
fn test_source_errors_are_skipped_then_give_up() {
    let pipeline = LivePipeline::new(&config(), PrincipalAxisPlanner::new()).unwrap();
    let mut items: VecDeque<_> = VecDeque::new();
    items.push_back(Ok(small_frame(0)));
    items.push_back(Err(Error::Source("transient".into())));
    items.push_back(Ok(small_frame(1)));
    for _ in 0..8 {
        items.push_back(Err(Error::Source("gone".into())));
    }
    items.push_back(Ok(small_frame(2)));
    let mut source = ScriptedSource {
        items,
        delivered: 0,
        gate: None,
    };

    let summary = pipeline.run(&mut source, Recording::default()).unwrap();

    assert_eq!(summary.source_errors, 9);
    assert_eq!(summary.frames_received, 2);
}

#[test]
fn test_stop_before_run_reads_nothing() {
    let pipeline = LivePipeline::new(&config(), PrincipalAxisPlanner::new()).unwrap();
    pipeline.stop_handle().stop();
    let mut source = ScriptedSource::frames((0..3).map(small_frame));

    let summary = pipeline.run(&mut source, Recording::default()).unwrap();
    assert_eq!(summary.frames_received, 0);
    assert_eq!(summary.frames_processed, 0);
}

#[test]
fn test_superseded_frame_in_progress_is_discarded() {
    let mut config = config();
    config.pipeline.cancel_superseded = true;
    config.pipeline.parallel_grasps = false;
    let (started, gate) = channel();
    let planner = StallingPlanner {
        started: Mutex::new(Some(started)),
    };
    let pipeline = LivePipeline::new(&config, planner).unwrap();
    let scene = two_object_scene();
    let mut source =
        ScriptedSource::frames([frame(0, &scene), frame(1, &scene)]).with_gate(gate);
    let sink = Recording::default();

    let summary = pipeline.run(&mut source, sink.clone()).unwrap();

    assert_eq!(summary.frames_received, 2);
    assert_eq!(summary.frames_processed, 2);
    assert_eq!(summary.frames_cancelled, 1);
    assert_eq!(sink.seqs(), vec![1]);
}

#[test]
fn test_directory_replay_to_directory_sink() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    let scene: PointSet = two_object_scene().into();
    write_pcd(input.path().join("000.pcd"), &scene, DataFormat::Binary).unwrap();
    write_pcd(input.path().join("001.pcd"), &scene, DataFormat::Ascii).unwrap();

    let mut config = config();
    config.pipeline.sink_queue_depth = 4;
    let pipeline = LivePipeline::new(&config, PrincipalAxisPlanner::new()).unwrap();
    let mut source = DirectorySource::open(input.path().to_string_lossy()).unwrap();
    let sink = DirectorySink::create(output.path()).unwrap();

    let summary = pipeline.run(&mut source, sink).unwrap();
    assert_eq!(summary.frames_received, 2);

    let written = DirectorySink::create(output.path()).unwrap();
    let last = written.frame_dir(1);
    let summary: FrameSummary =
        serde_json::from_reader(std::fs::File::open(last.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary.frame_id, "001");
    assert_eq!(summary.surface_points, 1000);
    assert_eq!(summary.objects.len(), 2);
    assert_eq!(summary.grasps().count(), 2);
    assert_eq!(read_pcd(last.join("object-0.pcd")).unwrap().len(), 800);
    assert_eq!(read_pcd(last.join("surface.pcd")).unwrap().len(), 1000);
}

#[test]
fn test_stop_ends_repeating_replay() {
    let input = tempdir().unwrap();
    let scene: PointSet = two_object_scene().into();
    write_pcd(input.path().join("000.pcd"), &scene, DataFormat::Binary).unwrap();

    let pipeline = LivePipeline::new(&config(), PrincipalAxisPlanner::new()).unwrap();
    let mut source = DirectorySource::open(input.path().to_string_lossy())
        .unwrap()
        .with_repeat(true);
    let sink = StoppingSink {
        stop: pipeline.stop_handle(),
        presented: 0,
        limit: 3,
    };

    let summary = pipeline.run(&mut source, sink).unwrap();
    assert!(pipeline.stop_handle().is_stopped());
    assert!(summary.sink.presented >= 3);
    assert!(summary.frames_received >= summary.frames_processed);
}

#[test]
fn test_unreadable_file_does_not_end_replay() {
    let input = tempdir().unwrap();
    std::fs::write(
        input.path().join("000.pcd"),
        "FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 4294967295\nHEIGHT 4294967295\nDATA binary\n",
    )
    .unwrap();
    write_pcd(
        input.path().join("001.pcd"),
        &PointSet::from(two_object_scene()),
        DataFormat::Binary,
    )
    .unwrap();

    let pipeline = LivePipeline::new(&config(), PrincipalAxisPlanner::new()).unwrap();
    let mut source = DirectorySource::open(input.path().to_string_lossy()).unwrap();

    let summary = pipeline.run(&mut source, Recording::default()).unwrap();
    assert_eq!(summary.source_errors, 1);
    assert_eq!(summary.frames_received, 1);
}
