mod common;

use common::{config, frame, table, two_object_scene};
use scenegrasp_core::{
    Cluster, FrameHeader, FrameOutcome, FrameState, GraspError, GraspOutcome, GraspPair,
    GraspPlanner, Point, PointSet, Surface,
};
use scenegrasp_pipeline::{CancelToken, FrameProcessor, PrincipalAxisPlanner};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts invocations and fails for objects whose first point is beyond `fail_beyond_x`.
struct CountingPlanner {
    calls: AtomicUsize,
    fail_beyond_x: f32,
}

impl CountingPlanner {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_beyond_x: f32::INFINITY,
        }
    }

    fn failing_beyond(x: f32) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_beyond_x: x,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GraspPlanner for CountingPlanner {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn compute_grasp(&self, _surface: &Surface, object: &Cluster) -> Result<GraspPair, GraspError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let first = object.points[0];
        if first.x > self.fail_beyond_x {
            return Err(GraspError::Failed("analysis failed".into()));
        }
        Ok(GraspPair::new(first, object.points[object.len() - 1]))
    }
}

#[test]
fn test_empty_frame_finishes_with_nothing() {
    let processor = FrameProcessor::new(&config(), CountingPlanner::new()).unwrap();
    let report = processor.process(&frame(0, &[]), &CancelToken::new());

    assert_eq!(report.outcome, FrameOutcome::Empty);
    assert!(report.filtered.is_empty());
    assert!(report.surface.is_none());
    assert!(report.objects.is_empty());
    assert!(report.states.contains(&FrameState::NoSurface));
    assert_eq!(report.states.last(), Some(&FrameState::Done));
    assert_eq!(processor.planner().calls(), 0);
}

#[test]
fn test_plane_only_frame_has_no_objects() {
    let processor = FrameProcessor::new(&config(), CountingPlanner::new()).unwrap();
    let report = processor.process(&frame(1, &table(1.0)), &CancelToken::new());

    assert_eq!(report.outcome, FrameOutcome::SurfaceOnly);
    assert_eq!(report.surface.as_ref().map(Surface::len), Some(1000));
    assert!(report.remainder.is_empty());
    assert!(report.objects.is_empty());
    assert!(report.states.contains(&FrameState::NoClusters));
    assert_eq!(processor.planner().calls(), 0);
}

#[test]
fn test_two_objects_planned_exactly_twice() {
    let processor = FrameProcessor::new(&config(), CountingPlanner::new()).unwrap();
    let report = processor.process(&frame(2, &two_object_scene()), &CancelToken::new());

    assert_eq!(report.outcome, FrameOutcome::Objects);
    assert_eq!(report.raw_points, 2600);
    assert_eq!(report.objects.len(), 2);
    assert_eq!(processor.planner().calls(), 2);
    for (i, object) in report.objects.iter().enumerate() {
        assert_eq!(object.index, i);
        assert_eq!(object.cluster.len(), 800);
        assert!(object.grasp().is_some());
    }
    assert_eq!(
        report.states,
        vec![
            FrameState::Ingested,
            FrameState::Filtered,
            FrameState::Segmented,
            FrameState::SurfaceFound,
            FrameState::Clustered,
            FrameState::ClustersFound,
            FrameState::PerClusterGrasp,
            FrameState::Done,
        ]
    );
}

#[test]
fn test_failing_object_is_isolated() {
    // The second block starts at x = 0.25.
    let processor =
        FrameProcessor::new(&config(), CountingPlanner::failing_beyond(0.2)).unwrap();
    let report = processor.process(&frame(3, &two_object_scene()), &CancelToken::new());

    assert_eq!(report.objects.len(), 2);
    assert!(matches!(report.objects[0].outcome, GraspOutcome::Found(_)));
    assert!(matches!(report.objects[1].outcome, GraspOutcome::Failed(_)));
    assert_eq!(report.grasp_count(), 1);
    assert_eq!(report.states.last(), Some(&FrameState::Done));
}

#[test]
fn test_invalid_samples_are_removed_before_processing() {
    let mut points = two_object_scene();
    points.extend(vec![Point::new(f32::NAN, 0.0, 1.0); 25]);
    let processor = FrameProcessor::new(&config(), CountingPlanner::new()).unwrap();
    let report = processor.process(&frame(4, &points), &CancelToken::new());

    assert_eq!(report.invalid_points, 25);
    assert_eq!(report.filtered.len(), 2600);
    assert_eq!(report.objects.len(), 2);
}

#[test]
fn test_cancelled_frame_skips_planning() {
    let processor = FrameProcessor::new(&config(), CountingPlanner::new()).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let report = processor.process(&frame(5, &two_object_scene()), &cancel);

    assert_eq!(processor.planner().calls(), 0);
    assert!(report
        .objects
        .iter()
        .all(|o| o.outcome == GraspOutcome::Cancelled));
}

#[test]
fn test_reference_planner_grasps_both_blocks() {
    let processor = FrameProcessor::new(&config(), PrincipalAxisPlanner::new()).unwrap();
    let report = processor.process(&frame(6, &two_object_scene()), &CancelToken::new());

    assert_eq!(report.grasp_count(), 2);
    for object in &report.objects {
        let pair = object.grasp().unwrap();
        // Blocks are 4.5 cm square and 3.5 cm tall.
        assert!(pair.width() > 0.04 && pair.width() < 0.08, "width {}", pair.width());
    }
}

#[test]
fn test_repeated_processing_is_identical() {
    let processor = FrameProcessor::new(&config(), CountingPlanner::new()).unwrap();
    let points: PointSet = two_object_scene().into();
    let header = FrameHeader::new(7, "camera");
    let first = processor.process_points(header.clone(), points.clone(), &CancelToken::new());
    let second = processor.process_points(header, points, &CancelToken::new());

    assert_eq!(first.surface, second.surface);
    assert_eq!(first.remainder, second.remainder);
    assert_eq!(first.objects, second.objects);
}
