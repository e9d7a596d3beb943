//! Scene fixtures shared by the integration tests.
#![allow(dead_code, clippy::cast_precision_loss)]

use scenegrasp_core::{FrameHeader, Point, RawFrame, ScenegraspConfig};

/// 40 x 25 cm table at 1 cm spacing, 1000 points at depth `z`.
pub fn table(z: f32) -> Vec<Point> {
    let mut points = Vec::with_capacity(1000);
    for i in 0..40 {
        for j in 0..25 {
            points.push(Point::new(i as f32 * 0.01, j as f32 * 0.01, z));
        }
    }
    points
}

/// 4.5 x 4.5 x 3.5 cm block at 5 mm spacing, 800 points.
pub fn block(x0: f32, y0: f32, z0: f32) -> Vec<Point> {
    let mut points = Vec::with_capacity(800);
    for i in 0..10 {
        for j in 0..10 {
            for k in 0..8 {
                points.push(Point::new(
                    x0 + i as f32 * 0.005,
                    y0 + j as f32 * 0.005,
                    z0 + k as f32 * 0.005,
                ));
            }
        }
    }
    points
}

/// Table at 1 m with two blocks standing on it; the second starts at x = 0.25.
pub fn two_object_scene() -> Vec<Point> {
    let mut points = table(1.0);
    points.extend(block(0.05, 0.05, 0.90));
    points.extend(block(0.25, 0.10, 0.90));
    points
}

pub fn config() -> ScenegraspConfig {
    let mut config = ScenegraspConfig::new("test");
    config.segmentation.max_iterations = 1000;
    config
}

pub fn frame(seq: u64, points: &[Point]) -> RawFrame {
    RawFrame::from_points(FrameHeader::new(seq, "camera"), points)
}
