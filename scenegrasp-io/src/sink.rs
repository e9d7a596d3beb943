//! Scene sinks that log or record finished frames.

use crate::pcd::{write_pcd, DataFormat};
use crate::Result;
use scenegrasp_core::{
    FrameOutcome, FrameState, GraspOutcome, GraspPair, SceneReport, SceneSink,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Per-object entry of a [`FrameSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub index: usize,
    pub points: usize,
    pub centroid: Option<[f32; 3]>,
    pub outcome: GraspOutcome,
}

/// Compact description of a finished frame, without point data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSummary {
    pub seq: u64,
    pub stamp_ns: u64,
    pub frame_id: String,
    pub outcome: FrameOutcome,
    pub states: Vec<FrameState>,
    pub raw_points: usize,
    pub invalid_points: usize,
    pub filtered_points: usize,
    pub surface_points: usize,
    /// Plane coefficients `[a, b, c, d]`.
    pub plane: Option<[f32; 4]>,
    pub remainder_points: usize,
    pub objects: Vec<ObjectSummary>,
    pub elapsed_ms: f64,
}

impl FrameSummary {
    #[must_use]
    pub fn from_report(report: &SceneReport) -> Self {
        let objects = report
            .objects
            .iter()
            .map(|o| ObjectSummary {
                index: o.index,
                points: o.cluster.len(),
                centroid: o.cluster.centroid().map(|c| [c.x, c.y, c.z]),
                outcome: o.outcome.clone(),
            })
            .collect();

        Self {
            seq: report.header.seq,
            stamp_ns: report.header.stamp_ns,
            frame_id: report.header.frame_id.clone(),
            outcome: report.outcome,
            states: report.states.clone(),
            raw_points: report.raw_points,
            invalid_points: report.invalid_points,
            filtered_points: report.filtered.len(),
            surface_points: report.surface.as_ref().map_or(0, |s| s.len()),
            plane: report.surface.as_ref().map(|s| s.plane().coefficients()),
            remainder_points: report.remainder.len(),
            objects,
            elapsed_ms: report.elapsed.as_secs_f64() * 1e3,
        }
    }

    /// Grasp pairs in object order.
    pub fn grasps(&self) -> impl Iterator<Item = &GraspPair> {
        self.objects.iter().filter_map(|o| match &o.outcome {
            GraspOutcome::Found(pair) => Some(pair),
            _ => None,
        })
    }
}

/// Writes one line per frame (and one per object at debug level) to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl LogSink {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SceneSink for LogSink {
    fn present(&mut self, report: &SceneReport) -> scenegrasp_core::Result<()> {
        log::info!(
            "frame {} ({}): {}, {} filtered points, {} object(s), {} grasp(s) in {:.1} ms",
            report.header.seq,
            report.header.frame_id,
            report.outcome,
            report.filtered.len(),
            report.objects.len(),
            report.grasp_count(),
            report.elapsed.as_secs_f64() * 1e3
        );
        for object in &report.objects {
            match &object.outcome {
                GraspOutcome::Found(pair) => log::debug!(
                    "  object {}: {} points, grasp ({:.3}, {:.3}, {:.3}) -> ({:.3}, {:.3}, {:.3})",
                    object.index,
                    object.cluster.len(),
                    pair.first.x,
                    pair.first.y,
                    pair.first.z,
                    pair.second.x,
                    pair.second.y,
                    pair.second.z
                ),
                other => log::debug!(
                    "  object {}: {} points, no grasp ({other:?})",
                    object.index,
                    object.cluster.len()
                ),
            }
        }
        Ok(())
    }
}

/// Records every frame under `root/frame-<seq>/`.
///
/// Each frame directory holds `surface.pcd`, one `object-<i>.pcd` per
/// cluster, `remainder.pcd` and `summary.json`. Frames without a surface get
/// the filtered cloud as `filtered.pcd` instead.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    format: DataFormat,
}

impl DirectorySink {
    /// Creates the sink, creating `root` if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
            format: DataFormat::Binary,
        })
    }

    #[must_use]
    pub fn with_format(mut self, format: DataFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory used for frame `seq`.
    #[must_use]
    pub fn frame_dir(&self, seq: u64) -> PathBuf {
        self.root.join(format!("frame-{seq:06}"))
    }

    /// Writes the frame's files.
    ///
    /// # Errors
    /// Returns an error if any file cannot be written.
    pub fn write(&self, report: &SceneReport) -> Result<PathBuf> {
        let dir = self.frame_dir(report.header.seq);
        std::fs::create_dir_all(&dir)?;

        match &report.surface {
            Some(surface) => {
                write_pcd(dir.join("surface.pcd"), &surface.points, self.format)?;
                write_pcd(dir.join("remainder.pcd"), &report.remainder, self.format)?;
            }
            None if !report.filtered.is_empty() => {
                write_pcd(dir.join("filtered.pcd"), &report.filtered, self.format)?;
            }
            None => {}
        }
        for object in &report.objects {
            write_pcd(
                dir.join(format!("object-{}.pcd", object.index)),
                &object.cluster.points,
                self.format,
            )?;
        }

        let summary = FrameSummary::from_report(report);
        let mut writer = BufWriter::new(File::create(dir.join("summary.json"))?);
        serde_json::to_writer_pretty(&mut writer, &summary)?;
        writer.flush()?;
        Ok(dir)
    }
}

impl SceneSink for DirectorySink {
    fn present(&mut self, report: &SceneReport) -> scenegrasp_core::Result<()> {
        let dir = self
            .write(report)
            .map_err(|e| scenegrasp_core::Error::Sink(e.to_string()))?;
        log::debug!("frame {} written to {}", report.header.seq, dir.display());
        Ok(())
    }
}
