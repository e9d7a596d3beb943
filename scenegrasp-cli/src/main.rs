//! scenegrasp command-line interface.
//!
//! Decomposes recorded point clouds into a support surface and objects and
//! computes a grasp pair for every object, either file by file or as a live
//! replay through the latest-wins pipeline.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Args, Parser, Subcommand, ValueEnum};

use scenegrasp_algorithms::{algorithm_for, segment_scene, PlaneSegmenter, RegionOfInterestFilter};
use scenegrasp_core::{Axis, ClusteringMethod, FrameHeader, SceneSink, ScenegraspConfig};
use scenegrasp_io::{
    describe_fields, DataFormat, DirectorySink, DirectorySource, LogSink, PcdReader,
};
use scenegrasp_pipeline::{
    CancelToken, FrameProcessor, LivePipeline, PrincipalAxisPlanner, RunOptions, StopHandle,
};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    ScenegraspIo(#[from] scenegrasp_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] scenegrasp_core::Error),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] scenegrasp_pipeline::Error),

    #[error("Invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Connected-component method selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Method {
    /// Breadth-first region growing
    Euclidean,
    /// Union-find with parallel neighbor queries
    Graph,
}

impl From<Method> for ClusteringMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Euclidean => ClusteringMethod::Euclidean,
            Method::Graph => ClusteringMethod::Graph,
        }
    }
}

/// Axis selection for the region of interest.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum AxisArg {
    X,
    Y,
    Z,
}

impl From<AxisArg> for Axis {
    fn from(axis: AxisArg) -> Self {
        match axis {
            AxisArg::X => Axis::X,
            AxisArg::Y => Axis::Y,
            AxisArg::Z => Axis::Z,
        }
    }
}

/// Stage parameters shared by every processing command.
///
/// Values given on the command line override the configuration file.
#[derive(Args, Debug, Default)]
struct StageArgs {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Region-of-interest axis
    #[arg(long, value_enum)]
    roi_axis: Option<AxisArg>,

    /// Region-of-interest lower limit (meters)
    #[arg(long)]
    roi_min: Option<f32>,

    /// Region-of-interest upper limit (meters)
    #[arg(long)]
    roi_max: Option<f32>,

    /// Plane inlier distance threshold (meters)
    #[arg(long)]
    distance_threshold: Option<f32>,

    /// RANSAC iteration budget
    #[arg(long)]
    max_iterations: Option<usize>,

    /// RANSAC random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Cluster tolerance (meters)
    #[arg(long)]
    tolerance: Option<f32>,

    /// Minimum object size (points)
    #[arg(long)]
    min_cluster_size: Option<usize>,

    /// Maximum object size (points)
    #[arg(long)]
    max_cluster_size: Option<usize>,

    /// Connected-component method
    #[arg(long, value_enum)]
    method: Option<Method>,
}

impl StageArgs {
    /// Loads the configuration file, if any, and applies the overrides.
    fn resolve(&self, topic: &str) -> Result<ScenegraspConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let reader = BufReader::new(File::open(path)?);
                let config: ScenegraspConfig = serde_json::from_reader(reader)?;
                log::debug!("loaded configuration from {}", path.display());
                config
            }
            None => ScenegraspConfig::default(),
        };
        if !topic.is_empty() {
            config.topic = topic.to_string();
        }

        if let Some(axis) = self.roi_axis {
            config.roi.axis = axis.into();
        }
        if let Some(min) = self.roi_min {
            config.roi.min = min;
        }
        if let Some(max) = self.roi_max {
            config.roi.max = max;
        }
        if let Some(threshold) = self.distance_threshold {
            config.segmentation.distance_threshold = threshold;
        }
        if let Some(iterations) = self.max_iterations {
            config.segmentation.max_iterations = iterations;
        }
        if let Some(seed) = self.seed {
            config.segmentation.seed = seed;
        }
        if let Some(tolerance) = self.tolerance {
            config.clustering.tolerance = tolerance;
        }
        if let Some(size) = self.min_cluster_size {
            config.clustering.min_cluster_size = size;
        }
        if let Some(size) = self.max_cluster_size {
            config.clustering.max_cluster_size = Some(size);
        }
        if let Some(method) = self.method {
            config.clustering.method = method.into();
        }

        config.validate()?;
        Ok(config)
    }
}

/// Tabletop scene decomposition and grasp planning for point clouds.
#[derive(Parser)]
#[command(name = "scenegrasp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (debug logging unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose PCD files and compute grasps for every object
    Process {
        /// Input PCD file(s)
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Directory for per-frame point clouds and summaries
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write ASCII instead of binary PCD files
        #[arg(long)]
        ascii: bool,

        #[command(flatten)]
        stages: StageArgs,
    },

    /// Show information about a PCD file
    Info {
        /// Input PCD file
        input: PathBuf,

        /// Also run the scene decomposition with default parameters
        #[arg(long)]
        decompose: bool,
    },

    /// Replay a PCD file or directory through the live pipeline
    Run {
        /// PCD file or directory of PCD files
        topic: String,

        /// Process a single frame, then exit
        #[arg(long)]
        once: bool,

        /// Start over after the last file; Ctrl-C ends the run
        #[arg(long)]
        repeat: bool,

        /// Stop after this many frames
        #[arg(long)]
        max_frames: Option<u64>,

        /// Frames per second pulled from the source
        #[arg(long)]
        rate: Option<f64>,

        /// Directory for per-frame point clouds and summaries
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Cancel the frame in progress when a newer one arrives
        #[arg(long)]
        cancel_superseded: bool,

        #[command(flatten)]
        stages: StageArgs,
    },

    /// Benchmark the clustering methods on the objects of a PCD file
    Benchmark {
        /// Input PCD file
        input: PathBuf,

        /// Number of iterations
        #[arg(short, long, default_value = "3")]
        iterations: usize,

        #[command(flatten)]
        stages: StageArgs,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

/// Ends a live run after the frame in progress when the process is interrupted.
fn stop_on_interrupt(stop: StopHandle) {
    if let Err(e) = ctrlc::set_handler(move || stop.stop()) {
        log::warn!("cannot install interrupt handler, stop with SIGKILL: {e}");
    }
}

fn frame_id(path: &Path) -> String {
    path.file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Process {
            input,
            output,
            ascii,
            stages,
        } => {
            let config = stages.resolve("")?;
            let processor = FrameProcessor::new(&config, PrincipalAxisPlanner::new())?;
            let recorder = match &output {
                Some(dir) => {
                    let format = if ascii {
                        DataFormat::Ascii
                    } else {
                        DataFormat::Binary
                    };
                    Some(DirectorySink::create(dir)?.with_format(format))
                }
                None => None,
            };
            let mut log_sink = LogSink::new();

            let start = Instant::now();
            let mut total_objects = 0usize;
            let mut total_grasps = 0usize;

            for (seq, path) in (0u64..).zip(&input) {
                log::debug!("reading {}", path.display());
                let reader = PcdReader::open(path)?;
                let frame = reader.read_frame(FrameHeader::new(seq, frame_id(path)))?;
                let report = processor.process(&frame, &CancelToken::new());

                log_sink.present(&report)?;
                if let Some(recorder) = &recorder {
                    let dir = recorder.write(&report)?;
                    log::debug!("wrote {}", dir.display());
                }
                total_objects += report.objects.len();
                total_grasps += report.grasp_count();
            }

            println!(
                "Processed {} files in {:.2}s",
                input.len(),
                start.elapsed().as_secs_f64()
            );
            println!("Total objects: {}", total_objects);
            println!("Total grasps: {}", total_grasps);
            if let Some(dir) = output {
                println!("Output: {}", dir.display());
            }
        }

        Commands::Info { input, decompose } => {
            let reader = PcdReader::open(&input)?;
            let header = reader.header();

            println!("File: {}", input.display());
            println!("Version: {}", header.version);
            println!("Fields: {}", describe_fields(header));
            println!("Size: {} x {} ({} points)", header.width, header.height, header.points);
            println!("Data: {}", header.format);
            println!("Point step: {} bytes", header.point_step);

            let frame = reader.read_frame(FrameHeader::new(0, frame_id(&input)))?;
            let cloud = scenegrasp_io::ingest_frame(&frame).map_err(scenegrasp_io::Error::from)?;
            println!(
                "Valid points: {} ({} invalid)",
                cloud.stats.kept, cloud.stats.invalid
            );

            if let Some((min, max)) = bounds(&cloud.points) {
                println!("X range: {:.3} - {:.3}", min[0], max[0]);
                println!("Y range: {:.3} - {:.3}", min[1], max[1]);
                println!("Z range: {:.3} - {:.3}", min[2], max[2]);
            }

            if decompose {
                let config = ScenegraspConfig::default();
                let start = Instant::now();
                let scene = segment_scene(
                    &cloud.points,
                    &config.roi,
                    &config.segmentation,
                    &config.clustering,
                )?;
                println!("Filtered: {}", scene.filtered.len());
                match &scene.surface {
                    Some(surface) => {
                        let [a, b, c, d] = surface.plane().coefficients();
                        println!(
                            "Surface: {} points, plane {:.4}x + {:.4}y + {:.4}z + {:.4} = 0",
                            surface.len(),
                            a,
                            b,
                            c,
                            d
                        );
                    }
                    None => println!("Surface: none"),
                }
                println!("Remainder: {}", scene.remainder.len());
                for (i, cluster) in scene.clustering.clusters.iter().enumerate() {
                    match cluster.centroid() {
                        Some(c) => println!(
                            "Object {}: {} points, centroid ({:.3}, {:.3}, {:.3})",
                            i,
                            cluster.len(),
                            c.x,
                            c.y,
                            c.z
                        ),
                        None => println!("Object {}: empty", i),
                    }
                }
                println!("Decomposed in {:.2?}", start.elapsed());
            }
        }

        Commands::Run {
            topic,
            once,
            repeat,
            max_frames,
            rate,
            output,
            cancel_superseded,
            stages,
        } => {
            let mut config = stages.resolve(&topic)?;
            if cancel_superseded {
                config.pipeline.cancel_superseded = true;
            }

            let mut options = if once {
                RunOptions::once()
            } else {
                RunOptions::default()
            };
            if let Some(max) = max_frames {
                options = options.with_max_frames(max);
            }
            if let Some(rate) = rate {
                if !(rate.is_finite() && rate > 0.0) {
                    return Err(CliError::InvalidArgument(format!(
                        "rate must be positive, got {rate}"
                    )));
                }
                options = options.with_frame_interval(Duration::from_secs_f64(1.0 / rate));
            }

            let mut source = DirectorySource::open(config.topic.clone())?.with_repeat(repeat && !once);
            let sink: Box<dyn SceneSink> = match output {
                Some(dir) => Box::new(DirectorySink::create(dir)?),
                None => Box::new(LogSink::new()),
            };

            let pipeline =
                LivePipeline::new(&config, PrincipalAxisPlanner::new())?.with_options(options);
            stop_on_interrupt(pipeline.stop_handle());
            let summary = pipeline.run(&mut source, sink)?;

            println!("Frames received: {}", summary.frames_received);
            println!("Frames processed: {}", summary.frames_processed);
            println!("Frames superseded: {}", summary.frames_superseded);
            println!("Frames cancelled: {}", summary.frames_cancelled);
            println!(
                "Reports presented: {} ({} failed, {} dropped)",
                summary.sink.presented, summary.sink.failed, summary.sink.dropped
            );
            if summary.source_errors > 0 {
                println!("Source errors: {}", summary.source_errors);
            }
        }

        Commands::Benchmark {
            input,
            iterations,
            stages,
        } => {
            let config = stages.resolve("")?;
            let points = scenegrasp_io::read_pcd(&input)?;
            let filtered = RegionOfInterestFilter::new(config.roi.clone()).filter(&points);
            let segmentation = PlaneSegmenter::new(config.segmentation.clone()).segment(&filtered);
            let remainder = &segmentation.remainder;

            println!(
                "Benchmarking with {} object candidate points, {} iterations",
                remainder.len(),
                iterations
            );
            println!(
                "{:<10} | {:<15} | {:<15} | {:<15} | {:<8}",
                "Method", "Mean Time (ms)", "Min Time (ms)", "Max Time (ms)", "Clusters"
            );
            println!("{:-<76}", "");

            for method in [ClusteringMethod::Euclidean, ClusteringMethod::Graph] {
                let algorithm = algorithm_for(method);
                let mut times = Vec::with_capacity(iterations);
                let mut clusters = algorithm.cluster(remainder, &config.clustering)?.clusters.len();

                for _ in 0..iterations {
                    let start = Instant::now();
                    clusters = algorithm.cluster(remainder, &config.clustering)?.clusters.len();
                    times.push(start.elapsed().as_secs_f64() * 1000.0);
                }

                let min_time = times.iter().fold(f64::INFINITY, |a, &b| a.min(b));
                let max_time = times.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
                let mean_time = times.iter().sum::<f64>() / times.len().max(1) as f64;

                println!(
                    "{:<10} | {:<15.2} | {:<15.2} | {:<15.2} | {:<8}",
                    method, mean_time, min_time, max_time, clusters
                );
            }
        }
    }

    Ok(())
}

/// Axis-aligned bounds of a non-empty point set.
fn bounds(points: &scenegrasp_core::PointSet) -> Option<([f32; 3], [f32; 3])> {
    let first = points.iter().next()?.to_array();
    Some(points.iter().fold((first, first), |(mut min, mut max), p| {
        for (axis, value) in p.to_array().into_iter().enumerate() {
            min[axis] = min[axis].min(value);
            max[axis] = max[axis].max(value);
        }
        (min, max)
    }))
}
