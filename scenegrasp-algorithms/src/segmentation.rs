//! RANSAC support-plane segmentation.
//!
//! Key characteristics:
//! - Minimal samples of three distinct points, drawn from a seeded generator
//! - Hypotheses scored by inlier count under a fixed distance threshold
//! - Fixed iteration budget; the only early exit is a plane that already
//!   explains every point, so a larger budget never yields fewer inliers
//! - Optional least-squares refit of the winning plane's coefficients
#![allow(clippy::cast_precision_loss)]

use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use rayon::prelude::*;
use scenegrasp_core::{Plane, PointSet, SegmentationConfig, Surface, SurfaceModel};

/// Inputs at least this large are scored in parallel.
const PARALLEL_SCORING_THRESHOLD: usize = 16_384;

/// Output of plane segmentation: the model and both partitions of the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segmentation {
    /// `None` when no surface was found.
    pub model: Option<SurfaceModel>,
    /// Inlier points, in input order.
    pub surface: PointSet,
    /// Every other point, in input order.
    pub remainder: PointSet,
}

impl Segmentation {
    #[must_use]
    pub fn is_found(&self) -> bool {
        self.model.is_some()
    }

    #[must_use]
    pub fn inlier_count(&self) -> usize {
        self.model.as_ref().map_or(0, SurfaceModel::inlier_count)
    }

    /// Splits into the extracted surface (if any) and the remainder.
    #[must_use]
    pub fn into_parts(self) -> (Option<Surface>, PointSet) {
        let surface = self.model.map(|model| Surface::new(model, self.surface));
        (surface, self.remainder)
    }
}

/// Best hypothesis found by a RANSAC run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneHypothesis {
    pub plane: Plane,
    pub inliers: usize,
    /// Iteration (0-based) that produced the hypothesis.
    pub iteration: usize,
}

/// Consensus-based plane segmenter.
#[derive(Debug, Clone, Default)]
pub struct PlaneSegmenter {
    config: SegmentationConfig,
}

impl PlaneSegmenter {
    #[must_use]
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Runs the sampling loop and returns the best-scoring plane.
    ///
    /// Returns `None` for fewer than three points, or when every sample was
    /// degenerate.
    #[must_use]
    pub fn best_hypothesis(&self, points: &PointSet) -> Option<PlaneHypothesis> {
        let n = points.len();
        if n < 3 {
            return None;
        }

        let threshold = self.config.distance_threshold;
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut best: Option<PlaneHypothesis> = None;

        for iteration in 0..self.config.max_iterations {
            let sample = index::sample(&mut rng, n, 3);
            let Some(plane) = Plane::from_points(
                &points[sample.index(0)],
                &points[sample.index(1)],
                &points[sample.index(2)],
            ) else {
                continue;
            };

            let inliers = count_inliers(points, &plane, threshold);
            if best.is_none_or(|b| inliers > b.inliers) {
                best = Some(PlaneHypothesis {
                    plane,
                    inliers,
                    iteration,
                });
                if inliers == n {
                    break;
                }
            }
        }

        best.filter(|b| b.inliers > 0)
    }

    /// Fits the support plane and returns its model.
    #[must_use]
    pub fn fit(&self, points: &PointSet) -> Option<SurfaceModel> {
        let best = self.best_hypothesis(points)?;
        let inliers = inlier_indices(points, &best.plane, self.config.distance_threshold);

        let plane = if self.config.refine_coefficients {
            refine_plane(points, &inliers, &best.plane).unwrap_or(best.plane)
        } else {
            best.plane
        };

        log::trace!(
            "plane {:?} with {} inliers (iteration {})",
            plane.coefficients(),
            inliers.len(),
            best.iteration
        );
        Some(SurfaceModel::new(plane, inliers))
    }

    /// Fits the support plane and partitions `points` into surface and remainder.
    #[must_use]
    pub fn segment(&self, points: &PointSet) -> Segmentation {
        match self.fit(points) {
            Some(model) => {
                let surface = points.select(&model.inliers);
                let remainder = points.select_complement(&model.inliers);
                Segmentation {
                    model: Some(model),
                    surface,
                    remainder,
                }
            }
            None => Segmentation {
                model: None,
                surface: PointSet::new(),
                remainder: points.clone(),
            },
        }
    }
}

/// Number of points within `threshold` of `plane`.
#[must_use]
pub fn count_inliers(points: &PointSet, plane: &Plane, threshold: f32) -> usize {
    let slice = points.as_slice();
    if slice.len() >= PARALLEL_SCORING_THRESHOLD {
        slice
            .par_iter()
            .filter(|p| plane.distance(p) <= threshold)
            .count()
    } else {
        slice
            .iter()
            .filter(|p| plane.distance(p) <= threshold)
            .count()
    }
}

/// Sorted indices of the points within `threshold` of `plane`.
#[must_use]
pub fn inlier_indices(points: &PointSet, plane: &Plane, threshold: f32) -> Vec<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| plane.distance(p) <= threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Least-squares plane through the given points.
///
/// The normal is the eigenvector of the smallest eigenvalue of the inlier
/// covariance, oriented to agree with `reference`.
fn refine_plane(points: &PointSet, inliers: &[usize], reference: &Plane) -> Option<Plane> {
    if inliers.len() < 3 {
        return None;
    }

    let count = inliers.len() as f32;
    let centroid = inliers
        .iter()
        .fold(Vector3::zeros(), |acc: Vector3<f32>, &i| acc + points[i].to_vector())
        / count;

    let covariance = inliers.iter().fold(Matrix3::zeros(), |acc: Matrix3<f32>, &i| {
        let d = points[i].to_vector() - centroid;
        acc + d * d.transpose()
    }) / count;

    let eigen = SymmetricEigen::new(covariance);
    let smallest = eigen.eigenvalues.imin();
    let mut normal: Vector3<f32> = eigen.eigenvectors.column(smallest).into_owned();
    if normal.dot(&reference.normal()) < 0.0 {
        normal = -normal;
    }

    Plane::from_point_normal(&centroid, &normal)
}
