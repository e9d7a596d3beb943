//! Baseline grasp planner based on the object's footprint on the support plane.
#![allow(clippy::cast_precision_loss)]

use nalgebra::{Matrix2, SymmetricEigen, Vector2, Vector3};
use scenegrasp_core::{Cluster, GraspError, GraspPair, GraspPlanner, Surface};

/// Footprints whose major variance is below this are treated as a single spot.
const MIN_FOOTPRINT_VARIANCE: f32 = 1e-12;

/// Fraction of the object's width within which points count as lying on a side.
const CONTACT_BAND: f32 = 0.05;

/// Closes a parallel gripper across the narrow side of the object.
///
/// The object is projected onto the support plane and the principal axes of
/// that footprint are computed. The contacts are the object points at the two
/// extremes along the minor axis, each chosen nearest the middle of its side.
#[derive(Debug, Clone, Copy)]
pub struct PrincipalAxisPlanner {
    min_points: usize,
}

impl Default for PrincipalAxisPlanner {
    fn default() -> Self {
        Self { min_points: 3 }
    }
}

impl PrincipalAxisPlanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Objects with fewer points are declined. Values below 3 are raised to 3.
    #[must_use]
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points.max(3);
        self
    }
}

/// Orthonormal basis `(u, v)` of the plane with normal `n`.
fn plane_basis(n: &Vector3<f32>) -> (Vector3<f32>, Vector3<f32>) {
    let helper = if n.x.abs() <= n.y.abs() && n.x.abs() <= n.z.abs() {
        Vector3::x()
    } else if n.y.abs() <= n.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let u = helper.cross(n).normalize();
    let v = n.cross(&u);
    (u, v)
}

impl GraspPlanner for PrincipalAxisPlanner {
    fn name(&self) -> &'static str {
        "principal-axis"
    }

    fn compute_grasp(&self, surface: &Surface, object: &Cluster) -> Result<GraspPair, GraspError> {
        let points = object.points.as_slice();
        if points.len() < self.min_points {
            return Err(GraspError::DegenerateObject {
                points: points.len(),
            });
        }

        let (u, v) = plane_basis(&surface.plane().normal());
        let footprint: Vec<Vector2<f32>> = points
            .iter()
            .map(|p| {
                let q = p.to_vector();
                Vector2::new(q.dot(&u), q.dot(&v))
            })
            .collect();

        let count = footprint.len() as f32;
        let mean = footprint.iter().fold(Vector2::<f32>::zeros(), |acc, q| acc + q) / count;
        let covariance = footprint.iter().fold(Matrix2::<f32>::zeros(), |acc, q| {
            let d = q - mean;
            acc + d * d.transpose()
        }) / count;

        let eigen = SymmetricEigen::new(covariance);
        let major = eigen.eigenvalues.max();
        if !(major.is_finite() && major > MIN_FOOTPRINT_VARIANCE) {
            return Err(GraspError::DegenerateObject {
                points: points.len(),
            });
        }
        let minor_axis: Vector2<f32> = eigen.eigenvectors.column(eigen.eigenvalues.imin()).into_owned();
        let major_axis: Vector2<f32> = eigen.eigenvectors.column(eigen.eigenvalues.imax()).into_owned();

        // (across, along) coordinates of every point relative to the footprint center.
        let coords: Vec<(f32, f32)> = footprint
            .iter()
            .map(|q| {
                let d = q - mean;
                (d.dot(&minor_axis), d.dot(&major_axis))
            })
            .collect();
        let lo = coords.iter().map(|c| c.0).fold(f32::INFINITY, f32::min);
        let hi = coords.iter().map(|c| c.0).fold(f32::NEG_INFINITY, f32::max);
        let span = hi - lo;
        if span <= 0.0 || !span.is_finite() {
            return Err(GraspError::Declined("object has no extent across its minor axis".into()));
        }

        // Among the points on each side, take the one nearest the middle of that side.
        let band = span * CONTACT_BAND;
        let contact = |side: f32| {
            coords
                .iter()
                .enumerate()
                .filter(|(_, c)| (c.0 - side).abs() <= band)
                .min_by(|(_, a), (_, b)| a.1.abs().total_cmp(&b.1.abs()))
                .map(|(i, _)| i)
        };
        let (Some(first), Some(second)) = (contact(lo), contact(hi)) else {
            return Err(GraspError::Failed("no contact candidates".into()));
        };

        Ok(GraspPair::new(points[first], points[second]))
    }
}
