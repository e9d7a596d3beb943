//! Planar support surface types.

use crate::point::{Point, PointSet};
use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Normals shorter than this are treated as degenerate.
const MIN_NORMAL_NORM: f32 = 1e-9;

/// Plane `a*x + b*y + c*z + d = 0` with a unit normal `(a, b, c)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Plane {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
}

impl Plane {
    /// Builds a plane from raw coefficients, normalizing the normal.
    ///
    /// Returns `None` if the normal has (near) zero length or any coefficient
    /// is not finite.
    #[must_use]
    pub fn from_coefficients(a: f32, b: f32, c: f32, d: f32) -> Option<Self> {
        let norm = (a * a + b * b + c * c).sqrt();
        if !norm.is_finite() || norm < MIN_NORMAL_NORM || !d.is_finite() {
            return None;
        }
        Some(Self {
            a: a / norm,
            b: b / norm,
            c: c / norm,
            d: d / norm,
        })
    }

    /// Builds the plane through a point with the given normal.
    #[must_use]
    pub fn from_point_normal(origin: &Vector3<f32>, normal: &Vector3<f32>) -> Option<Self> {
        let d = -normal.dot(origin);
        Self::from_coefficients(normal.x, normal.y, normal.z, d)
    }

    /// Plane through three points, or `None` when they are collinear.
    #[must_use]
    pub fn from_points(p1: &Point, p2: &Point, p3: &Point) -> Option<Self> {
        let o = p1.to_vector();
        let normal = (p2.to_vector() - o).cross(&(p3.to_vector() - o));
        Self::from_point_normal(&o, &normal)
    }

    #[inline]
    #[must_use]
    pub fn normal(&self) -> Vector3<f32> {
        Vector3::new(self.a, self.b, self.c)
    }

    #[inline]
    #[must_use]
    pub fn coefficients(&self) -> [f32; 4] {
        [self.a, self.b, self.c, self.d]
    }

    /// Signed distance from the plane; positive on the normal side.
    #[inline]
    #[must_use]
    pub fn signed_distance(&self, p: &Point) -> f32 {
        self.a * p.x + self.b * p.y + self.c * p.z + self.d
    }

    #[inline]
    #[must_use]
    pub fn distance(&self, p: &Point) -> f32 {
        self.signed_distance(p).abs()
    }

    /// Orthogonal projection of a point onto the plane.
    #[must_use]
    pub fn project(&self, p: &Point) -> Vector3<f32> {
        p.to_vector() - self.normal() * self.signed_distance(p)
    }
}

/// A fitted plane plus the indices of its inliers in the segmented input.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfaceModel {
    pub plane: Plane,
    /// Sorted ascending, no duplicates.
    pub inliers: Vec<usize>,
}

impl SurfaceModel {
    #[must_use]
    pub fn new(plane: Plane, inliers: Vec<usize>) -> Self {
        Self { plane, inliers }
    }

    #[must_use]
    pub fn inlier_count(&self) -> usize {
        self.inliers.len()
    }
}

/// The extracted support surface of a frame.
///
/// Handed to grasp planners alongside each object.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Surface {
    pub model: SurfaceModel,
    pub points: PointSet,
}

impl Surface {
    #[must_use]
    pub fn new(model: SurfaceModel, points: PointSet) -> Self {
        Self { model, points }
    }

    #[must_use]
    pub fn plane(&self) -> &Plane {
        &self.model.plane
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
