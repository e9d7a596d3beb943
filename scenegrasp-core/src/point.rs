//! Point and point set types.

use nalgebra::Vector3;
use std::ops::Index;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Coordinate axis selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Axis {
    X,
    Y,
    /// Depth axis of an optical sensor frame.
    #[default]
    Z,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// 8-bit RGB color sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Creates a new color.
    #[inline]
    #[must_use]
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Unpacks a `0x00RRGGBB` word as used by PCL and ROS point clouds.
    #[inline]
    #[must_use]
    pub fn from_packed(packed: u32) -> Self {
        Self {
            r: ((packed >> 16) & 0xFF) as u8,
            g: ((packed >> 8) & 0xFF) as u8,
            b: (packed & 0xFF) as u8,
        }
    }

    /// Packs the color into a `0x00RRGGBB` word.
    #[inline]
    #[must_use]
    pub fn packed(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

/// A single sensor sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Color channel, when the sensor provides one.
    pub color: Option<Rgb>,
}

impl Point {
    /// Creates an uncolored point.
    #[inline]
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            color: None,
        }
    }

    /// Creates a colored point.
    #[inline]
    #[must_use]
    pub fn with_color(x: f32, y: f32, z: f32, color: Rgb) -> Self {
        Self {
            x,
            y,
            z,
            color: Some(color),
        }
    }

    /// Returns true if every coordinate is finite.
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Returns the coordinate on the given axis.
    #[inline]
    #[must_use]
    pub fn coord(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    #[inline]
    #[must_use]
    pub fn to_vector(&self) -> Vector3<f32> {
        Vector3::new(self.x, self.y, self.z)
    }

    #[inline]
    #[must_use]
    pub fn to_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Squared Euclidean distance to another point.
    #[inline]
    #[must_use]
    pub fn distance_squared(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

/// Ordered, dense collection of points.
///
/// Every stage of the pipeline produces a new set; nothing is filtered in
/// place. The set itself does not enforce finiteness, but every set produced
/// by ingestion does, and every later stage only selects from its input.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointSet {
    points: Vec<Point>,
}

impl PointSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Creates an empty set with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Wraps an existing vector.
    #[must_use]
    pub fn from_vec(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Appends a point.
    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the points as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Point] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Point> {
        self.points
    }

    /// Returns true if every point has finite coordinates.
    #[must_use]
    pub fn is_dense(&self) -> bool {
        self.points.iter().all(Point::is_finite)
    }

    /// Copies the points at `indices`, in the order given.
    ///
    /// Out-of-range indices are skipped.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        indices
            .iter()
            .filter_map(|&i| self.points.get(i).copied())
            .collect()
    }

    /// Copies every point whose index is not in `indices`.
    ///
    /// `indices` must be sorted ascending.
    #[must_use]
    pub fn select_complement(&self, indices: &[usize]) -> Self {
        let mut excluded = indices.iter().peekable();
        let mut out = Self::with_capacity(self.len().saturating_sub(indices.len()));
        for (i, point) in self.points.iter().enumerate() {
            while excluded.next_if(|&&e| e < i).is_some() {}
            if excluded.next_if(|&&e| e == i).is_some() {
                continue;
            }
            out.push(*point);
        }
        out
    }

    /// Arithmetic mean of the coordinates, or `None` for an empty set.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn centroid(&self) -> Option<Vector3<f32>> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(Vector3::zeros(), |acc: Vector3<f32>, p| acc + p.to_vector());
        Some(sum / self.points.len() as f32)
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` for an empty set.
    #[must_use]
    pub fn bounds(&self) -> Option<(Vector3<f32>, Vector3<f32>)> {
        let first = self.points.first()?.to_vector();
        Some(self.points.iter().skip(1).fold((first, first), |(lo, hi), p| {
            let v = p.to_vector();
            (lo.inf(&v), hi.sup(&v))
        }))
    }
}

impl Index<usize> for PointSet {
    type Output = Point;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl FromIterator<Point> for PointSet {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PointSet {
    type Item = Point;
    type IntoIter = std::vec::IntoIter<Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl From<Vec<Point>> for PointSet {
    fn from(points: Vec<Point>) -> Self {
        Self { points }
    }
}
