//! Region-of-interest (pass-through) filtering.

use scenegrasp_core::{PointSet, RoiConfig};

/// Keeps the points whose coordinate on one axis lies in a closed interval.
#[derive(Debug, Clone, Default)]
pub struct RegionOfInterestFilter {
    config: RoiConfig,
}

impl RegionOfInterestFilter {
    #[must_use]
    pub fn new(config: RoiConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &RoiConfig {
        &self.config
    }

    /// Returns the filtered copy of `points`.
    ///
    /// An empty result is valid. Point order is preserved.
    #[must_use]
    pub fn filter(&self, points: &PointSet) -> PointSet {
        let RoiConfig {
            axis,
            min,
            max,
            negative,
        } = self.config;
        points
            .iter()
            .filter(|p| {
                let v = p.coord(axis);
                (v >= min && v <= max) != negative
            })
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenegrasp_core::{Axis, Point};

    fn depths(values: &[f32]) -> PointSet {
        values.iter().map(|&z| Point::new(0.0, 0.0, z)).collect()
    }

    #[test]
    fn test_limits_are_inclusive() {
        let filter = RegionOfInterestFilter::new(RoiConfig::default());
        let out = filter.filter(&depths(&[-0.1, 0.0, 0.7, 1.5, 1.6]));
        let kept: Vec<f32> = out.iter().map(|p| p.z).collect();
        assert_eq!(kept, vec![0.0, 0.7, 1.5]);
    }

    #[test]
    fn test_negative_keeps_complement() {
        let filter = RegionOfInterestFilter::new(RoiConfig::default().with_negative(true));
        let out = filter.filter(&depths(&[-0.1, 0.7, 1.6]));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_other_axis() {
        let filter =
            RegionOfInterestFilter::new(RoiConfig::new().with_axis(Axis::X).with_limits(-1.0, 1.0));
        let points: PointSet = vec![Point::new(-2.0, 0.0, 0.5), Point::new(0.5, 0.0, 9.0)].into();
        let out = filter.filter(&points);
        assert_eq!(out.len(), 1);
        assert!((out[0].z - 9.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_input() {
        let filter = RegionOfInterestFilter::default();
        assert!(filter.filter(&PointSet::new()).is_empty());
    }
}
