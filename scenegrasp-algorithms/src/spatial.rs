//! Spatial indexing for efficient neighbor lookup.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use scenegrasp_core::{Point, PointSet};

/// A point position tagged with its index in the indexed set.
#[derive(Debug, Clone, Copy, PartialEq)]
struct IndexedPoint {
    index: usize,
    position: [f32; 3],
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f32; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f32; 3]) -> f32 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        let dz = self.position[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// R-tree over the points of one set for radius queries.
///
/// The tree is bulk loaded, so it is balanced and queries are logarithmic in
/// the number of points plus the size of the result.
#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
}

impl SpatialIndex {
    /// Builds the index over every point of `points`.
    #[must_use]
    pub fn new(points: &PointSet) -> Self {
        let items = points
            .iter()
            .enumerate()
            .map(|(index, p)| IndexedPoint {
                index,
                position: p.to_array(),
            })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Collects the indices of all points within `radius` of `center`
    /// (inclusive) into `out`, replacing its contents.
    ///
    /// The query point itself is included when it is part of the index.
    pub fn within_radius_into(&self, center: &Point, radius: f32, out: &mut Vec<usize>) {
        out.clear();
        out.extend(
            self.tree
                .locate_within_distance(center.to_array(), radius * radius)
                .map(|item| item.index),
        );
    }

    /// Returns the indices of all points within `radius` of `center`.
    #[must_use]
    pub fn within_radius(&self, center: &Point, radius: f32) -> Vec<usize> {
        let mut out = Vec::new();
        self.within_radius_into(center, radius, &mut out);
        out
    }
}
