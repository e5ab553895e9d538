//! Spatial indexing for neighbor queries over cloud points.
//!
//! Uses an R-tree to answer:
//! - k nearest neighbors of a point
//! - all points within a radius

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::core::types::{Point3D, PointCloud3D};

/// A cloud point position tagged with its index in the source cloud.
#[derive(Clone, Copy, Debug)]
pub struct IndexedPoint {
    /// Position as an array (R-tree point type).
    pub position: [f32; 3],
    /// Index of this point in the source cloud.
    pub index: usize,
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

/// R-tree over the positions of one cloud.
pub struct PointIndex {
    tree: RTree<IndexedPoint>,
}

impl PointIndex {
    /// Bulk-load an index from a cloud.
    ///
    /// Non-finite points are left out of the tree and never returned.
    pub fn new(cloud: &PointCloud3D) -> Self {
        let indexed: Vec<IndexedPoint> = cloud
            .points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.position.is_finite())
            .map(|(index, p)| IndexedPoint {
                position: p.position.to_array(),
                index,
            })
            .collect();

        Self {
            tree: RTree::bulk_load(indexed),
        }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// The `k` nearest points to `query` as (index, distance), closest first.
    ///
    /// The query point itself is included when it is part of the cloud.
    pub fn k_nearest(&self, query: Point3D, k: usize) -> Vec<(usize, f32)> {
        if !query.is_finite() {
            return Vec::new();
        }
        let q = query.to_array();
        self.tree
            .nearest_neighbor_iter(&q)
            .take(k)
            .map(|p| (p.index, p.distance_2(&q).sqrt()))
            .collect()
    }

    /// Indices of all points within `radius` of `query` (inclusive), unordered.
    pub fn within_radius(&self, query: Point3D, radius: f32) -> Vec<usize> {
        if !query.is_finite() || !radius.is_finite() {
            return Vec::new();
        }
        self.tree
            .locate_within_distance(query.to_array(), radius * radius)
            .map(|p| p.index)
            .collect()
    }
}
