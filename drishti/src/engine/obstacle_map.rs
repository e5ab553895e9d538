//! Accumulated obstacle map.
//!
//! Table points from every frame are appended, so the side tables seen
//! during the turn stay in the map after the sensor looks away. Before a
//! pick, the still-unpicked objects are added to a published copy so the
//! planner avoids them too.

use crate::core::types::PointCloud3D;

/// Monotonically growing union of table clouds.
#[derive(Debug, Clone)]
pub struct ObstacleMap {
    accumulated: PointCloud3D,
}

impl ObstacleMap {
    pub fn new() -> Self {
        Self {
            accumulated: PointCloud3D::new("collision_map", 0),
        }
    }

    /// Append one frame's table points (duplicates kept) and return the
    /// cloud to publish.
    pub fn accumulate_table(&mut self, table: &PointCloud3D) -> &PointCloud3D {
        self.accumulated.append(table);
        self.accumulated.timestamp_us = self.accumulated.timestamp_us.max(table.timestamp_us);
        log::debug!(
            "Obstacle map: +{} table points, {} total",
            table.len(),
            self.accumulated.len()
        );
        &self.accumulated
    }

    /// Accumulated table points plus the given object clouds.
    ///
    /// The accumulator itself is left unchanged.
    pub fn with_remaining_objects<'a>(
        &self,
        objects: impl IntoIterator<Item = &'a PointCloud3D>,
    ) -> PointCloud3D {
        let mut map = self.accumulated.clone();
        for cloud in objects {
            map.append(cloud);
        }
        map
    }

    /// Drop all accumulated points.
    pub fn clear(&mut self) {
        self.accumulated.points.clear();
    }

    pub fn cloud(&self) -> &PointCloud3D {
        &self.accumulated
    }

    pub fn len(&self) -> usize {
        self.accumulated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accumulated.is_empty()
    }
}

impl Default for ObstacleMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CloudPoint, Rgb};

    fn slab(x: f32, n: usize, ts: u64) -> PointCloud3D {
        let points = (0..n)
            .map(|i| CloudPoint::xyz_rgb(x, i as f32 * 0.01, 0.65, Rgb::WHITE))
            .collect();
        PointCloud3D::from_points("table", ts, points)
    }

    #[test]
    fn test_union_of_tables() {
        let mut map = ObstacleMap::new();
        let tables = [slab(0.0, 10, 1), slab(1.0, 5, 2), slab(0.0, 10, 3)];
        for t in &tables {
            map.accumulate_table(t);
        }

        let expected: Vec<CloudPoint> = tables.iter().flat_map(|t| t.points.clone()).collect();
        assert_eq!(map.cloud().points, expected);
        assert_eq!(map.cloud().timestamp_us, 3);
    }

    #[test]
    fn test_clear_restarts() {
        let mut map = ObstacleMap::new();
        map.accumulate_table(&slab(0.0, 10, 1));
        map.clear();
        assert!(map.is_empty());

        let published = map.accumulate_table(&slab(2.0, 4, 2)).clone();
        assert_eq!(published.len(), 4);
        assert!(published.positions().all(|p| p.x == 2.0));
    }

    #[test]
    fn test_remaining_objects_not_accumulated() {
        let mut map = ObstacleMap::new();
        map.accumulate_table(&slab(0.0, 10, 1));
        let objects = [slab(0.5, 3, 1), slab(0.6, 2, 1)];

        let for_pick = map.with_remaining_objects(&objects);
        assert_eq!(for_pick.len(), 15);
        assert_eq!(map.len(), 10);
    }
}
