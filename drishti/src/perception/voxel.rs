//! Voxel grid downsampling.
//!
//! Replaces all points inside each occupied cubic cell by a single point.

use std::collections::BTreeMap;

use crate::core::types::{CloudPoint, Point3D, PointCloud3D, Rgb};

/// Configuration for voxel downsampling.
#[derive(Debug, Clone, Copy)]
pub struct VoxelGridConfig {
    /// Edge length of a cubic cell in meters.
    ///
    /// Default: 0.01m
    pub leaf_size: f32,
}

impl Default for VoxelGridConfig {
    fn default() -> Self {
        Self { leaf_size: 0.01 }
    }
}

impl VoxelGridConfig {
    pub fn with_leaf_size(mut self, leaf_size: f32) -> Self {
        self.leaf_size = leaf_size;
        self
    }
}

/// Running sums for one occupied cell.
#[derive(Default)]
struct CellAccumulator {
    sum: [f64; 3],
    color: [u32; 3],
    min: [f32; 3],
    max: [f32; 3],
    count: u32,
}

impl CellAccumulator {
    fn add(&mut self, p: &CloudPoint) {
        let xyz = p.position.to_array();
        if self.count == 0 {
            self.min = xyz;
            self.max = xyz;
        }
        for axis in 0..3 {
            self.sum[axis] += xyz[axis] as f64;
            self.min[axis] = self.min[axis].min(xyz[axis]);
            self.max[axis] = self.max[axis].max(xyz[axis]);
        }
        self.color[0] += p.color.r as u32;
        self.color[1] += p.color.g as u32;
        self.color[2] += p.color.b as u32;
        self.count += 1;
    }

    /// Centroid and mean color of the cell.
    ///
    /// The centroid is clamped into the per-axis extent of its members so
    /// rounding can never move it into a neighboring cell.
    fn finish(&self) -> CloudPoint {
        let n = self.count as f64;
        let mut c = [0.0f32; 3];
        for axis in 0..3 {
            c[axis] = ((self.sum[axis] / n) as f32).clamp(self.min[axis], self.max[axis]);
        }
        let n = self.count;
        let color = Rgb::new(
            ((self.color[0] + n / 2) / n) as u8,
            ((self.color[1] + n / 2) / n) as u8,
            ((self.color[2] + n / 2) / n) as u8,
        );
        CloudPoint::new(Point3D::new(c[0], c[1], c[2]), color)
    }
}

/// Voxel grid downsampler.
///
/// Cell index is `floor(coord / leaf_size)` per axis. Each occupied cell
/// yields its centroid with the mean color. Output is ordered by cell index,
/// so the result does not depend on input order, and applying the filter
/// twice with the same leaf size returns the first result unchanged.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    config: VoxelGridConfig,
}

impl VoxelGrid {
    /// Create a new voxel grid with the given configuration.
    pub fn new(config: VoxelGridConfig) -> Self {
        Self { config }
    }

    /// Leaf size in meters.
    pub fn leaf_size(&self) -> f32 {
        self.config.leaf_size
    }

    #[inline]
    fn cell_of(&self, p: Point3D) -> (i64, i64, i64) {
        let leaf = self.config.leaf_size;
        (
            (p.x / leaf).floor() as i64,
            (p.y / leaf).floor() as i64,
            (p.z / leaf).floor() as i64,
        )
    }

    /// Apply downsampling, returning a new cloud.
    pub fn apply(&self, cloud: &PointCloud3D) -> PointCloud3D {
        let leaf = self.config.leaf_size;
        if cloud.is_empty() || leaf.is_nan() || leaf <= 0.0 {
            return cloud.clone();
        }

        let mut cells: BTreeMap<(i64, i64, i64), CellAccumulator> = BTreeMap::new();
        for p in cloud.points.iter().filter(|p| p.position.is_finite()) {
            cells.entry(self.cell_of(p.position)).or_default().add(p);
        }

        let points = cells.values().map(CellAccumulator::finish).collect();
        let downsampled = PointCloud3D::from_points(cloud.name.clone(), cloud.timestamp_us, points);
        log::debug!(
            "Voxel grid ({:.3}m): {} -> {} points",
            self.config.leaf_size,
            cloud.len(),
            downsampled.len()
        );
        downsampled
    }
}

impl Default for VoxelGrid {
    fn default() -> Self {
        Self::new(VoxelGridConfig::default())
    }
}
