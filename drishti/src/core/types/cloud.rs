//! Named, timestamped 3D point clouds.

use super::point::{CloudPoint, Point3D, Rgb};
use serde::{Deserialize, Serialize};

/// A named, timestamped collection of colored points.
///
/// Filters never mutate a cloud in place: every stage takes a cloud by
/// reference and returns a new one. Point order carries no meaning.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointCloud3D {
    /// Stage or topic name (used for logging and diagnostic dumps)
    pub name: String,
    /// Capture timestamp in microseconds
    pub timestamp_us: u64,
    /// Points in arbitrary order
    pub points: Vec<CloudPoint>,
}

impl PointCloud3D {
    /// Create an empty cloud.
    pub fn new(name: impl Into<String>, timestamp_us: u64) -> Self {
        Self {
            name: name.into(),
            timestamp_us,
            points: Vec::new(),
        }
    }

    /// Create an empty cloud with pre-allocated capacity.
    pub fn with_capacity(name: impl Into<String>, timestamp_us: u64, capacity: usize) -> Self {
        Self {
            name: name.into(),
            timestamp_us,
            points: Vec::with_capacity(capacity),
        }
    }

    /// Create from a vector of points.
    pub fn from_points(name: impl Into<String>, timestamp_us: u64, points: Vec<CloudPoint>) -> Self {
        Self {
            name: name.into(),
            timestamp_us,
            points,
        }
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a point.
    #[inline]
    pub fn push(&mut self, point: CloudPoint) {
        self.points.push(point);
    }

    /// Same points under a different name, keeping the timestamp.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamp_us: self.timestamp_us,
            points: self.points.clone(),
        }
    }

    /// New cloud holding only the listed indices, in the order given.
    ///
    /// Out-of-range indices are skipped.
    pub fn extract(&self, indices: &[usize], name: impl Into<String>) -> Self {
        let points = indices
            .iter()
            .filter_map(|&i| self.points.get(i).copied())
            .collect();
        Self::from_points(name, self.timestamp_us, points)
    }

    /// New cloud holding every point *not* listed in `indices`.
    pub fn extract_inverse(&self, indices: &[usize], name: impl Into<String>) -> Self {
        let mut keep = vec![true; self.points.len()];
        for &i in indices {
            if let Some(k) = keep.get_mut(i) {
                *k = false;
            }
        }
        let points = self
            .points
            .iter()
            .zip(keep)
            .filter_map(|(p, k)| k.then_some(*p))
            .collect();
        Self::from_points(name, self.timestamp_us, points)
    }

    /// Append all points of another cloud.
    pub fn append(&mut self, other: &PointCloud3D) {
        self.points.extend_from_slice(&other.points);
    }

    /// Iterate over positions.
    pub fn positions(&self) -> impl Iterator<Item = Point3D> + '_ {
        self.points.iter().map(|p| p.position)
    }

    /// Iterate over colors.
    pub fn colors(&self) -> impl Iterator<Item = Rgb> + '_ {
        self.points.iter().map(|p| p.color)
    }

    /// Mean position of all points, `None` for an empty cloud.
    ///
    /// Accumulates in f64 so large clouds keep their precision.
    pub fn centroid(&self) -> Option<Point3D> {
        if self.points.is_empty() {
            return None;
        }
        let (mut sx, mut sy, mut sz) = (0.0f64, 0.0f64, 0.0f64);
        for p in &self.points {
            sx += p.position.x as f64;
            sy += p.position.y as f64;
            sz += p.position.z as f64;
        }
        let n = self.points.len() as f64;
        Some(Point3D::new(
            (sx / n) as f32,
            (sy / n) as f32,
            (sz / n) as f32,
        ))
    }

    /// Axis-aligned bounds as (min, max).
    pub fn bounds(&self) -> Option<(Point3D, Point3D)> {
        let first = self.points.first()?.position;
        let mut min = first;
        let mut max = first;
        for p in self.positions() {
            min = Point3D::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Point3D::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cloud_of(coords: &[(f32, f32, f32)]) -> PointCloud3D {
        let points = coords
            .iter()
            .map(|&(x, y, z)| CloudPoint::xyz_rgb(x, y, z, Rgb::WHITE))
            .collect();
        PointCloud3D::from_points("test", 42, points)
    }

    #[test]
    fn test_centroid() {
        let cloud = cloud_of(&[(0.0, 0.0, 0.0), (2.0, 0.0, 1.0), (1.0, 3.0, 2.0)]);
        let c = cloud.centroid().unwrap();
        assert_relative_eq!(c.x, 1.0);
        assert_relative_eq!(c.y, 1.0);
        assert_relative_eq!(c.z, 1.0);
        assert!(PointCloud3D::default().centroid().is_none());
    }

    #[test]
    fn test_extract_and_inverse_partition() {
        let cloud = cloud_of(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (2.0, 0.0, 0.0), (3.0, 0.0, 0.0)]);
        let inliers = cloud.extract(&[1, 3], "in");
        let outliers = cloud.extract_inverse(&[1, 3], "out");

        assert_eq!(inliers.len(), 2);
        assert_eq!(outliers.len(), 2);
        assert_eq!(inliers.points[0].position.x, 1.0);
        assert_eq!(outliers.points[1].position.x, 2.0);
        assert_eq!(outliers.timestamp_us, 42);
        assert_eq!(outliers.name, "out");
    }

    #[test]
    fn test_extract_skips_out_of_range() {
        let cloud = cloud_of(&[(0.0, 0.0, 0.0)]);
        assert_eq!(cloud.extract(&[0, 7], "x").len(), 1);
        assert_eq!(cloud.extract_inverse(&[7], "x").len(), 1);
    }

    #[test]
    fn test_bounds() {
        let cloud = cloud_of(&[(0.0, -1.0, 2.0), (1.0, 1.0, -2.0)]);
        let (min, max) = cloud.bounds().unwrap();
        assert_eq!(min, Point3D::new(0.0, -1.0, -2.0));
        assert_eq!(max, Point3D::new(1.0, 1.0, 2.0));
    }
}
