//! Labeled object instances.

use super::cloud::PointCloud3D;
use super::point::Point3D;

/// A classified cluster.
///
/// The centroid is computed once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedObject {
    /// Class label
    pub label: String,
    /// Cluster points
    pub cloud: PointCloud3D,
    centroid: Point3D,
}

impl DetectedObject {
    /// Create from a non-empty cluster cloud, `None` if the cloud is empty.
    pub fn new(label: impl Into<String>, cloud: PointCloud3D) -> Option<Self> {
        let centroid = cloud.centroid()?;
        Some(Self {
            label: label.into(),
            cloud,
            centroid,
        })
    }

    /// Mean position of the cluster points.
    #[inline]
    pub fn centroid(&self) -> Point3D {
        self.centroid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CloudPoint, Rgb};

    #[test]
    fn test_centroid_cached() {
        let cloud = PointCloud3D::from_points(
            "soap",
            0,
            vec![
                CloudPoint::xyz_rgb(0.0, 0.0, 1.0, Rgb::WHITE),
                CloudPoint::xyz_rgb(1.0, 0.0, 1.0, Rgb::WHITE),
            ],
        );
        let obj = DetectedObject::new("soap", cloud).unwrap();
        assert_eq!(obj.centroid(), Point3D::new(0.5, 0.0, 1.0));
        assert!(DetectedObject::new("none", PointCloud3D::default()).is_none());
    }
}
