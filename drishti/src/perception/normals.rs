//! Surface normal estimation by local PCA.
//!
//! The normal of a point is the eigenvector of the smallest eigenvalue of
//! the covariance of its k nearest neighbors, flipped to face the sensor.

use nalgebra::{Matrix3, SymmetricEigen, Vector3};

use super::spatial_index::PointIndex;
use crate::core::types::{Normal3, Point3D, PointCloud3D};

/// Configuration for normal estimation.
#[derive(Debug, Clone, Copy)]
pub struct NormalEstimatorConfig {
    /// Neighborhood size, the point itself included.
    ///
    /// Default: 15
    pub k: usize,

    /// Viewpoint normals are oriented toward.
    ///
    /// Default: sensor origin
    pub viewpoint: Point3D,
}

impl Default for NormalEstimatorConfig {
    fn default() -> Self {
        Self {
            k: 15,
            viewpoint: Point3D::ZERO,
        }
    }
}

impl NormalEstimatorConfig {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }
}

/// In-process PCA normal estimator.
#[derive(Debug, Clone, Default)]
pub struct PcaNormalEstimator {
    config: NormalEstimatorConfig,
}

impl PcaNormalEstimator {
    pub fn new(config: NormalEstimatorConfig) -> Self {
        Self { config }
    }

    /// One unit normal per input point, in input order.
    ///
    /// Points with fewer than three neighbors get the +z normal.
    pub fn estimate(&self, cloud: &PointCloud3D) -> Vec<Normal3> {
        if cloud.is_empty() {
            return Vec::new();
        }

        let index = PointIndex::new(cloud);
        let k = self.config.k.max(3);
        cloud
            .positions()
            .map(|p| {
                let neighbors: Vec<Point3D> = index
                    .k_nearest(p, k)
                    .into_iter()
                    .map(|(i, _)| cloud.points[i].position)
                    .collect();
                let normal = local_normal(&neighbors).unwrap_or_else(Vector3::z);
                self.orient(normal, p)
            })
            .collect()
    }

    fn orient(&self, normal: Normal3, p: Point3D) -> Normal3 {
        let v = self.config.viewpoint;
        let to_view = Vector3::new(v.x - p.x, v.y - p.y, v.z - p.z);
        if normal.dot(&to_view) < 0.0 { -normal } else { normal }
    }
}

/// Smallest-eigenvalue eigenvector of the neighborhood covariance.
fn local_normal(neighbors: &[Point3D]) -> Option<Normal3> {
    if neighbors.len() < 3 {
        return None;
    }

    let n = neighbors.len() as f32;
    let mut centroid = Vector3::<f32>::zeros();
    for p in neighbors {
        centroid += Vector3::new(p.x, p.y, p.z);
    }
    centroid /= n;

    let mut cov = Matrix3::<f32>::zeros();
    for p in neighbors {
        let d = Vector3::new(p.x, p.y, p.z) - centroid;
        cov += d * d.transpose();
    }
    cov /= n;

    let eigen = SymmetricEigen::new(cov);
    let (min_idx, _) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let normal: Normal3 = eigen.eigenvectors.column(min_idx).into_owned();
    let norm = normal.norm();
    (norm > 1e-6 && norm.is_finite()).then(|| normal / norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CloudPoint, Rgb};
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_normals_face_sensor() {
        // Horizontal patch below the sensor: normals point up toward it
        let mut cloud = PointCloud3D::new("patch", 0);
        for i in 0..10 {
            for j in 0..10 {
                cloud.push(CloudPoint::xyz_rgb(
                    0.5 + i as f32 * 0.01,
                    j as f32 * 0.01,
                    -0.5,
                    Rgb::WHITE,
                ));
            }
        }
        let normals = PcaNormalEstimator::default().estimate(&cloud);
        assert_eq!(normals.len(), cloud.len());
        for n in &normals {
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-4);
            assert_relative_eq!(n.z, 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_wall_normals() {
        // Vertical wall at x = 1.0 facing the origin: normals point to -x
        let mut cloud = PointCloud3D::new("wall", 0);
        for j in 0..10 {
            for k in 0..10 {
                cloud.push(CloudPoint::xyz_rgb(1.0, j as f32 * 0.01, k as f32 * 0.01, Rgb::WHITE));
            }
        }
        let normals = PcaNormalEstimator::default().estimate(&cloud);
        for n in &normals {
            assert_relative_eq!(n.x, -1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_tiny_cloud_defaults_up() {
        let mut cloud = PointCloud3D::new("pair", 0);
        cloud.push(CloudPoint::xyz_rgb(0.0, 0.0, -1.0, Rgb::WHITE));
        cloud.push(CloudPoint::xyz_rgb(0.01, 0.0, -1.0, Rgb::WHITE));
        let normals = PcaNormalEstimator::default().estimate(&cloud);
        assert_eq!(normals.len(), 2);
        assert_eq!(normals[0], Vector3::z());
    }
}
