//! Table/object segmentation.
//!
//! Fits the dominant plane (the table top) with RANSAC, splits the cloud
//! into plane inliers and everything else, then crops the object side
//! laterally so the dropboxes beside the table are not mistaken for objects.
//!
//! ```text
//! filtered cloud
//!     │
//!     ├── RANSAC plane ──► inliers ──► table
//!     │
//!     └── outliers ──► objects_unclipped ──► PassThrough(y) ──► objects
//! ```

use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::passthrough::{PassThrough, PassThroughConfig};
use crate::core::types::{Point3D, PointCloud3D};

// ============================================================================
// Plane model
// ============================================================================

/// Infinite plane `normal · p + d = 0` with a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneModel {
    /// Unit normal
    pub normal: Vector3<f32>,
    /// Offset from origin
    pub d: f32,
}

impl PlaneModel {
    /// Plane through three points, `None` if they are collinear.
    pub fn from_points(a: Point3D, b: Point3D, c: Point3D) -> Option<Self> {
        let ab = Vector3::new(b.x - a.x, b.y - a.y, b.z - a.z);
        let ac = Vector3::new(c.x - a.x, c.y - a.y, c.z - a.z);
        let cross = ab.cross(&ac);
        let norm = cross.norm();
        if norm < 1e-9 {
            return None;
        }
        let normal = cross / norm;
        let d = -(normal.x * a.x + normal.y * a.y + normal.z * a.z);
        Some(Self { normal, d })
    }

    /// Least-squares plane through a point set (smallest covariance
    /// eigenvector). `None` for fewer than three points.
    pub fn fit(points: &[Point3D]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }

        let n = points.len() as f64;
        let mut centroid = Vector3::<f64>::zeros();
        for p in points {
            centroid += Vector3::new(p.x as f64, p.y as f64, p.z as f64);
        }
        centroid /= n;

        let mut cov = Matrix3::<f64>::zeros();
        for p in points {
            let v = Vector3::new(p.x as f64, p.y as f64, p.z as f64) - centroid;
            cov += v * v.transpose();
        }
        cov /= n;

        let eigen = SymmetricEigen::new(cov);
        let (min_idx, _) = eigen
            .eigenvalues
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))?;
        let normal = eigen.eigenvectors.column(min_idx).into_owned();
        let norm = normal.norm();
        if norm < 1e-12 {
            return None;
        }
        let normal = normal / norm;
        let d = -normal.dot(&centroid);

        Some(Self {
            normal: normal.cast::<f32>(),
            d: d as f32,
        })
    }

    /// Signed distance from a point to the plane.
    #[inline]
    pub fn signed_distance(&self, p: Point3D) -> f32 {
        self.normal.x * p.x + self.normal.y * p.y + self.normal.z * p.z + self.d
    }

    /// Absolute distance from a point to the plane.
    #[inline]
    pub fn distance(&self, p: Point3D) -> f32 {
        self.signed_distance(p).abs()
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for scene segmentation.
#[derive(Debug, Clone, Copy)]
pub struct SegmentationConfig {
    /// Maximum point-to-plane distance for a plane inlier (meters).
    ///
    /// Default: 0.01m
    pub distance_threshold: f32,

    /// RANSAC iterations.
    ///
    /// Default: 1000
    pub max_iterations: usize,

    /// Minimum inliers for a plane to be accepted.
    ///
    /// Default: 3
    pub min_inliers: usize,

    /// RNG seed, fixed so identical frames segment identically.
    pub seed: u64,

    /// Lateral crop applied to the object side only.
    ///
    /// Default: y in [-0.5, 0.5]
    pub object_crop: PassThroughConfig,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 0.01,
            max_iterations: 1000,
            min_inliers: 3,
            seed: 42,
            object_crop: PassThroughConfig::lateral(),
        }
    }
}

impl SegmentationConfig {
    pub fn with_distance_threshold(mut self, threshold: f32) -> Self {
        self.distance_threshold = threshold;
        self
    }

    pub fn with_min_inliers(mut self, min_inliers: usize) -> Self {
        self.min_inliers = min_inliers;
        self
    }

    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_object_crop(mut self, crop: PassThroughConfig) -> Self {
        self.object_crop = crop;
        self
    }
}

// ============================================================================
// Segmenter
// ============================================================================

/// Result of splitting one frame into table and objects.
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    /// Plane inliers
    pub table: PointCloud3D,
    /// Plane outliers after the lateral crop
    pub objects: PointCloud3D,
    /// Plane outliers before the lateral crop
    pub objects_unclipped: PointCloud3D,
    /// Least-squares refit of the winning plane, `None` if no plane was found
    pub plane: Option<PlaneModel>,
}

/// RANSAC table segmenter.
#[derive(Debug, Clone)]
pub struct SceneSegmenter {
    config: SegmentationConfig,
    object_crop: PassThrough,
}

impl SceneSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self {
            object_crop: PassThrough::new(config.object_crop),
            config,
        }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Split a filtered cloud into table and objects.
    ///
    /// Never fails: without an acceptable plane the table is empty and every
    /// point is treated as an object.
    pub fn segment(&self, cloud: &PointCloud3D) -> Segmentation {
        let (plane, inliers) = match self.ransac_plane(cloud) {
            Some((model, inliers)) => {
                let inlier_points: Vec<Point3D> =
                    inliers.iter().map(|&i| cloud.points[i].position).collect();
                (PlaneModel::fit(&inlier_points).or(Some(model)), inliers)
            }
            None => {
                log::warn!(
                    "No table plane found in {} points, treating all as objects",
                    cloud.len()
                );
                (None, Vec::new())
            }
        };

        let table = cloud.extract(&inliers, "table");
        let objects_unclipped = cloud.extract_inverse(&inliers, "objects_pre");
        let objects = self.object_crop.apply(&objects_unclipped).renamed("objects");

        log::debug!(
            "Segmentation: {} table, {} objects ({} before crop)",
            table.len(),
            objects.len(),
            objects_unclipped.len()
        );

        Segmentation {
            table,
            objects,
            objects_unclipped,
            plane,
        }
    }

    /// Best plane and its inlier indices (ascending).
    fn ransac_plane(&self, cloud: &PointCloud3D) -> Option<(PlaneModel, Vec<usize>)> {
        let n = cloud.len();
        if n < 3 {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let threshold = self.config.distance_threshold;
        let mut best: Option<PlaneModel> = None;
        let mut best_score = 0usize;

        for _ in 0..self.config.max_iterations {
            let i1 = rng.random_range(0..n);
            let i2 = rng.random_range(0..n);
            let i3 = rng.random_range(0..n);
            if i1 == i2 || i2 == i3 || i1 == i3 {
                continue;
            }

            let Some(model) = PlaneModel::from_points(
                cloud.points[i1].position,
                cloud.points[i2].position,
                cloud.points[i3].position,
            ) else {
                continue;
            };

            let score = cloud
                .positions()
                .filter(|&p| model.distance(p) <= threshold)
                .count();
            if score > best_score {
                best_score = score;
                best = Some(model);
                if score == n {
                    break;
                }
            }
        }

        let model = best?;
        if best_score < self.config.min_inliers.max(3) {
            return None;
        }

        // Final recount on the winning model
        let inliers: Vec<usize> = cloud
            .positions()
            .enumerate()
            .filter_map(|(i, p)| (model.distance(p) <= threshold).then_some(i))
            .collect();
        Some((model, inliers))
    }
}

impl Default for SceneSegmenter {
    fn default() -> Self {
        Self::new(SegmentationConfig::default())
    }
}
