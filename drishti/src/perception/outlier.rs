//! Statistical outlier removal for 3D clouds.
//!
//! Removes isolated noise points using the distribution of mean neighbor
//! distances across the whole cloud.

use super::spatial_index::PointIndex;
use crate::core::math::mean_and_std;
use crate::core::types::{CloudPoint, PointCloud3D};

/// Configuration for statistical outlier removal.
#[derive(Debug, Clone, Copy)]
pub struct OutlierFilterConfig {
    /// Number of nearest neighbors analyzed per point (itself excluded).
    ///
    /// Clamped to `len - 1` on small clouds.
    /// Default: 25
    pub mean_k: usize,

    /// Standard deviation multiplier for the rejection threshold.
    ///
    /// Points whose mean neighbor distance exceeds `mean + std_mul * std`
    /// are removed.
    /// Default: 1.0
    pub std_mul: f32,
}

impl Default for OutlierFilterConfig {
    fn default() -> Self {
        Self {
            mean_k: 25,
            std_mul: 1.0,
        }
    }
}

impl OutlierFilterConfig {
    pub fn with_mean_k(mut self, mean_k: usize) -> Self {
        self.mean_k = mean_k;
        self
    }

    pub fn with_std_mul(mut self, std_mul: f32) -> Self {
        self.std_mul = std_mul;
        self
    }
}

/// Statistical outlier filter.
///
/// For each point the mean distance to its `k` nearest neighbors is
/// computed. The global mean and sample standard deviation of those values
/// set the threshold; points above it are dropped.
#[derive(Debug, Clone)]
pub struct StatisticalOutlierFilter {
    config: OutlierFilterConfig,
}

impl StatisticalOutlierFilter {
    /// Create a new outlier filter with the given configuration.
    pub fn new(config: OutlierFilterConfig) -> Self {
        Self { config }
    }

    /// Mean distance from every point to its `k` nearest neighbors.
    fn mean_neighbor_distances(&self, cloud: &PointCloud3D, k: usize) -> Vec<f32> {
        let index = PointIndex::new(cloud);
        cloud
            .positions()
            .map(|p| {
                // k + 1 because the query point is its own nearest neighbor
                let neighbors = index.k_nearest(p, k + 1);
                let (sum, count) = neighbors
                    .iter()
                    .skip(1)
                    .fold((0.0f32, 0usize), |(s, c), &(_, d)| (s + d, c + 1));
                if count == 0 { 0.0 } else { sum / count as f32 }
            })
            .collect()
    }

    /// Apply outlier removal, returning a new cloud.
    ///
    /// Points with a non-finite coordinate are always removed.
    pub fn apply(&self, input: &PointCloud3D) -> PointCloud3D {
        let cloud = &finite_points(input);
        if cloud.len() <= 1 || self.config.mean_k == 0 {
            return cloud.clone();
        }

        let k = self.config.mean_k.min(cloud.len() - 1);
        let distances = self.mean_neighbor_distances(cloud, k);
        let Some((mean, std)) = mean_and_std(&distances) else {
            return cloud.clone();
        };
        let threshold = mean + self.config.std_mul * std;

        let points = cloud
            .points
            .iter()
            .zip(&distances)
            .filter_map(|(p, &d)| (d <= threshold).then_some(*p))
            .collect();

        let filtered = PointCloud3D::from_points(cloud.name.clone(), cloud.timestamp_us, points);
        log::debug!(
            "Outlier removal: {} -> {} points (threshold {:.4})",
            input.len(),
            filtered.len(),
            threshold
        );
        filtered
    }
}

/// Copy of `cloud` without NaN or infinite positions.
fn finite_points(cloud: &PointCloud3D) -> PointCloud3D {
    let points: Vec<CloudPoint> = cloud
        .points
        .iter()
        .filter(|p| p.position.is_finite())
        .copied()
        .collect();
    if points.len() < cloud.len() {
        log::debug!("Dropped {} non-finite points", cloud.len() - points.len());
    }
    PointCloud3D::from_points(cloud.name.clone(), cloud.timestamp_us, points)
}

impl Default for StatisticalOutlierFilter {
    fn default() -> Self {
        Self::new(OutlierFilterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Rgb;

    fn grid_with_stray(stray: (f32, f32, f32)) -> PointCloud3D {
        let mut cloud = PointCloud3D::new("raw", 0);
        for i in 0..10 {
            for j in 0..10 {
                cloud.push(CloudPoint::xyz_rgb(
                    i as f32 * 0.01,
                    j as f32 * 0.01,
                    1.0,
                    Rgb::WHITE,
                ));
            }
        }
        cloud.push(CloudPoint::xyz_rgb(stray.0, stray.1, stray.2, Rgb::new(255, 0, 0)));
        cloud
    }

    #[test]
    fn test_isolated_point_removed() {
        let cloud = grid_with_stray((2.0, 2.0, 2.0));
        let filter = StatisticalOutlierFilter::new(OutlierFilterConfig::default().with_mean_k(8));
        let filtered = filter.apply(&cloud);

        assert!(filtered.len() < cloud.len());
        assert!(filtered.positions().all(|p| p.z == 1.0));
    }

    #[test]
    fn test_non_finite_points_dropped() {
        let filter = StatisticalOutlierFilter::new(OutlierFilterConfig::default().with_mean_k(8));
        let clean = filter.apply(&grid_with_stray((2.0, 2.0, 2.0)));

        let mut cloud = grid_with_stray((2.0, 2.0, 2.0));
        cloud.push(CloudPoint::xyz_rgb(f32::NAN, f32::NAN, f32::NAN, Rgb::WHITE));
        cloud.push(CloudPoint::xyz_rgb(0.05, f32::INFINITY, 1.0, Rgb::WHITE));
        cloud.push(CloudPoint::xyz_rgb(0.05, 0.05, f32::NAN, Rgb::WHITE));
        let filtered = filter.apply(&cloud);

        assert!(filtered.positions().all(|p| p.is_finite()));
        assert_eq!(filtered, clean);
    }

    #[test]
    fn test_all_non_finite_gives_empty() {
        let mut cloud = PointCloud3D::new("raw", 0);
        for _ in 0..3 {
            cloud.push(CloudPoint::xyz_rgb(f32::NAN, 0.0, 0.0, Rgb::WHITE));
        }
        assert!(StatisticalOutlierFilter::default().apply(&cloud).is_empty());
    }

    #[test]
    fn test_small_clouds_pass_through() {
        let filter = StatisticalOutlierFilter::default();
        let empty = PointCloud3D::new("empty", 0);
        assert!(filter.apply(&empty).is_empty());

        let mut single = PointCloud3D::new("single", 0);
        single.push(CloudPoint::xyz_rgb(0.0, 0.0, 0.0, Rgb::WHITE));
        assert_eq!(filter.apply(&single).len(), 1);
    }

    #[test]
    fn test_k_clamped_to_cloud_size() {
        // Default k = 25 on a 5-point cloud must not panic
        let mut cloud = PointCloud3D::new("tiny", 0);
        for i in 0..5 {
            cloud.push(CloudPoint::xyz_rgb(i as f32 * 0.01, 0.0, 0.0, Rgb::WHITE));
        }
        let filtered = StatisticalOutlierFilter::default().apply(&cloud);
        assert!(!filtered.is_empty());
        assert!(filtered.len() <= 5);
    }

    #[test]
    fn test_uniform_cloud_keeps_points() {
        // Evenly spaced line: interior points all share one mean distance
        let mut cloud = PointCloud3D::new("line", 0);
        for i in 0..20 {
            cloud.push(CloudPoint::xyz_rgb(i as f32 * 0.01, 0.0, 0.0, Rgb::WHITE));
        }
        let filter = StatisticalOutlierFilter::new(OutlierFilterConfig::default().with_mean_k(2));
        let filtered = filter.apply(&cloud);
        assert!(filtered.len() >= 18);
    }
}
