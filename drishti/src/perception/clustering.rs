//! Euclidean cluster extraction.
//!
//! Groups object points into connected components: two points are linked
//! when they are within `tolerance` of each other, and a cluster is every
//! point reachable through such links. Components outside the size bounds
//! are discarded entirely.

use super::spatial_index::PointIndex;
use crate::core::types::PointCloud3D;

/// Indices into the source cloud, ascending.
pub type Cluster = Vec<usize>;

/// Configuration for Euclidean clustering.
#[derive(Debug, Clone, Copy)]
pub struct ClusterConfig {
    /// Link distance in meters.
    ///
    /// Default: 0.03m
    pub tolerance: f32,

    /// Smallest accepted cluster (points).
    ///
    /// Default: 50
    pub min_size: usize,

    /// Largest accepted cluster (points).
    ///
    /// Default: 2200
    pub max_size: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.03,
            min_size: 50,
            max_size: 2200,
        }
    }
}

impl ClusterConfig {
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_size_range(mut self, min_size: usize, max_size: usize) -> Self {
        self.min_size = min_size;
        self.max_size = max_size;
        self
    }
}

/// Flood-fill cluster extractor over a spatial index.
#[derive(Debug, Clone)]
pub struct EuclideanClusterExtractor {
    config: ClusterConfig,
}

impl EuclideanClusterExtractor {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Extract clusters from a cloud, in order of their lowest index.
    ///
    /// Clusters are pairwise disjoint and every returned cluster satisfies
    /// `min_size <= len <= max_size`.
    pub fn extract(&self, cloud: &PointCloud3D) -> Vec<Cluster> {
        if cloud.is_empty() {
            return Vec::new();
        }

        let index = PointIndex::new(cloud);
        let mut visited = vec![false; cloud.len()];
        let mut clusters = Vec::new();
        let mut rejected = 0usize;

        for seed in 0..cloud.len() {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;

            let mut members = vec![seed];
            let mut head = 0;
            while head < members.len() {
                let p = cloud.points[members[head]].position;
                head += 1;
                for neighbor in index.within_radius(p, self.config.tolerance) {
                    if !visited[neighbor] {
                        visited[neighbor] = true;
                        members.push(neighbor);
                    }
                }
            }

            if members.len() < self.config.min_size || members.len() > self.config.max_size {
                rejected += 1;
                continue;
            }
            members.sort_unstable();
            clusters.push(members);
        }

        log::debug!(
            "Clustering: {} clusters from {} points ({} components rejected by size)",
            clusters.len(),
            cloud.len(),
            rejected
        );
        clusters
    }
}

impl Default for EuclideanClusterExtractor {
    fn default() -> Self {
        Self::new(ClusterConfig::default())
    }
}
