//! Point cloud perception.
//!
//! Turns a raw RGB-D cloud into segmented, clustered object candidates.
//!
//! # Pipeline
//!
//! ```text
//! raw cloud
//!   → StatisticalOutlierFilter → VoxelGrid → PassThrough(z)     (FilterChain)
//!   → SceneSegmenter  (RANSAC table plane, lateral object crop)
//!   → EuclideanClusterExtractor
//!   → per-cluster clouds
//! ```
//!
//! # CloudFilter Trait
//!
//! All filter stages implement [`CloudFilter`] for a consistent interface:
//!
//! ```ignore
//! use drishti::perception::{CloudFilter, VoxelGrid};
//!
//! let grid = VoxelGrid::default();
//! let downsampled = grid.filter(&cloud);
//! println!("Filter '{}' applied", grid.name());
//! ```

pub mod clustering;
pub mod normals;
pub mod outlier;
pub mod passthrough;
pub mod segmentation;
pub mod spatial_index;
pub mod visualization;
pub mod voxel;

pub use clustering::{Cluster, ClusterConfig, EuclideanClusterExtractor};
pub use normals::{NormalEstimatorConfig, PcaNormalEstimator};
pub use outlier::{OutlierFilterConfig, StatisticalOutlierFilter};
pub use passthrough::{PassThrough, PassThroughConfig};
pub use segmentation::{PlaneModel, SceneSegmenter, Segmentation, SegmentationConfig};
pub use spatial_index::PointIndex;
pub use visualization::{ClusterPalette, LabelMarker, cluster_mask_cloud};
pub use voxel::{VoxelGrid, VoxelGridConfig};

use crate::core::types::PointCloud3D;

/// Trait for cloud filtering operations.
///
/// Filters never mutate their input; each returns a new cloud.
pub trait CloudFilter: Send + Sync {
    /// Apply the filter, returning a filtered cloud.
    fn filter(&self, cloud: &PointCloud3D) -> PointCloud3D;

    /// Get the name of this filter for diagnostics.
    fn name(&self) -> &'static str;
}

impl CloudFilter for StatisticalOutlierFilter {
    fn filter(&self, cloud: &PointCloud3D) -> PointCloud3D {
        self.apply(cloud)
    }

    fn name(&self) -> &'static str {
        "StatisticalOutlierFilter"
    }
}

impl CloudFilter for VoxelGrid {
    fn filter(&self, cloud: &PointCloud3D) -> PointCloud3D {
        self.apply(cloud)
    }

    fn name(&self) -> &'static str {
        "VoxelGrid"
    }
}

impl CloudFilter for PassThrough {
    fn filter(&self, cloud: &PointCloud3D) -> PointCloud3D {
        self.apply(cloud)
    }

    fn name(&self) -> &'static str {
        "PassThrough"
    }
}

/// Configuration for the filter chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterChainConfig {
    /// Outlier removal configuration
    pub outlier: OutlierFilterConfig,
    /// Voxel grid configuration
    pub voxel: VoxelGridConfig,
    /// Primary axis crop configuration
    pub crop: PassThroughConfig,
}

/// Every intermediate cloud of one chain run.
#[derive(Debug, Clone, Default)]
pub struct FilteredStages {
    pub no_outliers: PointCloud3D,
    pub downsampled: PointCloud3D,
    pub cropped: PointCloud3D,
}

/// Fixed-order filter chain: outlier removal, voxel grid, pass-through.
pub struct FilterChain {
    outlier: StatisticalOutlierFilter,
    voxel: VoxelGrid,
    crop: PassThrough,
}

impl FilterChain {
    pub fn new(config: FilterChainConfig) -> Self {
        Self {
            outlier: StatisticalOutlierFilter::new(config.outlier),
            voxel: VoxelGrid::new(config.voxel),
            crop: PassThrough::new(config.crop),
        }
    }

    /// Run every stage, keeping the intermediate clouds.
    ///
    /// Steps:
    /// 1. Statistical outlier removal
    /// 2. Voxel downsampling
    /// 3. Pass-through crop on the primary axis
    pub fn process(&self, raw: &PointCloud3D) -> FilteredStages {
        let no_outliers = self.run_stage(&self.outlier, raw, "no_outlier");
        let downsampled = self.run_stage(&self.voxel, &no_outliers, "downsampled");
        let cropped = self.run_stage(&self.crop, &downsampled, "passthrough");

        FilteredStages {
            no_outliers,
            downsampled,
            cropped,
        }
    }

    /// Run the chain and keep only the final cloud.
    pub fn filter(&self, raw: &PointCloud3D) -> PointCloud3D {
        self.process(raw).cropped
    }

    fn run_stage(&self, stage: &dyn CloudFilter, input: &PointCloud3D, name: &str) -> PointCloud3D {
        let output = stage.filter(input).renamed(name);
        if output.is_empty() && !input.is_empty() {
            log::warn!("{} removed every point ({} in)", stage.name(), input.len());
        }
        output
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new(FilterChainConfig::default())
    }
}
