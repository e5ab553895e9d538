//! Axis-aligned pass-through crop.

use crate::core::types::{Axis, PointCloud3D};

/// Configuration for a pass-through crop.
#[derive(Debug, Clone, Copy)]
pub struct PassThroughConfig {
    /// Axis the bounds apply to.
    pub axis: Axis,
    /// Lower bound in meters (inclusive).
    pub min: f32,
    /// Upper bound in meters (inclusive).
    pub max: f32,
}

impl PassThroughConfig {
    pub fn new(axis: Axis, min: f32, max: f32) -> Self {
        Self { axis, min, max }
    }

    /// Vertical crop that keeps the table top and everything above it.
    ///
    /// Default: z in [0.6, 4.0]
    pub fn table_height() -> Self {
        Self::new(Axis::Z, 0.6, 4.0)
    }

    /// Lateral crop that removes the dropboxes from the object side.
    ///
    /// Default: y in [-0.5, 0.5]
    pub fn lateral() -> Self {
        Self::new(Axis::Y, -0.5, 0.5)
    }
}

impl Default for PassThroughConfig {
    fn default() -> Self {
        Self::table_height()
    }
}

/// Keeps points whose coordinate on one axis lies in `[min, max]`.
#[derive(Debug, Clone)]
pub struct PassThrough {
    config: PassThroughConfig,
}

impl PassThrough {
    pub fn new(config: PassThroughConfig) -> Self {
        Self { config }
    }

    /// Check if a coordinate is inside the bounds.
    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.config.min && value <= self.config.max
    }

    /// Apply the crop, returning a new cloud.
    pub fn apply(&self, cloud: &PointCloud3D) -> PointCloud3D {
        let axis = self.config.axis;
        let points = cloud
            .points
            .iter()
            .filter(|p| self.contains(p.position.coord(axis)))
            .copied()
            .collect();
        let cropped = PointCloud3D::from_points(cloud.name.clone(), cloud.timestamp_us, points);
        log::trace!(
            "Crop {} in [{}, {}]: {} -> {} points",
            axis.as_str(),
            self.config.min,
            self.config.max,
            cloud.len(),
            cropped.len()
        );
        cropped
    }
}

impl Default for PassThrough {
    fn default() -> Self {
        Self::new(PassThroughConfig::default())
    }
}
