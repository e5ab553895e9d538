//! Visualization outputs: cluster mask cloud and object label markers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::clustering::Cluster;
use crate::core::types::{CloudPoint, Point3D, PointCloud3D, Rgb};

/// Height of a label above the first point of its cluster (meters).
pub const LABEL_HEIGHT_OFFSET: f32 = 0.4;

/// Text height of label markers (meters).
pub const LABEL_TEXT_SCALE: f32 = 0.05;

/// Random cluster colors, grown on demand and cached.
///
/// A cluster keeps its color across frames as long as its index does.
#[derive(Debug, Clone)]
pub struct ClusterPalette {
    colors: Vec<Rgb>,
    rng: StdRng,
}

impl ClusterPalette {
    pub fn new(seed: u64) -> Self {
        Self {
            colors: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// At least `count` colors, reusing previously generated ones.
    pub fn colors(&mut self, count: usize) -> &[Rgb] {
        while self.colors.len() < count {
            let color = Rgb::new(
                self.rng.random_range(0..=255),
                self.rng.random_range(0..=255),
                self.rng.random_range(0..=255),
            );
            self.colors.push(color);
        }
        &self.colors[..count]
    }
}

impl Default for ClusterPalette {
    fn default() -> Self {
        Self::new(7)
    }
}

/// One cloud holding every clustered point, painted by cluster.
pub fn cluster_mask_cloud(
    objects: &PointCloud3D,
    clusters: &[Cluster],
    palette: &mut ClusterPalette,
) -> PointCloud3D {
    let colors = palette.colors(clusters.len());
    let total = clusters.iter().map(Vec::len).sum();
    let mut mask = PointCloud3D::with_capacity("cluster_cloud", objects.timestamp_us, total);

    for (cluster, &color) in clusters.iter().zip(colors) {
        for &i in cluster {
            if let Some(p) = objects.points.get(i) {
                mask.push(CloudPoint::new(p.position, color));
            }
        }
    }
    mask
}

/// Text marker floating above a detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMarker {
    pub id: usize,
    pub text: String,
    pub position: Point3D,
    pub scale: f32,
}

impl LabelMarker {
    /// Marker for the `id`-th object, placed above `anchor`.
    pub fn above(id: usize, text: impl Into<String>, anchor: Point3D) -> Self {
        Self {
            id,
            text: text.into(),
            position: Point3D::new(anchor.x, anchor.y, anchor.z + LABEL_HEIGHT_OFFSET),
            scale: LABEL_TEXT_SCALE,
        }
    }
}
