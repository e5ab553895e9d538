//! Histogram features for object recognition.
//!
//! A cluster is described by the concatenation of
//! - a color histogram (3 channels x `bins`), normalized to sum 1
//! - a surface normal histogram (3 components x `bins`), normalized to sum 1

use serde::{Deserialize, Serialize};

use crate::core::math::{histogram, normalize_sum, rgb_to_hsv};
use crate::core::types::{Normal3, PointCloud3D};

/// Color space used for the color histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    #[default]
    Hsv,
    Rgb,
}

/// Configuration for feature extraction.
#[derive(Debug, Clone, Copy)]
pub struct FeatureConfig {
    /// Bins per channel.
    ///
    /// Default: 32
    pub bins: usize,

    /// Color space of the color histogram.
    ///
    /// Default: HSV
    pub color_space: ColorSpace,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            bins: 32,
            color_space: ColorSpace::Hsv,
        }
    }
}

impl FeatureConfig {
    /// Length of a full feature vector.
    pub fn feature_len(&self) -> usize {
        6 * self.bins
    }
}

/// Channel values range over [0, 256).
const COLOR_RANGE: (f32, f32) = (0.0, 256.0);

/// Normal components range over [-1, 1].
const NORMAL_RANGE: (f32, f32) = (-1.0, 1.0);

/// Color histogram of a cloud: three channels of `bins` each, concatenated
/// and normalized. HSV channels are scaled to [0, 255] first.
pub fn compute_color_histograms(cloud: &PointCloud3D, space: ColorSpace, bins: usize) -> Vec<f32> {
    let channels: Vec<[f32; 3]> = cloud
        .colors()
        .map(|c| match space {
            ColorSpace::Hsv => {
                let [h, s, v] = rgb_to_hsv(c);
                [h * 255.0, s * 255.0, v * 255.0]
            }
            ColorSpace::Rgb => [c.r as f32, c.g as f32, c.b as f32],
        })
        .collect();

    concat_channels(&channels, bins, COLOR_RANGE)
}

/// Normal histogram: x, y and z components of `bins` each, concatenated
/// and normalized.
pub fn compute_normal_histograms(normals: &[Normal3], bins: usize) -> Vec<f32> {
    let channels: Vec<[f32; 3]> = normals.iter().map(|n| [n.x, n.y, n.z]).collect();
    concat_channels(&channels, bins, NORMAL_RANGE)
}

fn concat_channels(channels: &[[f32; 3]], bins: usize, range: (f32, f32)) -> Vec<f32> {
    let mut features = Vec::with_capacity(3 * bins);
    for ch in 0..3 {
        features.extend(histogram(channels.iter().map(|c| c[ch]), bins, range.0, range.1));
    }
    normalize_sum(&mut features);
    features
}

/// Full feature vector: color histograms followed by normal histograms.
pub fn extract_features(cloud: &PointCloud3D, normals: &[Normal3], config: &FeatureConfig) -> Vec<f32> {
    let mut features = compute_color_histograms(cloud, config.color_space, config.bins);
    features.extend(compute_normal_histograms(normals, config.bins));
    features
}
