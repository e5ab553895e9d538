//! Configuration loading for Drishti
//!
//! Every section and field is optional; missing values fall back to the
//! defaults below. See `config/drishti.toml` for a complete example.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::classification::{ColorSpace, FeatureConfig};
use crate::core::types::Axis;
use crate::engine::pick::PickConfig;
use crate::engine::pipeline::PipelineConfig;
use crate::engine::turn::{ANGLE_TOLERANCE, TURN_SENTINEL, TurnSequence};
use crate::error::{DrishtiError, Result};
use crate::perception::{
    ClusterConfig, FilterChainConfig, NormalEstimatorConfig, OutlierFilterConfig,
    PassThroughConfig, SegmentationConfig, VoxelGridConfig,
};

/// Main configuration structure
#[derive(Clone, Debug, Deserialize, Default)]
pub struct DrishtiConfig {
    #[serde(default)]
    pub filter: FilterSection,
    #[serde(default)]
    pub segmentation: SegmentationSection,
    #[serde(default)]
    pub clustering: ClusteringSection,
    #[serde(default)]
    pub features: FeaturesSection,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub turn: TurnSection,
    #[serde(default)]
    pub pick: PickSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub replay: ReplaySection,
}

/// Filter chain parameters
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FilterSection {
    /// Neighbors per point for outlier analysis
    pub outlier_mean_k: usize,
    /// Standard deviation multiplier for outlier rejection
    pub outlier_std_mul: f32,
    /// Voxel edge length in meters
    pub leaf_size: f32,
    /// Axis of the primary crop
    pub crop_axis: Axis,
    pub crop_min: f32,
    pub crop_max: f32,
}

impl Default for FilterSection {
    fn default() -> Self {
        Self {
            outlier_mean_k: 25,
            outlier_std_mul: 1.0,
            leaf_size: 0.01,
            crop_axis: Axis::Z,
            crop_min: 0.6,
            crop_max: 4.0,
        }
    }
}

/// Table segmentation parameters
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SegmentationSection {
    /// RANSAC inlier distance in meters
    pub distance_threshold: f32,
    pub max_iterations: usize,
    pub min_inliers: usize,
    pub seed: u64,
    /// Axis of the object-side crop
    pub object_axis: Axis,
    pub object_min: f32,
    pub object_max: f32,
}

impl Default for SegmentationSection {
    fn default() -> Self {
        Self {
            distance_threshold: 0.01,
            max_iterations: 1000,
            min_inliers: 3,
            seed: 42,
            object_axis: Axis::Y,
            object_min: -0.5,
            object_max: 0.5,
        }
    }
}

/// Euclidean clustering parameters
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClusteringSection {
    pub tolerance: f32,
    pub min_size: usize,
    pub max_size: usize,
}

impl Default for ClusteringSection {
    fn default() -> Self {
        Self {
            tolerance: 0.03,
            min_size: 50,
            max_size: 2200,
        }
    }
}

/// Feature extraction parameters
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FeaturesSection {
    /// Histogram bins per channel
    pub bins: usize,
    pub color_space: ColorSpace,
    /// Neighbors used for normal estimation
    pub normal_k: usize,
}

impl Default for FeaturesSection {
    fn default() -> Self {
        Self {
            bins: 32,
            color_space: ColorSpace::Hsv,
            normal_k: 15,
        }
    }
}

/// Trained model location
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub path: PathBuf,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("config/model.json"),
        }
    }
}

/// Body rotation script; `-100` in `next` marks the end
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TurnSection {
    pub expected: Vec<f64>,
    pub next: Vec<f64>,
    pub tolerance: f64,
}

impl Default for TurnSection {
    fn default() -> Self {
        use std::f64::consts::FRAC_PI_2;
        Self {
            expected: vec![0.0, FRAC_PI_2, -FRAC_PI_2, 0.0],
            next: vec![FRAC_PI_2, -FRAC_PI_2, 0.0, TURN_SENTINEL],
            tolerance: ANGLE_TOLERANCE,
        }
    }
}

/// Pick task parameters
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PickSection {
    pub scene_id: u32,
    /// Group picked with the left arm
    pub left_group: String,
    pub service_timeout_secs: f64,
    pub skip_already_picked: bool,
    /// Pick list YAML
    pub pick_list: PathBuf,
    /// Dropbox YAML
    pub dropbox: PathBuf,
}

impl Default for PickSection {
    fn default() -> Self {
        Self {
            scene_id: 3,
            left_group: "red".to_string(),
            service_timeout_secs: 5.0,
            skip_already_picked: true,
            pick_list: PathBuf::from("config/pick_list_3.yaml"),
            dropbox: PathBuf::from("config/dropbox.yaml"),
        }
    }
}

/// Output files
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Pick request records
    pub records_path: PathBuf,
    /// Stage cloud dumps; disabled when unset
    pub dump_dir: Option<PathBuf>,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            records_path: PathBuf::from("output_3.yaml"),
            dump_dir: None,
        }
    }
}

/// Offline replay with a simulated robot
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ReplaySection {
    /// PCD file replayed as the sensor stream
    pub cloud: Option<PathBuf>,
    /// Frames to replay
    pub frames: usize,
    pub frame_interval_ms: u64,
    /// Joint state publish rate of the simulated robot
    pub joint_rate_hz: f64,
    /// Body rotation speed of the simulated robot (rad/s)
    pub turn_speed: f64,
    /// Result reported by the simulated pick-place routine
    pub pick_success: bool,
}

impl Default for ReplaySection {
    fn default() -> Self {
        Self {
            cloud: None,
            frames: 20,
            frame_interval_ms: 500,
            joint_rate_hz: 20.0,
            turn_speed: 1.5,
            pick_success: true,
        }
    }
}

impl DrishtiConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DrishtiError::Config(format!("Failed to read config file: {}", e)))?;
        let config: DrishtiConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Perception pipeline parameters
    pub fn pipeline_config(&self) -> PipelineConfig {
        let f = &self.filter;
        let s = &self.segmentation;
        let c = &self.clustering;
        PipelineConfig {
            filter: FilterChainConfig {
                outlier: OutlierFilterConfig::default()
                    .with_mean_k(f.outlier_mean_k)
                    .with_std_mul(f.outlier_std_mul),
                voxel: VoxelGridConfig::default().with_leaf_size(f.leaf_size),
                crop: PassThroughConfig::new(f.crop_axis, f.crop_min, f.crop_max),
            },
            segmentation: SegmentationConfig::default()
                .with_distance_threshold(s.distance_threshold)
                .with_max_iterations(s.max_iterations)
                .with_min_inliers(s.min_inliers)
                .with_seed(s.seed)
                .with_object_crop(PassThroughConfig::new(s.object_axis, s.object_min, s.object_max)),
            clustering: ClusterConfig::default()
                .with_tolerance(c.tolerance)
                .with_size_range(c.min_size, c.max_size),
        }
    }

    pub fn feature_config(&self) -> FeatureConfig {
        FeatureConfig {
            bins: self.features.bins,
            color_space: self.features.color_space,
        }
    }

    pub fn normal_config(&self) -> NormalEstimatorConfig {
        NormalEstimatorConfig::default().with_k(self.features.normal_k)
    }

    /// Validated turn script
    pub fn turn_sequence(&self) -> Result<TurnSequence> {
        TurnSequence::from_markers(self.turn.expected.clone(), self.turn.next.clone())
    }

    pub fn pick_config(&self) -> Result<PickConfig> {
        let timeout = self.pick.service_timeout_secs;
        if !timeout.is_finite() || timeout < 0.0 {
            return Err(DrishtiError::Config(format!(
                "invalid service timeout {timeout}"
            )));
        }
        Ok(PickConfig {
            scene_id: self.pick.scene_id,
            left_group: self.pick.left_group.clone(),
            service_timeout: Duration::from_secs_f64(timeout),
            output_path: self.output.records_path.clone(),
            skip_already_picked: self.pick.skip_already_picked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_defaults() {
        let config = DrishtiConfig::default();
        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.filter.outlier.mean_k, 25);
        assert_eq!(pipeline.filter.voxel.leaf_size, 0.01);
        assert_eq!(pipeline.filter.crop.axis, Axis::Z);
        assert_eq!(pipeline.segmentation.object_crop.axis, Axis::Y);
        assert_eq!(pipeline.clustering.max_size, 2200);
        assert_eq!(config.turn_sequence().unwrap(), TurnSequence::pr2_default());
        assert_eq!(config.pick_config().unwrap().left_group, "red");
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
            [clustering]
            min_size = 20

            [features]
            color_space = "rgb"

            [output]
            dump_dir = "/tmp/dumps"
        "#;
        let config: DrishtiConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.clustering.min_size, 20);
        assert_eq!(config.clustering.max_size, 2200);
        assert_eq!(config.features.color_space, ColorSpace::Rgb);
        assert_eq!(config.output.dump_dir, Some(PathBuf::from("/tmp/dumps")));
        assert_eq!(config.filter.leaf_size, 0.01);
    }

    #[test]
    fn test_segmentation_section_reaches_pipeline() {
        let toml = r#"
            [segmentation]
            max_iterations = 200
            min_inliers = 50
            seed = 7
            object_min = -0.3
        "#;
        let config: DrishtiConfig = toml::from_str(toml).unwrap();
        let seg = config.pipeline_config().segmentation;
        assert_eq!(seg.max_iterations, 200);
        assert_eq!(seg.min_inliers, 50);
        assert_eq!(seg.seed, 7);
        assert_eq!(seg.distance_threshold, 0.01);
        assert_eq!(seg.object_crop.min, -0.3);
        assert_eq!(seg.object_crop.max, 0.5);
    }

    #[test]
    fn test_bad_turn_script() {
        let toml = r#"
            [turn]
            expected = [0.0, 1.0]
            next = [1.0]
        "#;
        let config: DrishtiConfig = toml::from_str(toml).unwrap();
        assert!(config.turn_sequence().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = DrishtiConfig::load(Path::new("/nonexistent/drishti.toml")).unwrap_err();
        assert!(matches!(err, DrishtiError::Config(_)));
    }
}
