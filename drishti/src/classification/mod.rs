//! Object classification from histogram features.
//!
//! ```text
//! cluster cloud ─┐
//!                ├─► extract_features ─► FeatureScaler ─► LinearClassifier ─► label
//! normals ───────┘
//! ```

pub mod features;
pub mod model;

pub use features::{
    ColorSpace, FeatureConfig, compute_color_histograms, compute_normal_histograms,
    extract_features,
};
pub use model::{FeatureScaler, LinearClassifier, ModelBundle};

use crate::core::types::{Normal3, PointCloud3D};
use crate::error::{DrishtiError, Result};

/// Labels cluster clouds with a loaded model.
#[derive(Debug, Clone)]
pub struct ObjectClassifier {
    model: ModelBundle,
    config: FeatureConfig,
}

impl ObjectClassifier {
    /// Pair a model with a feature configuration.
    ///
    /// Fails if the model expects a different feature length.
    pub fn new(model: ModelBundle, config: FeatureConfig) -> Result<Self> {
        if model.feature_len() != config.feature_len() {
            return Err(DrishtiError::Model(format!(
                "model expects {} features, extractor produces {}",
                model.feature_len(),
                config.feature_len()
            )));
        }
        Ok(Self { model, config })
    }

    pub fn model(&self) -> &ModelBundle {
        &self.model
    }

    /// Classify one cluster given one normal per point.
    pub fn classify(&self, cluster: &PointCloud3D, normals: &[Normal3]) -> Result<String> {
        if normals.len() != cluster.len() {
            return Err(DrishtiError::Classification(format!(
                "{} normals for {} points",
                normals.len(),
                cluster.len()
            )));
        }
        let features = extract_features(cluster, normals, &self.config);
        self.model.predict(&features).map(str::to_string)
    }
}
