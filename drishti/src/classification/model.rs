//! Trained classifier bundle.
//!
//! The bundle carries the three artifacts produced at training time:
//! the class list (label encoder), the feature scaler and a linear
//! one-vs-rest classifier. It is loaded once at startup from JSON:
//!
//! ```json
//! {
//!   "classes": ["biscuits", "soap", "soap2"],
//!   "scaler": { "mean": [...], "scale": [...] },
//!   "classifier": { "weights": [[...], [...], [...]], "intercepts": [0.0, 0.0, 0.0] }
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DrishtiError, Result};

/// Per-feature standardization `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

impl FeatureScaler {
    /// Scaler that leaves features unchanged.
    pub fn identity(len: usize) -> Self {
        Self {
            mean: vec![0.0; len],
            scale: vec![1.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Standardize a feature vector. A zero scale is treated as one.
    pub fn transform(&self, features: &[f32]) -> Result<Vec<f32>> {
        if features.len() != self.len() {
            return Err(DrishtiError::Classification(format!(
                "feature length {} does not match scaler length {}",
                features.len(),
                self.len()
            )));
        }
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&x, (&m, &s))| {
                let s = if s == 0.0 { 1.0 } else { s };
                (x - m) / s
            })
            .collect())
    }
}

/// Linear classifier with one decision function per class.
///
/// Two classes may share a single weight row, in which case a positive
/// decision selects the second class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    pub weights: Vec<Vec<f32>>,
    pub intercepts: Vec<f32>,
}

impl LinearClassifier {
    /// Decision value of every weight row.
    pub fn decision_function(&self, x: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .zip(&self.intercepts)
            .map(|(w, &b)| w.iter().zip(x).map(|(wi, xi)| wi * xi).sum::<f32>() + b)
            .collect()
    }

    /// Index of the predicted class.
    pub fn predict(&self, x: &[f32]) -> usize {
        let scores = self.decision_function(x);
        if scores.len() == 1 {
            return usize::from(scores[0] > 0.0);
        }
        // First maximum wins ties
        let mut best = 0;
        for (i, &s) in scores.iter().enumerate().skip(1) {
            if s > scores[best] {
                best = i;
            }
        }
        best
    }
}

/// Label encoder, scaler and classifier as one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub classes: Vec<String>,
    pub scaler: FeatureScaler,
    pub classifier: LinearClassifier,
}

impl ModelBundle {
    /// Load and validate a bundle from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            DrishtiError::Model(format!("cannot read model {}: {}", path.display(), e))
        })?;
        let bundle: ModelBundle = serde_json::from_str(&contents).map_err(|e| {
            DrishtiError::Model(format!("invalid model {}: {}", path.display(), e))
        })?;
        bundle.validate()?;
        log::info!(
            "Loaded model {} ({} classes, {} features)",
            path.display(),
            bundle.classes.len(),
            bundle.feature_len()
        );
        Ok(bundle)
    }

    /// Save the bundle as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Check that every part agrees on dimensions.
    pub fn validate(&self) -> Result<()> {
        if self.classes.is_empty() {
            return Err(DrishtiError::Model("model has no classes".to_string()));
        }
        if self.scaler.scale.len() != self.scaler.mean.len() {
            return Err(DrishtiError::Model(format!(
                "scaler mean has {} entries but scale has {}",
                self.scaler.mean.len(),
                self.scaler.scale.len()
            )));
        }

        let rows = self.classifier.weights.len();
        let binary = self.classes.len() == 2 && rows == 1;
        if rows != self.classes.len() && !binary {
            return Err(DrishtiError::Model(format!(
                "{} weight rows for {} classes",
                rows,
                self.classes.len()
            )));
        }
        if self.classifier.intercepts.len() != rows {
            return Err(DrishtiError::Model(format!(
                "{} intercepts for {} weight rows",
                self.classifier.intercepts.len(),
                rows
            )));
        }
        if let Some(row) = self.classifier.weights.iter().find(|w| w.len() != self.scaler.len()) {
            return Err(DrishtiError::Model(format!(
                "weight row of length {} does not match feature length {}",
                row.len(),
                self.scaler.len()
            )));
        }
        Ok(())
    }

    /// Number of features the model expects.
    pub fn feature_len(&self) -> usize {
        self.scaler.len()
    }

    /// Scale, classify and decode one feature vector.
    pub fn predict(&self, features: &[f32]) -> Result<&str> {
        let scaled = self.scaler.transform(features)?;
        let index = self.classifier.predict(&scaled);
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| DrishtiError::Classification(format!("class index {index} out of range")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_class_model() -> ModelBundle {
        ModelBundle {
            classes: vec!["a".into(), "b".into(), "c".into()],
            scaler: FeatureScaler {
                mean: vec![1.0, 0.0],
                scale: vec![2.0, 0.0],
            },
            classifier: LinearClassifier {
                weights: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, -1.0]],
                intercepts: vec![0.0, 0.0, 0.5],
            },
        }
    }

    #[test]
    fn test_scaler_zero_scale() {
        let scaler = three_class_model().scaler;
        let scaled = scaler.transform(&[3.0, 4.0]).unwrap();
        assert_eq!(scaled, vec![1.0, 4.0]);
        assert!(scaler.transform(&[1.0]).is_err());
    }

    #[test]
    fn test_argmax_prediction() {
        let model = three_class_model();
        assert!(model.validate().is_ok());
        assert_eq!(model.predict(&[5.0, 0.0]).unwrap(), "a");
        assert_eq!(model.predict(&[1.0, 3.0]).unwrap(), "b");
        assert_eq!(model.predict(&[1.0, -3.0]).unwrap(), "c");
    }

    #[test]
    fn test_binary_single_row() {
        let model = ModelBundle {
            classes: vec!["neg".into(), "pos".into()],
            scaler: FeatureScaler::identity(1),
            classifier: LinearClassifier {
                weights: vec![vec![1.0]],
                intercepts: vec![-0.5],
            },
        };
        assert!(model.validate().is_ok());
        assert_eq!(model.predict(&[1.0]).unwrap(), "pos");
        assert_eq!(model.predict(&[0.0]).unwrap(), "neg");
    }

    #[test]
    fn test_validation_failures() {
        let mut no_classes = three_class_model();
        no_classes.classes.clear();
        assert!(no_classes.validate().is_err());

        let mut bad_row = three_class_model();
        bad_row.classifier.weights[1].push(0.0);
        assert!(bad_row.validate().is_err());

        let mut bad_intercepts = three_class_model();
        bad_intercepts.classifier.intercepts.pop();
        assert!(bad_intercepts.validate().is_err());

        let mut missing_row = three_class_model();
        missing_row.classifier.weights.pop();
        missing_row.classifier.intercepts.pop();
        assert!(missing_row.validate().is_err());
    }

    #[test]
    fn test_load_roundtrip_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let model = three_class_model();
        model.save(&path).unwrap();
        assert_eq!(ModelBundle::load(&path).unwrap(), model);

        let err = ModelBundle::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, DrishtiError::Model(_)));
    }
}
