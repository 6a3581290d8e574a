//! Linear softmax classifier loaded from a JSON model bundle.
//!
//! The bundle is `<models_dir>/model.json`:
//!
//! ```json
//! { "vocabulary": ["hola", ...], "classes": ["saludo", ...],
//!   "weights": [[...], ...], "bias": [...] }
//! ```
//!
//! `weights` has one row per class and one column per vocabulary word.

use colloquy_core::Classifier;
use colloquy_core::error::IntentError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the model bundle inside the models directory.
pub const MODEL_FILE: &str = "model.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearClassifier {
    vocabulary: Vec<String>,
    classes: Vec<String>,
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl LinearClassifier {
    /// Build a classifier, checking that all shapes agree.
    pub fn new(
        vocabulary: Vec<String>,
        classes: Vec<String>,
        weights: Vec<Vec<f32>>,
        bias: Vec<f32>,
    ) -> Result<Self, IntentError> {
        let classifier = Self {
            vocabulary,
            classes,
            weights,
            bias,
        };
        classifier.check_shapes()?;
        Ok(classifier)
    }

    /// Load `model.json` from a models directory.
    pub fn load_dir(models_dir: &Path) -> Result<Self, IntentError> {
        Self::load(&models_dir.join(MODEL_FILE))
    }

    pub fn load(path: &Path) -> Result<Self, IntentError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IntentError::ClassifierUnavailable(format!("{}: {e}", path.display()))
        })?;
        let classifier: Self = serde_json::from_str(&content).map_err(|e| {
            IntentError::ClassifierUnavailable(format!("{}: {e}", path.display()))
        })?;
        classifier.check_shapes()?;
        tracing::info!(
            path = %path.display(),
            vocabulary = classifier.vocabulary.len(),
            classes = classifier.classes.len(),
            "Loaded intent classifier"
        );
        Ok(classifier)
    }

    fn check_shapes(&self) -> Result<(), IntentError> {
        let unavailable = |msg: String| Err(IntentError::ClassifierUnavailable(msg));

        if self.weights.len() != self.classes.len() {
            return unavailable(format!(
                "{} weight rows for {} classes",
                self.weights.len(),
                self.classes.len()
            ));
        }
        if self.bias.len() != self.classes.len() {
            return unavailable(format!(
                "{} bias terms for {} classes",
                self.bias.len(),
                self.classes.len()
            ));
        }
        if let Some(row) = self
            .weights
            .iter()
            .position(|r| r.len() != self.vocabulary.len())
        {
            return unavailable(format!(
                "weight row {row} does not match vocabulary size {}",
                self.vocabulary.len()
            ));
        }
        Ok(())
    }
}

impl Classifier for LinearClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    fn predict(&self, features: &[f32]) -> Result<Vec<f32>, IntentError> {
        if features.len() != self.vocabulary.len() {
            return Err(IntentError::ClassifierFailed(format!(
                "expected {} features, got {}",
                self.vocabulary.len(),
                features.len()
            )));
        }

        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| {
                row.iter()
                    .zip(features)
                    .map(|(w, x)| *w as f64 * *x as f64)
                    .sum::<f64>()
                    + *b as f64
            })
            .collect();

        Ok(softmax(&logits))
    }
}

/// Numerically stable softmax.
fn softmax(logits: &[f64]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return vec![0.0; logits.len()];
    }
    exps.iter().map(|e| (e / sum) as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_class() -> LinearClassifier {
        LinearClassifier::new(
            vec!["hola".into(), "adios".into()],
            vec!["saludo".into(), "despedida".into()],
            vec![vec![4.0, -4.0], vec![-4.0, 4.0]],
            vec![0.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn predict_sums_to_one() {
        let probs = two_class().predict(&[1.0, 0.0]).unwrap();
        assert_eq!(probs.len(), 2);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(probs[0] > 0.99);
    }

    #[test]
    fn predict_rejects_wrong_width() {
        let err = two_class().predict(&[1.0]).unwrap_err();
        assert!(matches!(err, IntentError::ClassifierFailed(_)));
    }

    #[test]
    fn zero_features_follow_bias() {
        let c = LinearClassifier::new(
            vec!["a".into()],
            vec!["x".into(), "y".into()],
            vec![vec![0.0], vec![0.0]],
            vec![0.0, 0.0],
        )
        .unwrap();
        let probs = c.predict(&[0.0]).unwrap();
        assert!((probs[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn shape_mismatch_rejected() {
        let err = LinearClassifier::new(
            vec!["a".into(), "b".into()],
            vec!["x".into()],
            vec![vec![1.0]],
            vec![0.0],
        )
        .unwrap_err();
        assert!(matches!(err, IntentError::ClassifierUnavailable(_)));
    }

    #[test]
    fn load_missing_bundle_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = LinearClassifier::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, IntentError::ClassifierUnavailable(_)));
    }

    #[test]
    fn load_bundle_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let json = serde_json::json!({
            "vocabulary": ["hola", "adios"],
            "classes": ["saludo", "despedida"],
            "weights": [[2.0, 0.0], [0.0, 2.0]],
            "bias": [0.0, 0.0]
        });
        std::fs::write(dir.path().join(MODEL_FILE), json.to_string()).unwrap();
        let c = LinearClassifier::load_dir(dir.path()).unwrap();
        assert_eq!(c.classes(), ["saludo", "despedida"]);
        assert_eq!(c.vocabulary().len(), 2);
    }
}
