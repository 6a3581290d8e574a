//! Intent domain types and the classifier seams.
//!
//! An intent table is per language: each intent has a tag, the example
//! patterns it is recognized by, and the responses it may be answered with.

use crate::error::IntentError;
use serde::{Deserialize, Serialize};

/// One intent: a tag with example patterns and candidate responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDefinition {
    pub tag: String,

    #[serde(default)]
    pub patterns: Vec<String>,

    #[serde(default)]
    pub responses: Vec<String>,
}

/// All intents known for one language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentTable {
    #[serde(default)]
    pub intents: Vec<IntentDefinition>,
}

impl IntentTable {
    pub fn new(intents: Vec<IntentDefinition>) -> Self {
        Self { intents }
    }

    /// Look up an intent by tag.
    pub fn find(&self, tag: &str) -> Option<&IntentDefinition> {
        self.intents.iter().find(|i| i.tag == tag)
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }
}

/// A ranked intent candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentPrediction {
    pub intent: String,

    /// Confidence in [0, 1]
    pub probability: f32,
}

impl IntentPrediction {
    pub fn new(intent: impl Into<String>, probability: f32) -> Self {
        Self {
            intent: intent.into(),
            probability,
        }
    }
}

/// A trained classifier over a fixed feature vector.
///
/// Returns one probability per class label, in the label order the
/// classifier was trained with.
pub trait Classifier: Send + Sync {
    /// Class labels in output order.
    fn classes(&self) -> &[String];

    /// Feature vocabulary in input order.
    fn vocabulary(&self) -> &[String];

    fn predict(&self, features: &[f32]) -> std::result::Result<Vec<f32>, IntentError>;
}

/// Black-box language identification. Returns an ISO 639-1 code.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> String;
}
