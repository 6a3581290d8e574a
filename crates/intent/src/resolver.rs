//! Intent resolution: classifier first, lexical fallback second.
//!
//! The resolver never fails. A missing or broken classifier degrades to the
//! lexical scorer; a language without a table yields no candidates.

use crate::bow::BagOfWords;
use crate::classifier::LinearClassifier;
use crate::{fallback, table};
use colloquy_config::{EngineConfig, ModelConfig};
use colloquy_core::{Classifier, IntentPrediction, IntentTable};
use colloquy_telemetry::{Degradation, Telemetry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Which path produced the predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPath {
    Classifier,
    Fallback,
}

/// Why the prediction list looks the way it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// At least one candidate cleared the threshold.
    Ranked,
    /// Candidates existed but none cleared the threshold.
    BelowThreshold,
    /// Nothing to score against (no table, or no usable patterns).
    NoCandidates,
    /// The utterance was blank.
    EmptyInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub path: ResolutionPath,
    pub outcome: ResolutionOutcome,
    /// Sorted by probability, descending.
    pub predictions: Vec<IntentPrediction>,
}

impl Resolution {
    fn empty(path: ResolutionPath, outcome: ResolutionOutcome) -> Self {
        Self {
            path,
            outcome,
            predictions: Vec::new(),
        }
    }

    pub fn top(&self) -> Option<&IntentPrediction> {
        self.predictions.first()
    }
}

/// Thresholds that shape the ranked output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverSettings {
    pub confidence_threshold: f32,
    pub fallback_threshold: f32,
    pub fallback_top_n: usize,
}

impl From<&ModelConfig> for ResolverSettings {
    fn from(model: &ModelConfig) -> Self {
        Self {
            confidence_threshold: model.confidence_threshold,
            fallback_threshold: model.fallback_threshold,
            fallback_top_n: model.fallback_top_n,
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

pub struct IntentResolver {
    classifier: Option<Arc<dyn Classifier>>,
    bag: BagOfWords,
    tables: HashMap<String, IntentTable>,
    settings: ResolverSettings,
    telemetry: Arc<Telemetry>,
}

impl IntentResolver {
    /// Build a resolver from configuration: loads `model.json` from the
    /// models directory (degrading silently when absent) and one intent
    /// table per supported language.
    pub fn from_config(config: &EngineConfig, telemetry: Arc<Telemetry>) -> Self {
        let classifier: Option<Arc<dyn Classifier>> =
            match LinearClassifier::load_dir(&config.paths.models_dir) {
                Ok(c) => Some(Arc::new(c)),
                Err(e) => {
                    tracing::info!(error = %e, "No classifier bundle, lexical fallback only");
                    None
                }
            };
        let tables = table::load_tables(
            &config.paths.intents_dir,
            &config.model.supported_languages,
        );
        Self::new(tables, classifier, ResolverSettings::from(&config.model), telemetry)
    }

    pub fn new(
        tables: HashMap<String, IntentTable>,
        classifier: Option<Arc<dyn Classifier>>,
        settings: ResolverSettings,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        let bag = classifier
            .as_ref()
            .map(|c| BagOfWords::new(c.vocabulary().to_vec()))
            .unwrap_or_default();
        Self {
            classifier,
            bag,
            tables,
            settings,
            telemetry,
        }
    }

    pub fn settings(&self) -> ResolverSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: ResolverSettings) {
        self.settings = settings;
    }

    /// Whether the classifier path is usable.
    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some() && !self.bag.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.bag.len()
    }

    pub fn classes(&self) -> Vec<String> {
        self.classifier
            .as_ref()
            .map(|c| c.classes().to_vec())
            .unwrap_or_default()
    }

    pub fn table(&self, language: &str) -> Option<&IntentTable> {
        self.tables.get(language)
    }

    /// Languages with a loaded table, sorted.
    pub fn languages(&self) -> Vec<String> {
        let mut langs: Vec<String> = self.tables.keys().cloned().collect();
        langs.sort();
        langs
    }

    pub fn bag(&self) -> &BagOfWords {
        &self.bag
    }

    /// Ranked predictions only.
    pub fn predict(&self, utterance: &str, language: &str) -> Vec<IntentPrediction> {
        self.resolve(utterance, language).predictions
    }

    /// Ranked predictions plus which path ran and why the list is empty.
    pub fn resolve(&self, utterance: &str, language: &str) -> Resolution {
        if utterance.trim().is_empty() {
            let path = if self.has_classifier() {
                ResolutionPath::Classifier
            } else {
                ResolutionPath::Fallback
            };
            return Resolution::empty(path, ResolutionOutcome::EmptyInput);
        }

        if let Some(classifier) = self.classifier.as_ref().filter(|_| !self.bag.is_empty()) {
            match self.classify(&**classifier, utterance) {
                Ok(resolution) => return resolution,
                Err(reason) => {
                    tracing::warn!(error = %reason, "Classifier failed, using lexical fallback");
                    self.telemetry.record_degradation(Degradation::Classifier);
                }
            }
        }

        self.fallback(utterance, language)
    }

    fn classify(
        &self,
        classifier: &dyn Classifier,
        utterance: &str,
    ) -> Result<Resolution, colloquy_core::error::IntentError> {
        let features = self.bag.encode(utterance);
        let probabilities = classifier.predict(&features)?;
        let classes = classifier.classes();
        if probabilities.len() != classes.len() {
            return Err(colloquy_core::error::IntentError::ClassifierFailed(format!(
                "{} probabilities for {} classes",
                probabilities.len(),
                classes.len()
            )));
        }

        let candidates: Vec<IntentPrediction> = classes
            .iter()
            .zip(probabilities)
            .filter(|(_, p)| p.is_finite())
            .map(|(c, p)| IntentPrediction::new(c, p.clamp(0.0, 1.0)))
            .collect();

        Ok(rank(
            ResolutionPath::Classifier,
            candidates,
            self.settings.confidence_threshold,
            usize::MAX,
        ))
    }

    fn fallback(&self, utterance: &str, language: &str) -> Resolution {
        let Some(table) = self.tables.get(language) else {
            tracing::debug!(language, "No intent table for language");
            return Resolution::empty(ResolutionPath::Fallback, ResolutionOutcome::NoCandidates);
        };

        let candidates = fallback::score_intents(utterance, table);
        rank(
            ResolutionPath::Fallback,
            candidates,
            self.settings.fallback_threshold,
            self.settings.fallback_top_n,
        )
    }
}

/// Keep candidates strictly above `threshold`, stable-sort descending, cap.
fn rank(
    path: ResolutionPath,
    candidates: Vec<IntentPrediction>,
    threshold: f32,
    top_n: usize,
) -> Resolution {
    if candidates.is_empty() {
        return Resolution::empty(path, ResolutionOutcome::NoCandidates);
    }

    let mut kept: Vec<IntentPrediction> = candidates
        .into_iter()
        .filter(|p| p.probability > threshold)
        .collect();
    if kept.is_empty() {
        return Resolution::empty(path, ResolutionOutcome::BelowThreshold);
    }

    kept.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    kept.truncate(top_n);

    Resolution {
        path,
        outcome: ResolutionOutcome::Ranked,
        predictions: kept,
    }
}
