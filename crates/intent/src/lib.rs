//! # Colloquy Intent
//!
//! Turns an utterance into ranked `(intent, confidence)` pairs.
//!
//! The primary path encodes the utterance as a bag-of-words over the
//! classifier's vocabulary and runs a trained [`Classifier`]. Without a
//! usable classifier, a lexical-overlap scorer over the language's intent
//! table takes over.
//!
//! [`Classifier`]: colloquy_core::Classifier

pub mod bow;
pub mod classifier;
pub mod fallback;
pub mod language;
pub mod resolver;
pub mod table;
pub mod text;

pub use bow::BagOfWords;
pub use classifier::LinearClassifier;
pub use language::KeywordDetector;
pub use resolver::{
    IntentResolver, Resolution, ResolutionOutcome, ResolutionPath, ResolverSettings,
};
