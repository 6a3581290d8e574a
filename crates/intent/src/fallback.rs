//! Lexical-overlap intent scoring, used when no classifier is available.
//!
//! Each pattern scores 1.0 on an exact normalized match. Otherwise the score
//! is the share of the pattern's unique lemmas found in the utterance, plus
//! 0.2 when one normalized string contains the other and 0.1 when any
//! utterance word longer than three characters occurs inside the pattern.
//! An intent scores the best of its patterns, clamped to [0, 1].

use crate::text;
use colloquy_core::{IntentPrediction, IntentTable};
use std::collections::HashSet;

const CONTAINMENT_BONUS: f32 = 0.2;
const KEYWORD_BONUS: f32 = 0.1;
const KEYWORD_MIN_CHARS: usize = 3;

/// Score every intent with at least one usable pattern, in table order.
pub fn score_intents(utterance: &str, table: &IntentTable) -> Vec<IntentPrediction> {
    let message = text::normalize(utterance);
    let words: Vec<&str> = message.split_whitespace().collect();
    let message_lemmas: HashSet<String> = words.iter().map(|w| text::lemmatize(w)).collect();

    table
        .intents
        .iter()
        .filter_map(|intent| {
            intent
                .patterns
                .iter()
                .filter_map(|p| score_pattern(&message, &words, &message_lemmas, p))
                .reduce(f32::max)
                .map(|best| IntentPrediction::new(&intent.tag, best.clamp(0.0, 1.0)))
        })
        .collect()
}

/// Score one pattern. `None` when the pattern normalizes to nothing.
fn score_pattern(
    message: &str,
    words: &[&str],
    message_lemmas: &HashSet<String>,
    pattern: &str,
) -> Option<f32> {
    let normalized = text::normalize(pattern);
    let pattern_lemmas: HashSet<String> = normalized
        .split_whitespace()
        .map(text::lemmatize)
        .collect();
    if pattern_lemmas.is_empty() {
        return None;
    }

    // Compare whitespace-collapsed forms so spacing differences don't matter.
    let message_flat = words.join(" ");
    let pattern_flat = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
    if message_flat == pattern_flat {
        return Some(1.0);
    }

    let overlap = pattern_lemmas.intersection(message_lemmas).count();
    let mut score = overlap as f32 / pattern_lemmas.len() as f32;

    if !message.trim().is_empty()
        && (message_flat.contains(&pattern_flat) || pattern_flat.contains(&message_flat))
    {
        score += CONTAINMENT_BONUS;
    }

    if words
        .iter()
        .any(|w| w.chars().count() > KEYWORD_MIN_CHARS && pattern_flat.contains(w))
    {
        score += KEYWORD_BONUS;
    }

    Some(score.min(1.0))
}
