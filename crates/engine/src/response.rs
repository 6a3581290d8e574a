//! Response selection with per-intent anti-repetition, plus the canned
//! fallback messages.

use colloquy_core::{ConversationTurn, FallbackReason, IntentTable};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use std::collections::HashMap;

/// Messages for one locale, indexed by `FallbackReason`.
struct FallbackTexts {
    empty_message: &'static str,
    no_prediction: &'static str,
    low_confidence: &'static str,
    unknown_intent: &'static str,
    error: &'static str,
}

impl FallbackTexts {
    fn get(&self, reason: FallbackReason) -> &'static str {
        match reason {
            FallbackReason::EmptyMessage => self.empty_message,
            FallbackReason::NoPrediction => self.no_prediction,
            FallbackReason::LowConfidence => self.low_confidence,
            FallbackReason::UnknownIntent => self.unknown_intent,
            FallbackReason::Error => self.error,
        }
    }
}

static ES: FallbackTexts = FallbackTexts {
    empty_message: "No he recibido ningún mensaje. ¿Podrías escribir algo?",
    no_prediction: "No he podido procesar tu mensaje. ¿Podrías reformularlo?",
    low_confidence: "No estoy segura de cómo responder a eso. ¿Podrías ser más específico?",
    unknown_intent: "Interesante... aún estoy aprendiendo sobre eso. ¿Podrías ayudarme con más contexto?",
    error: "Disculpa, he tenido un problema técnico. ¿Podrías intentar de nuevo?",
};

static EN: FallbackTexts = FallbackTexts {
    empty_message: "I didn't receive any message. Could you write something?",
    no_prediction: "I couldn't process your message. Could you rephrase it?",
    low_confidence: "I'm not sure how to respond to that. Could you be more specific?",
    unknown_intent: "Interesting... I'm still learning about that. Could you give me more context?",
    error: "Sorry, I had a technical problem. Could you try again?",
};

fn texts_for(language: &str) -> Option<&'static FallbackTexts> {
    match language {
        "es" => Some(&ES),
        "en" => Some(&EN),
        _ => None,
    }
}

pub struct ResponseSelector {
    default_language: String,
    rng: StdRng,
    last_responses: HashMap<String, String>,
}

impl ResponseSelector {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self::with_rng(default_language, StdRng::from_os_rng())
    }

    /// Deterministic selection, for tests and reproducible sessions.
    pub fn with_seed(default_language: impl Into<String>, seed: u64) -> Self {
        Self::with_rng(default_language, StdRng::seed_from_u64(seed))
    }

    fn with_rng(default_language: impl Into<String>, rng: StdRng) -> Self {
        Self {
            default_language: default_language.into(),
            rng,
            last_responses: HashMap::new(),
        }
    }

    pub fn set_default_language(&mut self, language: impl Into<String>) {
        self.default_language = language.into();
    }

    /// The canned message for `reason` in `language`. Unknown locales use
    /// the default language, then Spanish.
    pub fn fallback(&self, reason: FallbackReason, language: &str) -> &'static str {
        texts_for(language)
            .or_else(|| texts_for(&self.default_language))
            .unwrap_or(&ES)
            .get(reason)
    }

    /// Pick a response for `intent` from `table`.
    ///
    /// With two or more alternatives the text used last time for this
    /// intent is excluded. "Last time" comes from this selector's own
    /// memory, or failing that from the most recent matching turn in
    /// `recent`.
    pub fn select(
        &mut self,
        intent: &str,
        language: &str,
        table: Option<&IntentTable>,
        recent: &[ConversationTurn],
    ) -> String {
        let responses = table
            .and_then(|t| t.find(intent))
            .map(|def| def.responses.as_slice())
            .unwrap_or_default();

        let nonempty: Vec<&String> = responses.iter().filter(|r| !r.trim().is_empty()).collect();
        if nonempty.is_empty() {
            return self.fallback(FallbackReason::UnknownIntent, language).to_string();
        }

        let previous = self.last_responses.get(intent).cloned().or_else(|| {
            recent
                .iter()
                .rev()
                .find(|t| t.intent.as_deref() == Some(intent))
                .map(|t| t.bot_response.clone())
        });

        let mut candidates = nonempty.clone();
        if candidates.len() > 1
            && let Some(prev) = &previous
        {
            candidates.retain(|r| *r != prev);
            if candidates.is_empty() {
                candidates = nonempty;
            }
        }

        let chosen = candidates
            .choose(&mut self.rng)
            .map(|s| (*s).clone())
            .unwrap_or_else(|| self.fallback(FallbackReason::UnknownIntent, language).to_string());

        self.last_responses
            .insert(intent.to_string(), chosen.clone());
        chosen
    }

    /// Forget which responses were used last.
    pub fn reset(&mut self) {
        self.last_responses.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_core::IntentDefinition;

    fn table() -> IntentTable {
        IntentTable::new(vec![
            IntentDefinition {
                tag: "saludo".into(),
                patterns: vec!["hola".into()],
                responses: vec!["¡Hola!".into(), "¡Buenas!".into(), "¿Qué tal?".into()],
            },
            IntentDefinition {
                tag: "despedida".into(),
                patterns: vec!["adiós".into()],
                responses: vec!["Hasta luego".into()],
            },
            IntentDefinition {
                tag: "vacio".into(),
                patterns: vec!["nada".into()],
                responses: vec![],
            },
        ])
    }

    #[test]
    fn never_repeats_consecutively() {
        let table = table();
        let mut selector = ResponseSelector::with_seed("es", 7);
        let mut previous = selector.select("saludo", "es", Some(&table), &[]);
        for _ in 0..50 {
            let next = selector.select("saludo", "es", Some(&table), &[]);
            assert_ne!(next, previous);
            previous = next;
        }
    }

    #[test]
    fn single_response_repeats() {
        let table = table();
        let mut selector = ResponseSelector::with_seed("es", 1);
        assert_eq!(selector.select("despedida", "es", Some(&table), &[]), "Hasta luego");
        assert_eq!(selector.select("despedida", "es", Some(&table), &[]), "Hasta luego");
    }

    #[test]
    fn recent_turns_seed_anti_repetition() {
        let table = table();
        let recent = vec![ConversationTurn::new(
            "hola",
            "¡Hola!",
            Some("saludo".into()),
            0.9,
            "es",
        )];
        for seed in 0..20 {
            let mut selector = ResponseSelector::with_seed("es", seed);
            assert_ne!(selector.select("saludo", "es", Some(&table), &recent), "¡Hola!");
        }
    }

    #[test]
    fn unknown_or_empty_intent_uses_fallback() {
        let table = table();
        let mut selector = ResponseSelector::with_seed("es", 1);
        let expected = selector.fallback(FallbackReason::UnknownIntent, "es");
        assert_eq!(selector.select("clima", "es", Some(&table), &[]), expected);
        assert_eq!(selector.select("vacio", "es", Some(&table), &[]), expected);
        assert_eq!(selector.select("saludo", "es", None, &[]), expected);
    }

    #[test]
    fn fallback_locales() {
        let selector = ResponseSelector::with_seed("en", 1);
        assert_eq!(
            selector.fallback(FallbackReason::EmptyMessage, "es"),
            "No he recibido ningún mensaje. ¿Podrías escribir algo?"
        );
        assert_eq!(
            selector.fallback(FallbackReason::LowConfidence, "en"),
            "I'm not sure how to respond to that. Could you be more specific?"
        );
        // Unknown locale → default language
        assert_eq!(
            selector.fallback(FallbackReason::Error, "fr"),
            "Sorry, I had a technical problem. Could you try again?"
        );

        let selector = ResponseSelector::with_seed("de", 1);
        assert_eq!(
            selector.fallback(FallbackReason::NoPrediction, "fr"),
            "No he podido procesar tu mensaje. ¿Podrías reformularlo?"
        );
    }

    #[test]
    fn every_reason_has_text() {
        let selector = ResponseSelector::with_seed("es", 1);
        for reason in FallbackReason::ALL {
            for lang in ["es", "en", "xx"] {
                assert!(!selector.fallback(reason, lang).is_empty());
            }
        }
    }
}
