//! Keyword-based language detection between Spanish and English.

use crate::text;
use colloquy_core::LanguageDetector;

const SPANISH_KEYWORDS: &[&str] = &[
    "hola", "adiós", "adios", "gracias", "por", "favor", "qué", "que", "cómo", "como", "estás",
    "estas", "buenos", "buenas", "días", "dias", "tardes", "noches", "el", "la", "los", "las",
    "un", "una", "es", "son", "está", "yo", "tú", "tu", "usted", "mi", "me", "de", "del", "en",
    "con", "para", "pero", "sí", "si", "no", "bien", "muy", "quién", "quien", "dónde", "donde",
    "cuándo", "cuando", "porque", "eres", "soy", "nombre", "ayuda", "puedes", "cuéntame",
    "chiste", "hasta", "luego",
];

const ENGLISH_KEYWORDS: &[&str] = &[
    "hello", "hi", "hey", "bye", "goodbye", "thanks", "thank", "please", "what", "how", "are",
    "you", "good", "morning", "afternoon", "evening", "night", "the", "a", "an", "is", "am",
    "i", "my", "me", "of", "in", "with", "for", "but", "yes", "not", "well", "very", "who",
    "where", "when", "why", "because", "your", "name", "help", "can", "tell", "joke", "see",
    "later", "do", "does",
];

/// Characters that only occur in Spanish text.
const SPANISH_MARKS: &[char] = &['ñ', '¿', '¡', 'á', 'é', 'í', 'ó', 'ú'];

/// Scores keyword hits per language; ties and unsupported winners resolve
/// to the default language.
#[derive(Debug, Clone)]
pub struct KeywordDetector {
    default_language: String,
    supported: Vec<String>,
}

impl KeywordDetector {
    pub fn new(default_language: impl Into<String>, supported: Vec<String>) -> Self {
        Self {
            default_language: default_language.into(),
            supported,
        }
    }

    fn scores(text: &str) -> (usize, usize) {
        let tokens = text::tokenize(text);
        let mut es = tokens
            .iter()
            .filter(|t| SPANISH_KEYWORDS.contains(&t.as_str()))
            .count();
        let en = tokens
            .iter()
            .filter(|t| ENGLISH_KEYWORDS.contains(&t.as_str()))
            .count();
        if text.to_lowercase().chars().any(|c| SPANISH_MARKS.contains(&c)) {
            es += 1;
        }
        (es, en)
    }
}

impl LanguageDetector for KeywordDetector {
    fn detect(&self, text: &str) -> String {
        let (es, en) = Self::scores(text);
        let winner = match es.cmp(&en) {
            std::cmp::Ordering::Greater => "es",
            std::cmp::Ordering::Less => "en",
            std::cmp::Ordering::Equal => return self.default_language.clone(),
        };
        if self.supported.iter().any(|l| l == winner) {
            winner.to_string()
        } else {
            self.default_language.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> KeywordDetector {
        KeywordDetector::new("es", vec!["es".into(), "en".into()])
    }

    #[test]
    fn detects_spanish() {
        assert_eq!(detector().detect("Hola, ¿cómo estás?"), "es");
        assert_eq!(detector().detect("cuéntame un chiste"), "es");
    }

    #[test]
    fn detects_english() {
        assert_eq!(detector().detect("Hello, how are you?"), "en");
        assert_eq!(detector().detect("tell me a joke"), "en");
    }

    #[test]
    fn ties_use_default() {
        assert_eq!(detector().detect("xyz"), "es");
        let en_default = KeywordDetector::new("en", vec!["es".into(), "en".into()]);
        assert_eq!(en_default.detect("12345"), "en");
    }

    #[test]
    fn unsupported_winner_uses_default() {
        let es_only = KeywordDetector::new("es", vec!["es".into()]);
        assert_eq!(es_only.detect("hello how are you"), "es");
    }
}
