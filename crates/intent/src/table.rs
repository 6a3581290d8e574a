//! Intent table loading and pattern suggestions.

use crate::text;
use colloquy_core::IntentTable;
use colloquy_core::error::IntentError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Path of the table for `language` inside `intents_dir`.
pub fn table_path(intents_dir: &Path, language: &str) -> PathBuf {
    intents_dir.join(format!("intents_{language}.json"))
}

/// Load one intent table file.
pub fn load_table(path: &Path) -> Result<IntentTable, IntentError> {
    let content = std::fs::read_to_string(path).map_err(|e| IntentError::TableLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| IntentError::TableLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Load the table of every language that has one. Missing or invalid files
/// are logged and skipped.
pub fn load_tables(intents_dir: &Path, languages: &[String]) -> HashMap<String, IntentTable> {
    let mut tables = HashMap::new();
    for lang in languages {
        let path = table_path(intents_dir, lang);
        match load_table(&path) {
            Ok(table) => {
                tracing::info!(language = %lang, intents = table.len(), "Loaded intent table");
                tables.insert(lang.clone(), table);
            }
            Err(e) => {
                tracing::warn!(language = %lang, error = %e, "Skipping intent table");
            }
        }
    }
    tables
}

/// Up to `limit` patterns whose normalized form starts with or contains the
/// normalized partial text, in table order, without duplicates.
pub fn suggest(table: &IntentTable, partial: &str, limit: usize) -> Vec<String> {
    let needle = text::normalize(partial.trim());
    let needle = needle.trim();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut suggestions: Vec<String> = Vec::new();
    for pattern in table.intents.iter().flat_map(|i| &i.patterns) {
        if suggestions.len() >= limit {
            break;
        }
        if text::normalize(pattern).contains(needle) && !suggestions.contains(pattern) {
            suggestions.push(pattern.clone());
        }
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_core::IntentDefinition;

    #[test]
    fn load_tables_skips_missing_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            table_path(dir.path(), "es"),
            r#"{"intents":[{"tag":"saludo","patterns":["hola"],"responses":["¡Hola!"]}]}"#,
        )
        .unwrap();
        std::fs::write(table_path(dir.path(), "en"), "not json").unwrap();

        let tables = load_tables(
            dir.path(),
            &["es".to_string(), "en".to_string(), "fr".to_string()],
        );
        assert_eq!(tables.len(), 1);
        assert_eq!(tables["es"].intents[0].tag, "saludo");
    }

    #[test]
    fn load_table_error_names_path() {
        let err = load_table(Path::new("/nonexistent/intents_es.json")).unwrap_err();
        assert!(err.to_string().contains("intents_es.json"));
    }

    #[test]
    fn suggest_matches_prefix_and_substring() {
        let table = IntentTable::new(vec![
            IntentDefinition {
                tag: "saludo".into(),
                patterns: vec!["Hola".into(), "Hola, ¿qué tal?".into(), "Buenos días".into()],
                responses: vec![],
            },
            IntentDefinition {
                tag: "clima".into(),
                patterns: vec!["¿Qué tal el clima?".into()],
                responses: vec![],
            },
        ]);

        assert_eq!(suggest(&table, "hol", 5), vec!["Hola", "Hola, ¿qué tal?"]);
        assert_eq!(
            suggest(&table, "qué tal", 5),
            vec!["Hola, ¿qué tal?", "¿Qué tal el clima?"]
        );
        assert_eq!(suggest(&table, "o", 2).len(), 2);
        assert!(suggest(&table, "   ", 5).is_empty());
    }
}
