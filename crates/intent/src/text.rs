//! Text normalization, tokenization and a rule-based noun lemmatizer.

/// Lowercase and keep only alphanumerics and whitespace.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split normalized text into word tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Reduce a regular English plural to its singular form.
///
/// Words of three characters or fewer are returned unchanged, as are words
/// ending in `ss`, `us` or `is`.
pub fn lemmatize(word: &str) -> String {
    if word.chars().count() <= 3 {
        return word.to_string();
    }

    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }

    for suffix in ["ches", "shes", "ses", "xes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }

    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }

    match word.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => word.to_string(),
    }
}

/// Tokenize and lemmatize in one pass.
pub fn lemmas(text: &str) -> Vec<String> {
    tokenize(text).iter().map(|t| lemmatize(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation() {
        assert_eq!(normalize("¡Hola, Mundo!"), "hola mundo");
        assert_eq!(normalize("¿Qué tal?"), "qué tal");
        assert_eq!(normalize("..."), "");
    }

    #[test]
    fn tokenize_splits_on_whitespace() {
        assert_eq!(tokenize("  Buenos   días\t amigo "), vec!["buenos", "días", "amigo"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn lemmatize_plural_rules() {
        assert_eq!(lemmatize("stories"), "story");
        assert_eq!(lemmatize("boxes"), "box");
        assert_eq!(lemmatize("watches"), "watch");
        assert_eq!(lemmatize("dishes"), "dish");
        assert_eq!(lemmatize("buses"), "bus");
        assert_eq!(lemmatize("jokes"), "joke");
        assert_eq!(lemmatize("thanks"), "thank");
    }

    #[test]
    fn lemmatize_leaves_exceptions() {
        assert_eq!(lemmatize("class"), "class");
        assert_eq!(lemmatize("status"), "status");
        assert_eq!(lemmatize("analysis"), "analysis");
        assert_eq!(lemmatize("yes"), "yes");
        assert_eq!(lemmatize("hola"), "hola");
    }

    #[test]
    fn lemmas_pipeline() {
        assert_eq!(lemmas("Tell me some Jokes!"), vec!["tell", "me", "some", "joke"]);
    }
}
