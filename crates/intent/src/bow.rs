//! Bag-of-words presence encoding over a fixed vocabulary.

use crate::text;
use std::collections::{HashMap, HashSet};

/// A fixed vocabulary of lemmas, in classifier input order.
#[derive(Debug, Clone, Default)]
pub struct BagOfWords {
    vocabulary: Vec<String>,
    index: HashMap<String, usize>,
}

impl BagOfWords {
    pub fn new(vocabulary: Vec<String>) -> Self {
        let index = vocabulary
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i))
            .collect();
        Self { vocabulary, index }
    }

    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Vocabulary slots hit by `utterance`.
    ///
    /// A token hits when either its surface form or its lemma is known, so
    /// words the plural rules mangle (`gracias`, `días`) still match.
    fn hits(&self, utterance: &str) -> HashSet<usize> {
        text::tokenize(utterance)
            .iter()
            .filter_map(|token| {
                self.index
                    .get(token.as_str())
                    .or_else(|| self.index.get(&text::lemmatize(token)))
                    .copied()
            })
            .collect()
    }

    /// 1.0 for every vocabulary word present in `utterance`, else 0.0.
    pub fn encode(&self, utterance: &str) -> Vec<f32> {
        let mut bag = vec![0.0f32; self.vocabulary.len()];
        for i in self.hits(utterance) {
            bag[i] = 1.0;
        }
        bag
    }

    /// Vocabulary words active for `utterance`, in vocabulary order.
    pub fn active_words(&self, utterance: &str) -> Vec<String> {
        let hits = self.hits(utterance);
        self.vocabulary
            .iter()
            .enumerate()
            .filter(|(i, _)| hits.contains(i))
            .map(|(_, w)| w.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag() -> BagOfWords {
        BagOfWords::new(vec!["hola".into(), "joke".into(), "adios".into()])
    }

    #[test]
    fn encode_marks_presence() {
        let v = bag().encode("Hola, tell me jokes");
        assert_eq!(v, vec![1.0, 1.0, 0.0]);
    }

    #[test]
    fn repeated_words_stay_binary() {
        let v = bag().encode("hola hola hola");
        assert_eq!(v, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn active_words_in_vocabulary_order() {
        assert_eq!(bag().active_words("adios y hola"), vec!["hola", "adios"]);
    }

    #[test]
    fn spanish_words_ending_in_s_match() {
        let bag = BagOfWords::new(vec![
            "gracias".into(),
            "adios".into(),
            "buenos".into(),
            "dias".into(),
        ]);
        assert_eq!(bag.encode("Gracias, adios! buenos dias"), vec![1.0; 4]);
        assert_eq!(bag.active_words("dias buenos"), vec!["buenos", "dias"]);
    }

    #[test]
    fn lemma_still_matches_when_surface_form_is_unknown() {
        let bag = BagOfWords::new(vec!["story".into()]);
        assert_eq!(bag.encode("stories"), vec![1.0]);
    }

    #[test]
    fn empty_vocabulary() {
        let empty = BagOfWords::default();
        assert!(empty.is_empty());
        assert!(empty.encode("hola").is_empty());
    }
}
