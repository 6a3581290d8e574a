//! Embedding providers: dense, sparse TF-IDF, or a single zero.
//!
//! The dense path calls a remote sentence embedder. The sparse path is a
//! TF-IDF vectorizer fitted over the observed event corpus; its vocabulary
//! only ever grows, so vectors produced before a refit stay comparable
//! after zero-padding. The zero path yields `[0.0]` for every text.

use crate::http_embedder::HttpEmbedder;
use crate::vector;
use colloquy_config::EmbeddingConfig;
use colloquy_core::DenseEmbedder;
use colloquy_telemetry::{Degradation, Telemetry};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid token pattern"));

/// Which embedding path is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingKind {
    Dense,
    Sparse,
    Zero,
}

impl EmbeddingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dense => "dense",
            Self::Sparse => "sparse",
            Self::Zero => "none",
        }
    }
}

/// Lowercased word tokens of two or more characters.
fn tokens(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// TF-IDF vectorizer with an append-only vocabulary.
///
/// Uses smooth idf, `ln((1 + n) / (1 + df)) + 1`, and L2-normalized output.
#[derive(Debug, Clone)]
pub struct SparseVectorizer {
    max_features: usize,
    vocabulary: Vec<String>,
    index: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl SparseVectorizer {
    pub fn new(max_features: usize) -> Self {
        Self {
            max_features,
            vocabulary: Vec::new(),
            index: HashMap::new(),
            idf: Vec::new(),
        }
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Refit over the full corpus: add unseen terms (most frequent first,
    /// while room remains) and recompute idf for the whole vocabulary.
    pub fn fit<S: AsRef<str>>(&mut self, corpus: &[S]) {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut term_freq: HashMap<String, usize> = HashMap::new();

        for doc in corpus {
            let toks = tokens(doc.as_ref());
            for t in &toks {
                *term_freq.entry(t.clone()).or_insert(0) += 1;
            }
            let mut seen: Vec<&String> = toks.iter().collect();
            seen.sort();
            seen.dedup();
            for t in seen {
                *doc_freq.entry(t.clone()).or_insert(0) += 1;
            }
        }

        let room = self.max_features.saturating_sub(self.vocabulary.len());
        if room > 0 {
            let mut fresh: Vec<(&String, usize)> = term_freq
                .iter()
                .filter(|(t, _)| !self.index.contains_key(*t))
                .map(|(t, f)| (t, *f))
                .collect();
            fresh.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            for (term, _) in fresh.into_iter().take(room) {
                self.index.insert(term.clone(), self.vocabulary.len());
                self.vocabulary.push(term.clone());
            }
        }

        let n = corpus.len() as f64;
        self.idf = self
            .vocabulary
            .iter()
            .map(|t| {
                let df = doc_freq.get(t).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();
    }

    /// Encode one text over the current vocabulary.
    pub fn transform(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.vocabulary.len()];
        for t in tokens(text) {
            if let Some(&i) = self.index.get(&t) {
                v[i] += 1.0;
            }
        }
        for (x, idf) in v.iter_mut().zip(&self.idf) {
            *x = (*x as f64 * idf) as f32;
        }
        vector::normalize(&mut v);
        v
    }
}

/// The embedding provider used by the memory manager.
pub struct Embeddings {
    kind: EmbeddingKind,
    dense: Option<Arc<dyn DenseEmbedder>>,
    sparse: SparseVectorizer,
    telemetry: Arc<Telemetry>,
}

impl Embeddings {
    /// Pick a provider from configuration.
    ///
    /// `auto` prefers dense when an API URL is configured. A dense provider
    /// that cannot be constructed degrades to sparse.
    pub fn from_config(config: &EmbeddingConfig, telemetry: Arc<Telemetry>) -> Self {
        let want_dense = match config.provider.as_str() {
            "none" => return Self::zero(telemetry),
            "sparse" => false,
            "dense" => true,
            _ => config.api_url.is_some(),
        };

        if want_dense {
            let built = match &config.api_url {
                Some(url) => HttpEmbedder::new(
                    url.clone(),
                    config.model.clone(),
                    config.api_key.clone(),
                    config.timeout_secs,
                ),
                None => Err(colloquy_core::error::MemoryError::EmbeddingUnavailable(
                    "no embedding api_url configured".into(),
                )),
            };
            match built {
                Ok(embedder) => {
                    tracing::info!(model = %config.model, "Using dense embeddings");
                    return Self::dense(Arc::new(embedder), config.max_features, telemetry);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Dense embeddings unavailable, using TF-IDF");
                }
            }
        }

        Self::sparse(config.max_features, telemetry)
    }

    pub fn dense(
        embedder: Arc<dyn DenseEmbedder>,
        max_features: usize,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            kind: EmbeddingKind::Dense,
            dense: Some(embedder),
            sparse: SparseVectorizer::new(max_features),
            telemetry,
        }
    }

    pub fn sparse(max_features: usize, telemetry: Arc<Telemetry>) -> Self {
        Self {
            kind: EmbeddingKind::Sparse,
            dense: None,
            sparse: SparseVectorizer::new(max_features),
            telemetry,
        }
    }

    pub fn zero(telemetry: Arc<Telemetry>) -> Self {
        Self {
            kind: EmbeddingKind::Zero,
            dense: None,
            sparse: SparseVectorizer::new(0),
            telemetry,
        }
    }

    pub fn kind(&self) -> EmbeddingKind {
        self.kind
    }

    /// Refit the sparse vectorizer over the corpus. No-op otherwise.
    pub fn fit_corpus<S: AsRef<str>>(&mut self, corpus: &[S]) {
        if self.kind == EmbeddingKind::Sparse {
            self.sparse.fit(corpus);
        }
    }

    /// Embed one text. Never fails: a dense error yields `[0.0]`.
    pub async fn encode(&self, text: &str) -> Vec<f32> {
        match (self.kind, &self.dense) {
            (EmbeddingKind::Dense, Some(dense)) => match dense.embed(text).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(embedder = dense.name(), error = %e, "Dense embedding failed");
                    self.telemetry.record_degradation(Degradation::Embedding);
                    vec![0.0]
                }
            },
            (EmbeddingKind::Sparse, _) => self.sparse.transform(text),
            _ => vec![0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use colloquy_core::error::MemoryError;

    #[test]
    fn tokens_skip_single_chars() {
        assert_eq!(tokens("El pedido 1 a B2"), vec!["el", "pedido", "b2"]);
    }

    #[test]
    fn sparse_fit_and_transform() {
        let mut v = SparseVectorizer::new(2048);
        v.fit(&["el pedido fue entregado", "el pedido fue cancelado"]);
        assert_eq!(v.vocabulary_len(), 5);

        let a = v.transform("pedido entregado");
        let b = v.transform("pedido cancelado");
        assert!((vector::l2_norm(&a) - 1.0).abs() < 1e-6);
        // Shared rare term dominates
        let same = vector::cosine_similarity(&a, &v.transform("entregado"));
        let other = vector::cosine_similarity(&a, &b);
        assert!(same > other);
    }

    #[test]
    fn vocabulary_is_append_only() {
        let mut v = SparseVectorizer::new(2048);
        v.fit(&["hola mundo"]);
        let before = v.transform("hola");
        v.fit(&["hola mundo", "adios amigos"]);
        let after = v.transform("hola");
        assert_eq!(v.vocabulary_len(), 4);
        // "hola" keeps its column
        let col = before.iter().position(|x| *x > 0.0).unwrap();
        assert!(after[col] > 0.0);
    }

    #[test]
    fn max_features_caps_vocabulary() {
        let mut v = SparseVectorizer::new(2);
        v.fit(&["uno uno uno dos dos tres"]);
        assert_eq!(v.vocabulary_len(), 2);
        assert!(vector::is_zero(&v.transform("tres")));
    }

    #[test]
    fn unfitted_transform_is_empty() {
        let v = SparseVectorizer::new(2048);
        assert!(v.transform("hola").is_empty());
    }

    struct FailingEmbedder;

    #[async_trait]
    impl DenseEmbedder for FailingEmbedder {
        fn name(&self) -> &str {
            "failing"
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
            Err(MemoryError::EmbeddingFailed("down".into()))
        }
    }

    #[tokio::test]
    async fn dense_failure_yields_zero_vector() {
        let telemetry = Arc::new(Telemetry::new());
        let e = Embeddings::dense(Arc::new(FailingEmbedder), 2048, Arc::clone(&telemetry));
        assert_eq!(e.encode("hola").await, vec![0.0]);
        assert_eq!(telemetry.snapshot().embedding_degradations, 1);
    }

    #[tokio::test]
    async fn zero_provider() {
        let e = Embeddings::zero(Arc::new(Telemetry::new()));
        assert_eq!(e.kind().as_str(), "none");
        assert_eq!(e.encode("hola").await, vec![0.0]);
    }

    #[test]
    fn config_selection() {
        let telemetry = Arc::new(Telemetry::new());
        let mut config = EmbeddingConfig::default();
        assert_eq!(
            Embeddings::from_config(&config, Arc::clone(&telemetry)).kind(),
            EmbeddingKind::Sparse
        );

        config.provider = "dense".into();
        assert_eq!(
            Embeddings::from_config(&config, Arc::clone(&telemetry)).kind(),
            EmbeddingKind::Sparse
        );

        config.api_url = Some("http://localhost:11434/v1".into());
        assert_eq!(
            Embeddings::from_config(&config, Arc::clone(&telemetry)).kind(),
            EmbeddingKind::Dense
        );

        config.provider = "none".into();
        assert_eq!(
            Embeddings::from_config(&config, telemetry).kind(),
            EmbeddingKind::Zero
        );
    }
}
