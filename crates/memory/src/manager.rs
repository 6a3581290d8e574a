//! Memory manager: owns memory events and answers similarity queries.
//!
//! Events and their embeddings live together in one `Vec<MemoryEvent>`, so
//! a purge can never leave an orphaned vector behind. The index is rebuilt
//! lazily: writes only mark it dirty and the next search rebuilds it.

use crate::embedding::{EmbeddingKind, Embeddings};
use crate::index::VectorIndex;
use crate::pii::PiiMasker;
use chrono::Utc;
use colloquy_config::{MemoryConfig, PrivacyConfig};
use colloquy_core::{MemoryEvent, MemoryFilter, MemoryHit, MemoryStatus};
use colloquy_telemetry::Telemetry;
use std::sync::Arc;

/// Name reported for the vector index backend.
const INDEX_PROVIDER: &str = "flat-cosine";

pub struct MemoryManager {
    enabled: bool,
    top_k_default: usize,
    masker: PiiMasker,
    embeddings: Embeddings,
    events: Vec<MemoryEvent>,
    index: VectorIndex,
    dirty: bool,
    next_id: u64,
}

impl MemoryManager {
    pub fn new(memory: &MemoryConfig, privacy: &PrivacyConfig, telemetry: Arc<Telemetry>) -> Self {
        let embeddings = Embeddings::from_config(&memory.embedding, telemetry);
        Self::with_embeddings(memory, privacy, embeddings)
    }

    /// Build with an explicit embedding provider.
    pub fn with_embeddings(
        memory: &MemoryConfig,
        privacy: &PrivacyConfig,
        embeddings: Embeddings,
    ) -> Self {
        Self {
            enabled: memory.enabled,
            top_k_default: memory.top_k,
            masker: PiiMasker::new(privacy.mask_emails, privacy.mask_phones),
            embeddings,
            events: Vec::new(),
            index: VectorIndex::new(),
            dirty: false,
            next_id: 1,
        }
    }

    /// Apply new settings. Stored events are kept.
    pub fn reconfigure(&mut self, memory: &MemoryConfig, privacy: &PrivacyConfig) {
        self.enabled = memory.enabled;
        self.top_k_default = memory.top_k;
        self.masker = PiiMasker::new(privacy.mask_emails, privacy.mask_phones);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[MemoryEvent] {
        &self.events
    }

    pub fn embedding_kind(&self) -> EmbeddingKind {
        self.embeddings.kind()
    }

    /// Store a new event. Returns its id, or `None` when memory is disabled.
    pub async fn add_event(
        &mut self,
        conversation_id: &str,
        user_id: &str,
        content: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Option<u64> {
        if !self.enabled {
            return None;
        }

        let content = self.masker.mask(content);

        if self.embeddings.kind() == EmbeddingKind::Sparse {
            let corpus: Vec<&str> = self
                .events
                .iter()
                .map(|e| e.content.as_str())
                .chain(std::iter::once(content.as_str()))
                .collect();
            self.embeddings.fit_corpus(&corpus);
        }
        let embedding = self.embeddings.encode(&content).await;
        let dims = embedding.len();

        let id = self.next_id;
        self.next_id += 1;
        self.events.push(MemoryEvent {
            id,
            conversation_id: conversation_id.to_string(),
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
            content,
            metadata,
            embedding,
        });
        self.dirty = true;

        tracing::debug!(id, conversation_id, dims, "Memory event added");
        Some(id)
    }

    /// The `top_k` events most similar to `query` (memory default when
    /// `None`), then narrowed by `filter`.
    pub async fn find_similar(
        &mut self,
        query: &str,
        top_k: Option<usize>,
        filter: &MemoryFilter,
    ) -> Vec<MemoryHit> {
        if !self.enabled || self.events.is_empty() {
            return Vec::new();
        }
        self.ensure_index();

        let k = top_k.unwrap_or(self.top_k_default);
        let q = self.embeddings.encode(query).await;

        self.index
            .search(&q, k)
            .into_iter()
            .filter_map(|(id, score)| {
                let event = self.events.iter().find(|e| e.id == id)?;
                if !filter.matches(&event.conversation_id, &event.user_id) {
                    return None;
                }
                Some(MemoryHit {
                    id: event.id,
                    content: event.content.clone(),
                    score: round6(score),
                    timestamp: event.timestamp,
                    conversation_id: event.conversation_id.clone(),
                    user_id: event.user_id.clone(),
                    metadata: event.metadata.clone(),
                })
            })
            .collect()
    }

    /// Remove every event of a conversation. Returns how many were removed.
    pub fn purge_conversation(&mut self, conversation_id: &str) -> usize {
        if !self.enabled {
            return 0;
        }
        let before = self.events.len();
        self.events.retain(|e| e.conversation_id != conversation_id);
        let purged = before - self.events.len();
        self.dirty = true;
        if purged > 0 {
            tracing::info!(conversation_id, purged, "Purged memory events");
        }
        purged
    }

    /// Force an index build now.
    pub fn rebuild_index(&mut self) {
        self.dirty = true;
        self.ensure_index();
    }

    fn ensure_index(&mut self) {
        if !self.dirty {
            return;
        }
        self.index
            .build(self.events.iter().map(|e| (e.id, e.embedding.as_slice())));
        self.dirty = false;
        tracing::debug!(
            rows = self.index.len(),
            width = self.index.width(),
            "Memory index rebuilt"
        );
    }

    pub fn status(&self) -> MemoryStatus {
        MemoryStatus {
            enabled: self.enabled,
            event_count: self.events.len(),
            provider: INDEX_PROVIDER.to_string(),
            embeddings: self.embeddings.kind().as_str().to_string(),
        }
    }
}

fn round6(x: f64) -> f64 {
    (x * 1e6).round() / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> MemoryManager {
        MemoryManager::new(
            &MemoryConfig::default(),
            &PrivacyConfig::default(),
            Arc::new(Telemetry::new()),
        )
    }

    fn no_meta() -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::new()
    }

    #[tokio::test]
    async fn empty_manager_finds_nothing() {
        let mut m = manager();
        assert!(m.find_similar("hola", None, &MemoryFilter::default()).await.is_empty());
    }

    #[tokio::test]
    async fn add_and_find() {
        let mut m = manager();
        let a = m.add_event("soporte", "juan", "El pedido 123 fue entregado", no_meta()).await;
        let b = m.add_event("ventas", "ana", "Precio del plan premium", no_meta()).await;
        assert_eq!(a, Some(1));
        assert_eq!(b, Some(2));

        let hits = m.find_similar("pedido entregado", Some(2), &MemoryFilter::default()).await;
        assert_eq!(hits[0].id, 1);
        assert!(hits[0].score > 0.0);
        for w in hits.windows(2) {
            assert!(w[0].score >= w[1].score);
        }
    }

    #[tokio::test]
    async fn filter_applies_after_retrieval() {
        let mut m = manager();
        m.add_event("soporte", "juan", "pedido entregado hoy", no_meta()).await;
        m.add_event("ventas", "ana", "pedido cancelado ayer", no_meta()).await;

        let hits = m
            .find_similar("pedido", Some(5), &MemoryFilter::conversation("ventas"))
            .await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].conversation_id, "ventas");
    }

    #[tokio::test]
    async fn rebuild_index_tracks_events() {
        let mut m = manager();
        m.add_event("c1", "u", "primer evento de prueba", no_meta()).await;
        m.add_event("c2", "u", "segundo evento de prueba", no_meta()).await;
        assert!(m.dirty);

        m.rebuild_index();
        assert!(!m.dirty);
        assert_eq!(m.index.len(), 2);

        m.purge_conversation("c1");
        m.rebuild_index();
        assert_eq!(m.index.len(), 1);
        let hits = m.find_similar("evento", None, &MemoryFilter::default()).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].conversation_id, "c2");
    }

    #[tokio::test]
    async fn purge_then_search_is_empty() {
        let mut m = manager();
        m.add_event("c1", "u", "primer evento de prueba", no_meta()).await;
        m.add_event("c1", "u", "segundo evento de prueba", no_meta()).await;
        assert_eq!(m.purge_conversation("c1"), 2);
        assert!(m.is_empty());
        let hits = m
            .find_similar("evento", None, &MemoryFilter::conversation("c1"))
            .await;
        assert!(hits.is_empty());
        assert_eq!(m.purge_conversation("c1"), 0);
    }

    #[tokio::test]
    async fn ids_never_reused_after_purge() {
        let mut m = manager();
        m.add_event("c1", "u", "uno", no_meta()).await;
        m.purge_conversation("c1");
        let id = m.add_event("c1", "u", "dos", no_meta()).await;
        assert_eq!(id, Some(2));
    }

    #[tokio::test]
    async fn masks_emails_when_enabled() {
        let privacy = PrivacyConfig {
            mask_emails: true,
            mask_phones: false,
        };
        let mut m =
            MemoryManager::new(&MemoryConfig::default(), &privacy, Arc::new(Telemetry::new()));
        m.add_event("c", "u", "contact me at a@b.com", no_meta()).await;
        assert_eq!(m.events()[0].content, "contact me at [email]");

        let hits = m.find_similar("contact me", None, &MemoryFilter::default()).await;
        assert!(hits[0].content.contains("[email]"));
        assert!(!hits[0].content.contains("a@b.com"));
    }

    #[tokio::test]
    async fn disabled_memory_has_no_side_effects() {
        let memory = MemoryConfig {
            enabled: false,
            ..MemoryConfig::default()
        };
        let mut m =
            MemoryManager::new(&memory, &PrivacyConfig::default(), Arc::new(Telemetry::new()));
        assert_eq!(m.add_event("c", "u", "hola", no_meta()).await, None);
        assert!(m.is_empty());
        assert!(m.find_similar("hola", None, &MemoryFilter::default()).await.is_empty());
        assert_eq!(m.purge_conversation("c"), 0);
        assert!(!m.status().enabled);
    }

    #[tokio::test]
    async fn zero_embeddings_yield_no_ranking() {
        let mut memory = MemoryConfig::default();
        memory.embedding.provider = "none".into();
        let mut m =
            MemoryManager::new(&memory, &PrivacyConfig::default(), Arc::new(Telemetry::new()));
        assert_eq!(m.add_event("c", "u", "hola", no_meta()).await, Some(1));
        assert!(m.find_similar("hola", None, &MemoryFilter::default()).await.is_empty());
        assert_eq!(m.status().embeddings, "none");
    }

    #[tokio::test]
    async fn status_reports_counts() {
        let mut m = manager();
        m.add_event("c", "u", "hola mundo", no_meta()).await;
        let status = m.status();
        assert!(status.enabled);
        assert_eq!(status.event_count, 1);
        assert_eq!(status.embeddings, "sparse");
        assert_eq!(status.provider, INDEX_PROVIDER);
    }

    #[tokio::test]
    async fn metadata_round_trips_to_hits() {
        let mut m = manager();
        let mut meta = no_meta();
        meta.insert("canal".into(), serde_json::json!("web"));
        m.add_event("c", "u", "pedido entregado", meta).await;
        let hits = m.find_similar("pedido", None, &MemoryFilter::default()).await;
        assert_eq!(hits[0].metadata["canal"], "web");
    }

    #[test]
    fn rounding() {
        assert_eq!(round6(0.123_456_789), 0.123_457);
    }
}
