//! Long-term memory types: events, search hits, and the dense embedder seam.
//!
//! Memory events are append-only records of things worth remembering across
//! conversations. They are searched by semantic similarity of their
//! embeddings and removed only by purging a whole conversation.

use crate::error::MemoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single stored memory event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEvent {
    /// Monotonic id, never reused
    pub id: u64,

    pub conversation_id: String,

    pub user_id: String,

    pub timestamp: DateTime<Utc>,

    /// Content after PII masking
    pub content: String,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// Embedding vector (kept out of serialized output)
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

/// One similarity search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryHit {
    pub id: u64,
    pub content: String,
    /// Cosine similarity, rounded to 6 decimals
    pub score: f64,
    pub timestamp: DateTime<Utc>,
    pub conversation_id: String,
    pub user_id: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Post-retrieval filter for similarity search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl MemoryFilter {
    pub fn conversation(id: impl Into<String>) -> Self {
        Self {
            conversation_id: Some(id.into()),
            user_id: None,
        }
    }

    /// Whether an event passes this filter.
    pub fn matches(&self, conversation_id: &str, user_id: &str) -> bool {
        self.conversation_id
            .as_deref()
            .is_none_or(|c| c == conversation_id)
            && self.user_id.as_deref().is_none_or(|u| u == user_id)
    }
}

/// Snapshot of the memory subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStatus {
    pub enabled: bool,

    #[serde(rename = "events")]
    pub event_count: usize,

    /// Vector index backend
    pub provider: String,

    /// Which embedding path is actually in use ("dense", "sparse", "none")
    pub embeddings: String,
}

/// A dense sentence embedder (typically a remote model).
#[async_trait]
pub trait DenseEmbedder: Send + Sync {
    fn name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, MemoryError>;
}
