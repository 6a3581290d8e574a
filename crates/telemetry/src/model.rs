//! Data model for turn outcomes, turn records, and metric snapshots.

use chrono::{DateTime, Utc};
use colloquy_core::FallbackReason;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Outcome ───────────────────────────────────────────────────────────────

/// How a single turn was answered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum TurnOutcome {
    /// A plugin handled the message.
    Plugin,
    /// The message was an `!api` command.
    Service,
    /// The message was a `!mem` command.
    MemoryCommand,
    /// An intent response was selected.
    Intent,
    /// A canned fallback message was returned.
    Fallback(FallbackReason),
}

impl TurnOutcome {
    /// Stable label used as a metrics key (e.g. `fallback:low_confidence`).
    pub fn label(&self) -> String {
        match self {
            Self::Plugin => "plugin".into(),
            Self::Service => "service".into(),
            Self::MemoryCommand => "memory_command".into(),
            Self::Intent => "intent".into(),
            Self::Fallback(reason) => format!("fallback:{reason}"),
        }
    }
}

impl std::fmt::Display for TurnOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

// ── Degradations ──────────────────────────────────────────────────────────

/// A failure that was absorbed instead of surfacing to the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// The classifier path failed and the lexical fallback ran.
    Classifier,
    /// A plugin returned an error or panicked.
    Plugin,
    /// A service call failed, timed out, or was unknown.
    Service,
    /// A dense embedding call failed and the zero vector was used.
    Embedding,
    /// A turn could not be persisted.
    Persistence,
}

// ── Turn record ───────────────────────────────────────────────────────────

/// One recorded turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub outcome: TurnOutcome,
    /// Resolved intent, when the outcome is `Intent`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    pub language: String,
    pub latency_ms: u64,
    pub at: DateTime<Utc>,
}

// ── Snapshot ──────────────────────────────────────────────────────────────

/// A point-in-time metrics snapshot (for `stats` and `colloquy status`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetricsSnapshot {
    /// Total turns processed.
    pub total_turns: u64,
    /// Turns by outcome label.
    pub turns_by_outcome: BTreeMap<String, u64>,
    /// Classifier path failures that degraded to the fallback.
    pub classifier_degradations: u64,
    pub plugin_failures: u64,
    pub service_failures: u64,
    pub embedding_degradations: u64,
    pub persistence_failures: u64,
    /// Sum of all turn latencies.
    pub total_latency_ms: u64,
    /// Mean turn latency (0 when no turns).
    pub avg_latency_ms: f64,
    /// When counting started (creation or last reset).
    pub since: Option<DateTime<Utc>>,
}

impl MetricsSnapshot {
    /// Count for one outcome (0 when never seen).
    pub fn outcome_count(&self, outcome: TurnOutcome) -> u64 {
        self.turns_by_outcome
            .get(&outcome.label())
            .copied()
            .unwrap_or(0)
    }
}
