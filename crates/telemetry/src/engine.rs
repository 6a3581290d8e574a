//! Thread-safe telemetry handle: counts turns by outcome, absorbed
//! failures, and latency, and keeps a bounded log of recent turns.

use crate::model::*;
use chrono::Utc;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Recent turn records kept for inspection.
const MAX_RECORDS: usize = 1_000;

/// The telemetry handle.
///
/// Thread-safe via `RwLock`. Constructed once and shared as
/// `Arc<Telemetry>` by every component that reports into it.
#[derive(Debug)]
pub struct Telemetry {
    /// Running counters.
    counters: RwLock<Counters>,
    /// Most recent turns (oldest first).
    records: RwLock<VecDeque<TurnRecord>>,
}

#[derive(Debug)]
struct Counters {
    total_turns: u64,
    by_outcome: BTreeMap<String, u64>,
    classifier_degradations: u64,
    plugin_failures: u64,
    service_failures: u64,
    embedding_degradations: u64,
    persistence_failures: u64,
    total_latency_ms: u64,
    since: chrono::DateTime<Utc>,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            total_turns: 0,
            by_outcome: BTreeMap::new(),
            classifier_degradations: 0,
            plugin_failures: 0,
            service_failures: 0,
            embedding_degradations: 0,
            persistence_failures: 0,
            total_latency_ms: 0,
            since: Utc::now(),
        }
    }
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(Counters::default()),
            records: RwLock::new(VecDeque::new()),
        }
    }

    // A poisoned lock only means a reporter panicked mid-update; the
    // counters are still usable.
    fn read_counters(&self) -> RwLockReadGuard<'_, Counters> {
        self.counters.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_counters(&self) -> RwLockWriteGuard<'_, Counters> {
        self.counters.write().unwrap_or_else(|e| e.into_inner())
    }

    // ── Recording ─────────────────────────────────────────────────────

    /// Record a finished turn.
    pub fn record_turn(
        &self,
        outcome: TurnOutcome,
        intent: Option<&str>,
        language: &str,
        latency_ms: u64,
    ) {
        {
            let mut counters = self.write_counters();
            counters.total_turns += 1;
            *counters.by_outcome.entry(outcome.label()).or_insert(0) += 1;
            counters.total_latency_ms += latency_ms;
        }

        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        if records.len() >= MAX_RECORDS {
            records.pop_front();
        }
        records.push_back(TurnRecord {
            outcome,
            intent: intent.map(str::to_string),
            language: language.to_string(),
            latency_ms,
            at: Utc::now(),
        });

        tracing::debug!(
            outcome = %outcome,
            intent = intent.unwrap_or("-"),
            language,
            latency_ms,
            "Turn recorded"
        );
    }

    /// Record an absorbed failure.
    pub fn record_degradation(&self, kind: Degradation) {
        let mut counters = self.write_counters();
        match kind {
            Degradation::Classifier => counters.classifier_degradations += 1,
            Degradation::Plugin => counters.plugin_failures += 1,
            Degradation::Service => counters.service_failures += 1,
            Degradation::Embedding => counters.embedding_degradations += 1,
            Degradation::Persistence => counters.persistence_failures += 1,
        }
    }

    // ── Queries ───────────────────────────────────────────────────────

    /// The last `limit` turns, most recent last.
    pub fn recent_turns(&self, limit: usize) -> Vec<TurnRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let skip = records.len().saturating_sub(limit);
        records.iter().skip(skip).cloned().collect()
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.read_counters();
        let avg_latency_ms = if counters.total_turns == 0 {
            0.0
        } else {
            counters.total_latency_ms as f64 / counters.total_turns as f64
        };

        MetricsSnapshot {
            total_turns: counters.total_turns,
            turns_by_outcome: counters.by_outcome.clone(),
            classifier_degradations: counters.classifier_degradations,
            plugin_failures: counters.plugin_failures,
            service_failures: counters.service_failures,
            embedding_degradations: counters.embedding_degradations,
            persistence_failures: counters.persistence_failures,
            total_latency_ms: counters.total_latency_ms,
            avg_latency_ms,
            since: Some(counters.since),
        }
    }

    /// Zero every counter and drop the turn log.
    pub fn reset(&self) {
        *self.write_counters() = Counters::default();
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_core::FallbackReason;
    use std::sync::Arc;

    #[test]
    fn record_turn_updates_counters() {
        let telemetry = Telemetry::new();
        telemetry.record_turn(TurnOutcome::Intent, Some("saludo"), "es", 10);
        telemetry.record_turn(TurnOutcome::Intent, Some("despedida"), "es", 20);
        telemetry.record_turn(
            TurnOutcome::Fallback(FallbackReason::LowConfidence),
            None,
            "en",
            30,
        );

        let snap = telemetry.snapshot();
        assert_eq!(snap.total_turns, 3);
        assert_eq!(snap.outcome_count(TurnOutcome::Intent), 2);
        assert_eq!(
            snap.outcome_count(TurnOutcome::Fallback(FallbackReason::LowConfidence)),
            1
        );
        assert_eq!(snap.total_latency_ms, 60);
        assert!((snap.avg_latency_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn degradations_are_counted_separately() {
        let telemetry = Telemetry::new();
        telemetry.record_degradation(Degradation::Plugin);
        telemetry.record_degradation(Degradation::Plugin);
        telemetry.record_degradation(Degradation::Service);
        telemetry.record_degradation(Degradation::Classifier);
        telemetry.record_degradation(Degradation::Embedding);
        telemetry.record_degradation(Degradation::Persistence);

        let snap = telemetry.snapshot();
        assert_eq!(snap.plugin_failures, 2);
        assert_eq!(snap.service_failures, 1);
        assert_eq!(snap.classifier_degradations, 1);
        assert_eq!(snap.embedding_degradations, 1);
        assert_eq!(snap.persistence_failures, 1);
        assert_eq!(snap.total_turns, 0);
    }

    #[test]
    fn empty_snapshot_has_zero_average() {
        let snap = Telemetry::new().snapshot();
        assert_eq!(snap.avg_latency_ms, 0.0);
        assert!(snap.since.is_some());
    }

    #[test]
    fn recent_turns_bounded() {
        let telemetry = Telemetry::new();
        for i in 0..(MAX_RECORDS + 5) {
            telemetry.record_turn(TurnOutcome::Plugin, None, "es", i as u64);
        }
        let recent = telemetry.recent_turns(usize::MAX);
        assert_eq!(recent.len(), MAX_RECORDS);
        assert_eq!(recent.last().unwrap().latency_ms, (MAX_RECORDS + 4) as u64);

        let last_two = telemetry.recent_turns(2);
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].latency_ms, (MAX_RECORDS + 3) as u64);
    }

    #[test]
    fn reset_clears_everything() {
        let telemetry = Telemetry::new();
        telemetry.record_turn(TurnOutcome::Service, None, "es", 5);
        telemetry.record_degradation(Degradation::Service);
        telemetry.reset();

        let snap = telemetry.snapshot();
        assert_eq!(snap.total_turns, 0);
        assert_eq!(snap.service_failures, 0);
        assert!(snap.turns_by_outcome.is_empty());
        assert!(telemetry.recent_turns(10).is_empty());
    }

    #[test]
    fn shared_across_threads() {
        let telemetry = Arc::new(Telemetry::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let t = Arc::clone(&telemetry);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        t.record_turn(TurnOutcome::MemoryCommand, None, "es", 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(telemetry.snapshot().total_turns, 100);
    }
}
