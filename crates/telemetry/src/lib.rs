//! Turn metrics for Colloquy.
//!
//! Counts turns by outcome, tracks latency, and records every failure that
//! was absorbed instead of surfacing to the user (classifier degradations,
//! plugin and service failures, embedding and persistence errors).

pub mod engine;
pub mod model;

pub use engine::Telemetry;
pub use model::{Degradation, MetricsSnapshot, TurnOutcome, TurnRecord};
