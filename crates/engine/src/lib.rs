//! # Colloquy Engine
//!
//! Composes the intent resolver, plugin chain, service router and memory
//! manager into a [`TurnEngine`] that answers one utterance at a time.

pub mod commands;
pub mod context;
pub mod engine;
pub mod response;

pub use commands::{MEM_USAGE, MemoryCommand};
pub use context::ContextTracker;
pub use engine::{Analysis, ConversationExport, EngineStats, TurnEngine};
pub use response::ResponseSelector;
