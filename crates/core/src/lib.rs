//! # Colloquy Core
//!
//! Domain types, traits, and error definitions for the Colloquy
//! turn-resolution engine. This crate has **no runtime dependencies** beyond
//! serde and friends; it defines the model that every other crate implements
//! against.
//!
//! ## Design Philosophy
//!
//! Every pluggable collaborator is a trait here. Implementations live in
//! their respective crates:
//! - `Plugin` → `colloquy-plugins`
//! - `ServiceClient` → `colloquy-services`
//! - `DenseEmbedder` → `colloquy-memory`
//! - `Classifier` / `LanguageDetector` → `colloquy-intent`
//! - `TurnStore` → `colloquy-storage`

pub mod error;
pub mod intent;
pub mod memory;
pub mod message;
pub mod persistence;
pub mod plugin;
pub mod service;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use intent::{Classifier, IntentDefinition, IntentPrediction, IntentTable, LanguageDetector};
pub use memory::{DenseEmbedder, MemoryEvent, MemoryFilter, MemoryHit, MemoryStatus};
pub use message::{ConversationTurn, FallbackReason, SessionId, Utterance};
pub use persistence::TurnStore;
pub use plugin::{EngineInfo, Plugin, PluginResult};
pub use service::{ServiceClient, ServiceCommand, ServiceParams};
