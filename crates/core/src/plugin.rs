//! Plugin trait: hooks that may fully answer a turn before intent resolution.
//!
//! Plugins are registered in a fixed order at startup. On every turn the
//! dispatcher walks them in that order and stops at the first one that
//! reports `handled = true`.

use crate::error::PluginError;
use crate::message::ConversationTurn;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The outcome of one plugin invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginResult {
    /// Whether the plugin answered the turn
    pub handled: bool,

    /// The reply, when handled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// Free-form metadata (which plugin, timings, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl PluginResult {
    /// The plugin did not handle the message.
    pub fn unhandled() -> Self {
        Self::default()
    }

    /// The plugin answered the message with `response`.
    pub fn handled(response: impl Into<String>) -> Self {
        Self {
            handled: true,
            response: Some(response.into()),
            meta: serde_json::Map::new(),
        }
    }

    /// Attach a metadata value.
    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }
}

/// What a plugin gets to know about the engine hosting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineInfo {
    pub name: String,
    pub version: String,
    pub languages: Vec<String>,
}

/// The core Plugin trait.
///
/// `on_start` and `on_stop` are called exactly once; `on_message` once per
/// turn until some plugin earlier in the chain handles the message.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// The unique name of this plugin (e.g., "echo").
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "0.1.0"
    }

    /// Called once when the dispatcher starts.
    async fn on_start(
        &mut self,
        _engine: &EngineInfo,
        _config: &serde_json::Value,
    ) -> std::result::Result<(), PluginError> {
        Ok(())
    }

    /// Inspect a message; return `PluginResult::handled` to short-circuit the turn.
    async fn on_message(
        &self,
        message: &str,
        context: &[ConversationTurn],
    ) -> std::result::Result<PluginResult, PluginError>;

    /// Called once when the dispatcher stops.
    async fn on_stop(&mut self, _engine: &EngineInfo) -> std::result::Result<(), PluginError> {
        Ok(())
    }
}
