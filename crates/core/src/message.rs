//! Utterance and conversation-turn domain types.
//!
//! These are the value objects that flow through one turn:
//! caller sends an `Utterance` → engine resolves it → a `ConversationTurn`
//! records what happened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One raw user input plus optional caller-supplied context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Utterance {
    /// The text as typed by the user
    pub text: String,

    /// Free-form context from the caller (channel, user name, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub context: serde_json::Map<String, serde_json::Value>,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: serde_json::Map::new(),
        }
    }

    /// Attach a context value.
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }
}

impl From<&str> for Utterance {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Utterance {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// A resolved turn: what the user said and what the engine answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_message: String,

    pub bot_response: String,

    /// Resolved intent tag, if the turn went through intent resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    /// Confidence of the resolved intent (0.0 when not applicable)
    #[serde(default)]
    pub confidence: f32,

    /// ISO language code the turn was resolved in
    pub language: String,

    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(
        user_message: impl Into<String>,
        bot_response: impl Into<String>,
        intent: Option<String>,
        confidence: f32,
        language: impl Into<String>,
    ) -> Self {
        Self {
            user_message: user_message.into(),
            bot_response: bot_response.into(),
            intent,
            confidence,
            language: language.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Why the engine answered with a canned message instead of an intent response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    EmptyMessage,
    NoPrediction,
    LowConfidence,
    UnknownIntent,
    Error,
}

impl FallbackReason {
    pub const ALL: [FallbackReason; 5] = [
        FallbackReason::EmptyMessage,
        FallbackReason::NoPrediction,
        FallbackReason::LowConfidence,
        FallbackReason::UnknownIntent,
        FallbackReason::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::EmptyMessage => "empty_message",
            FallbackReason::NoPrediction => "no_prediction",
            FallbackReason::LowConfidence => "low_confidence",
            FallbackReason::UnknownIntent => "unknown_intent",
            FallbackReason::Error => "error",
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
