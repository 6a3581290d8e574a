//! Error types for the Colloquy domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; none of them ever reaches the
//! user as raw text. The component that detects a failure absorbs it.

use thiserror::Error;

/// The top-level error type for all Colloquy operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Intent resolution ---
    #[error("Intent error: {0}")]
    Intent(#[from] IntentError),

    // --- Plugin chain ---
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    // --- External services ---
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    // --- Long-term memory ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Turn persistence ---
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum IntentError {
    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("Classifier failed: {0}")]
    ClassifierFailed(String),

    #[error("Failed to load intent table {path}: {reason}")]
    TableLoad { path: String, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum PluginError {
    #[error("Plugin {plugin} failed: {reason}")]
    Failed { plugin: String, reason: String },

    #[error("Plugin {0} panicked")]
    Panicked(String),
}

#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("Service not found: {0}")]
    NotFound(String),

    #[error("Operation {operation} not supported by service {service}")]
    UnsupportedOperation { service: String, operation: String },

    #[error("Invalid service parameters: {0}")]
    InvalidParams(String),

    #[error("Service {service} failed: {reason}")]
    Failed { service: String, reason: String },

    #[error("Service {service} timed out after {timeout_secs}s")]
    Timeout { service: String, timeout_secs: u64 },

    #[error("External services are disabled")]
    Disabled,
}

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_displays_correctly() {
        let err = Error::Service(ServiceError::UnsupportedOperation {
            service: "dummy".into(),
            operation: "divide".into(),
        });
        assert!(err.to_string().contains("dummy"));
        assert!(err.to_string().contains("divide"));
    }

    #[test]
    fn plugin_error_displays_correctly() {
        let err = Error::Plugin(PluginError::Failed {
            plugin: "echo".into(),
            reason: "boom".into(),
        });
        assert!(err.to_string().contains("echo"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn timeout_mentions_duration() {
        let err = ServiceError::Timeout {
            service: "http".into(),
            timeout_secs: 10,
        };
        assert!(err.to_string().contains("10s"));
    }
}
