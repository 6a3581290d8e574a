//! Configuration loading, validation, and management for Colloquy.
//!
//! Loads configuration from `~/.colloquy/config.toml` (or the file named by
//! `COLLOQUY_CONFIG`) with environment variable overrides. Validates all
//! settings at startup and on every reconfiguration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.colloquy/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Language and threshold settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Where models and intent tables live
    #[serde(default)]
    pub paths: PathsConfig,

    /// Conversational context
    #[serde(default)]
    pub context: ContextConfig,

    /// Input hardening
    #[serde(default)]
    pub security: SecurityConfig,

    /// Plugin chain
    #[serde(default)]
    pub plugins: PluginsConfig,

    /// External service router
    #[serde(default)]
    pub services: ServicesConfig,

    /// Long-term memory
    #[serde(default)]
    pub memory: MemoryConfig,

    /// PII masking
    #[serde(default)]
    pub privacy: PrivacyConfig,

    /// Turn persistence
    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_language")]
    pub default_language: String,

    #[serde(default = "default_supported_languages")]
    pub supported_languages: Vec<String>,

    /// Classifier probabilities must be strictly above this to be kept
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Lexical fallback scores must be strictly above this to be kept
    #[serde(default = "default_fallback_threshold")]
    pub fallback_threshold: f32,

    /// Maximum number of lexical fallback candidates
    #[serde(default = "default_fallback_top_n")]
    pub fallback_top_n: usize,
}

fn default_language() -> String {
    "es".into()
}
fn default_supported_languages() -> Vec<String> {
    vec!["es".into(), "en".into()]
}
fn default_confidence_threshold() -> f32 {
    0.25
}
fn default_fallback_threshold() -> f32 {
    0.3
}
fn default_fallback_top_n() -> usize {
    3
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            supported_languages: default_supported_languages(),
            confidence_threshold: default_confidence_threshold(),
            fallback_threshold: default_fallback_threshold(),
            fallback_top_n: default_fallback_top_n(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding `model.json`
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Directory holding `intents_<lang>.json`
    #[serde(default = "default_intents_dir")]
    pub intents_dir: PathBuf,
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}
fn default_intents_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            intents_dir: default_intents_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

fn default_max_turns() -> usize {
    5
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Inputs are truncated to this many characters
    #[serde(default = "default_max_input_length")]
    pub max_input_length: usize,

    #[serde(default = "default_true")]
    pub strip_control_chars: bool,
}

fn default_max_input_length() -> usize {
    1000
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_length: default_max_input_length(),
            strip_control_chars: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Catalog names instantiated at start, in order
    #[serde(default = "default_plugin_registry")]
    pub registry: Vec<String>,

    /// Per-plugin settings handed to `on_start`, keyed by plugin name
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

fn default_plugin_registry() -> Vec<String> {
    vec!["echo".into()]
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            registry: default_plugin_registry(),
            settings: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Upper bound for one service call
    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub clients: ServiceClientsConfig,
}

fn default_service_timeout() -> u64 {
    10
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_service_timeout(),
            clients: ServiceClientsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceClientsConfig {
    #[serde(default)]
    pub dummy: DummyClientConfig,

    #[serde(default)]
    pub http: HttpClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DummyClientConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prepended to the text returned by the `echo` operation
    #[serde(default)]
    pub echo_prefix: String,
}

impl Default for DummyClientConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            echo_prefix: String::new(),
        }
    }
}

/// The `http` client is registered only when `base_url` is set.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct HttpClientConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Sent as a bearer token when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for HttpClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Default number of hits for `!mem find`
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

fn default_top_k() -> usize {
    5
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top_k: default_top_k(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

/// Embedding provider selection.
///
/// `provider` is one of `auto` (dense when `api_url` is set, else sparse),
/// `dense`, `sparse` or `none`.
#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Dense model name sent to the embeddings endpoint
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Base URL of an OpenAI-compatible API (e.g. `http://localhost:11434/v1`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Vocabulary cap for the sparse vectorizer
    #[serde(default = "default_max_features")]
    pub max_features: usize,
}

fn default_embedding_provider() -> String {
    "auto".into()
}
fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".into()
}
fn default_embedding_timeout() -> u64 {
    30
}
fn default_max_features() -> usize {
    2048
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            api_url: None,
            api_key: None,
            timeout_secs: default_embedding_timeout(),
            max_features: default_max_features(),
        }
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_features", &self.max_features)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrivacyConfig {
    /// Replace email addresses in memory events with `[email]`
    #[serde(default)]
    pub mask_emails: bool,

    /// Replace phone numbers in memory events with `[phone]`
    #[serde(default)]
    pub mask_phones: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// One of `memory`, `file`, `sqlite` or `none`
    #[serde(default = "default_persistence_backend")]
    pub backend: String,

    /// File or database path; defaults under the config directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_persistence_backend() -> String {
    "memory".into()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: default_persistence_backend(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `COLLOQUY_CONFIG` or the default path
    /// (~/.colloquy/config.toml), then apply environment overrides:
    /// - `COLLOQUY_DEFAULT_LANGUAGE`
    /// - `COLLOQUY_LOG`
    /// - `COLLOQUY_EMBEDDING_API_KEY` (only when no key is configured)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("COLLOQUY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));
        let mut config = Self::load_from(&config_path)?;

        if let Ok(lang) = std::env::var("COLLOQUY_DEFAULT_LANGUAGE") {
            config.model.default_language = lang;
        }

        if let Ok(level) = std::env::var("COLLOQUY_LOG") {
            config.logging.level = level;
        }

        if config.memory.embedding.api_key.is_none() {
            config.memory.embedding.api_key = std::env::var("COLLOQUY_EMBEDDING_API_KEY").ok();
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".colloquy")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("model.confidence_threshold", self.model.confidence_threshold),
            ("model.fallback_threshold", self.model.fallback_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 1.0"
                )));
            }
        }

        if self.context.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "context.max_turns must be > 0".into(),
            ));
        }

        if self.memory.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "memory.top_k must be > 0".into(),
            ));
        }

        if self.security.max_input_length == 0 {
            return Err(ConfigError::ValidationError(
                "security.max_input_length must be > 0".into(),
            ));
        }

        if !self
            .model
            .supported_languages
            .contains(&self.model.default_language)
        {
            return Err(ConfigError::ValidationError(format!(
                "model.default_language '{}' is not in model.supported_languages",
                self.model.default_language
            )));
        }

        if !matches!(
            self.memory.embedding.provider.as_str(),
            "auto" | "dense" | "sparse" | "none"
        ) {
            return Err(ConfigError::ValidationError(format!(
                "unknown embedding provider '{}'",
                self.memory.embedding.provider
            )));
        }

        if !matches!(
            self.persistence.backend.as_str(),
            "memory" | "file" | "sqlite" | "none"
        ) {
            return Err(ConfigError::ValidationError(format!(
                "unknown persistence backend '{}'",
                self.persistence.backend
            )));
        }

        Ok(())
    }

    /// Persistence path, falling back to a file under the config directory.
    pub fn persistence_path(&self) -> PathBuf {
        match &self.persistence.path {
            Some(p) => p.clone(),
            None => match self.persistence.backend.as_str() {
                "sqlite" => Self::config_dir().join("turns.db"),
                _ => Self::config_dir().join("turns.jsonl"),
            },
        }
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
