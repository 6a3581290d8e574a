//! The turn engine: one utterance in, one reply out.
//!
//! Per turn: sanitize → plugin chain → `!api` → `!mem` → language detection →
//! intent resolution → response selection → context + persistence.
//! [`TurnEngine::process`] always returns a non-empty reply. Collaborator
//! failures are absorbed where they happen and a panic anywhere in the turn
//! becomes the locale's `error` message.

use crate::commands;
use crate::context::ContextTracker;
use crate::response::ResponseSelector;
use chrono::{DateTime, Utc};
use colloquy_config::EngineConfig;
use colloquy_core::error::PersistenceError;
use colloquy_core::{
    ConversationTurn, EngineInfo, FallbackReason, IntentPrediction, LanguageDetector, MemoryStatus,
    Plugin, ServiceClient, SessionId, TurnStore, Utterance,
};
use colloquy_intent::{IntentResolver, KeywordDetector, ResolutionOutcome, ResolverSettings, table};
use colloquy_memory::MemoryManager;
use colloquy_plugins::PluginDispatcher;
use colloquy_services::{ParsedCommand, ServiceRouter, USAGE, render};
use colloquy_telemetry::{Degradation, MetricsSnapshot, Telemetry, TurnOutcome};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Name reported to plugins.
const ENGINE_NAME: &str = "colloquy";

/// Maximum number of autocomplete suggestions.
const AUTOCOMPLETE_LIMIT: usize = 5;

/// What one turn produced, before telemetry.
struct TurnReply {
    text: String,
    outcome: TurnOutcome,
    intent: Option<String>,
}

impl TurnReply {
    fn new(text: impl Into<String>, outcome: TurnOutcome) -> Self {
        Self {
            text: text.into(),
            outcome,
            intent: None,
        }
    }
}

/// Diagnostic view of how a message would be resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub original_message: String,
    pub detected_language: String,
    /// Vocabulary words present in the message
    pub processed_words: Vec<String>,
    pub predictions: Vec<IntentPrediction>,
    pub bag_of_words_size: usize,
    /// Non-zero entries of the bag-of-words vector
    pub active_features: usize,
}

/// Engine state for dashboards and `colloquy status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub session_id: String,
    pub model_loaded: bool,
    pub vocabulary_size: usize,
    pub classes_count: usize,
    pub languages: Vec<String>,
    pub current_language: String,
    pub default_language: String,
    pub context_length: usize,
    pub max_context: usize,
    pub confidence_threshold: f32,
    pub fallback_threshold: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_intent: Option<String>,
    pub last_confidence: f32,
    /// Intent count per loaded language table
    pub intents_by_language: BTreeMap<String, usize>,
    pub plugins: Vec<String>,
    pub services: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence: Option<String>,
    pub memory: MemoryStatus,
    pub metrics: MetricsSnapshot,
}

/// A session's context, ready to be written out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationExport {
    pub session_id: String,
    pub language: String,
    pub exported_at: DateTime<Utc>,
    pub turns: Vec<ConversationTurn>,
}

/// Resolves conversational turns for one session.
///
/// Single writer: `process` takes `&mut self`. Run one engine per session.
pub struct TurnEngine {
    config: EngineConfig,

    session: SessionId,

    /// Language of the latest resolved turn, or as set by `set_language`
    language: String,

    detector: Box<dyn LanguageDetector>,

    resolver: IntentResolver,

    selector: ResponseSelector,

    context: ContextTracker,

    plugins: PluginDispatcher,

    services: ServiceRouter,

    memory: MemoryManager,

    /// Optional sink for resolved turns
    store: Option<Arc<dyn TurnStore>>,

    telemetry: Arc<Telemetry>,

    last_intent: Option<String>,

    last_confidence: f32,
}

impl TurnEngine {
    /// Build an engine from configuration with a fresh telemetry handle and
    /// no persistence. Plugins start on the first turn or on [`start`].
    ///
    /// [`start`]: Self::start
    pub fn new(config: EngineConfig) -> Self {
        Self::with_telemetry(config, Arc::new(Telemetry::new()))
    }

    /// Like [`new`](Self::new) but reporting into a shared telemetry handle.
    pub fn with_telemetry(config: EngineConfig, telemetry: Arc<Telemetry>) -> Self {
        let resolver = IntentResolver::from_config(&config, Arc::clone(&telemetry));
        Self::assemble(config, resolver, telemetry)
    }

    /// Build an engine around an already constructed resolver.
    pub fn with_resolver(
        config: EngineConfig,
        resolver: IntentResolver,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self::assemble(config, resolver, telemetry)
    }

    fn assemble(config: EngineConfig, resolver: IntentResolver, telemetry: Arc<Telemetry>) -> Self {
        let model = &config.model;
        Self {
            session: SessionId::new(),
            language: model.default_language.clone(),
            detector: Box::new(KeywordDetector::new(
                model.default_language.clone(),
                model.supported_languages.clone(),
            )),
            resolver,
            selector: ResponseSelector::new(model.default_language.clone()),
            context: ContextTracker::new(config.context.max_turns),
            plugins: PluginDispatcher::from_config(&config.plugins, Arc::clone(&telemetry)),
            services: ServiceRouter::from_config(&config.services, Arc::clone(&telemetry)),
            memory: MemoryManager::new(&config.memory, &config.privacy, Arc::clone(&telemetry)),
            store: None,
            telemetry,
            last_intent: None,
            last_confidence: 0.0,
            config,
        }
    }

    /// Build an engine with the configured turn store and started plugins.
    ///
    /// A store that fails to open is logged and counted, and the engine runs
    /// without persistence.
    pub async fn from_config(config: EngineConfig) -> Self {
        let mut engine = Self::new(config);
        match colloquy_storage::from_config(&engine.config).await {
            Ok(store) => engine.store = store,
            Err(e) => {
                warn!(
                    backend = %engine.config.persistence.backend,
                    error = %e,
                    "Turn store unavailable, continuing without persistence"
                );
                engine.telemetry.record_degradation(Degradation::Persistence);
            }
        }
        engine.start().await;
        engine
    }

    /// Persist resolved turns to `store`.
    pub fn with_store(mut self, store: Arc<dyn TurnStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = session;
        self
    }

    pub fn with_detector(mut self, detector: Box<dyn LanguageDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Deterministic response selection.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.selector = ResponseSelector::with_seed(self.config.model.default_language.clone(), seed);
        self
    }

    /// Add a plugin ahead of the configured ones. Must happen before start.
    pub fn with_plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.register(plugin);
        self
    }

    /// Add or replace a service client.
    pub fn with_service(mut self, client: Arc<dyn ServiceClient>) -> Self {
        self.services.register(client);
        self
    }

    fn engine_info(&self) -> EngineInfo {
        EngineInfo {
            name: ENGINE_NAME.into(),
            version: env!("CARGO_PKG_VERSION").into(),
            languages: self.config.model.supported_languages.clone(),
        }
    }

    /// Start the plugin chain. Runs once.
    pub async fn start(&mut self) {
        if self.plugins.is_started() {
            return;
        }
        let info = self.engine_info();
        self.plugins.start(&info).await;
        info!(
            session = %self.session,
            plugins = ?self.plugins.names(),
            services = ?self.services.names(),
            classifier = self.resolver.has_classifier(),
            "Turn engine started"
        );
    }

    /// Stop the plugin chain. Runs once.
    pub async fn shutdown(&mut self) {
        let info = self.engine_info();
        self.plugins.stop(&info).await;
        info!(session = %self.session, "Turn engine stopped");
    }

    // ── Turn processing ──────────────────────────────────────────────

    /// Resolve one utterance. Never fails and never returns an empty string.
    pub async fn process(&mut self, utterance: impl Into<Utterance>) -> String {
        let utterance = utterance.into();
        let started = Instant::now();
        self.start().await;

        let reply = match AssertUnwindSafe(self.run_turn(&utterance))
            .catch_unwind()
            .await
        {
            Ok(reply) => reply,
            Err(_) => {
                error!(session = %self.session, "Turn panicked");
                let text = self.selector.fallback(FallbackReason::Error, &self.language);
                TurnReply::new(text, TurnOutcome::Fallback(FallbackReason::Error))
            }
        };

        let latency_ms = started.elapsed().as_millis() as u64;
        self.telemetry
            .record_turn(reply.outcome, reply.intent.as_deref(), &self.language, latency_ms);
        reply.text
    }

    async fn run_turn(&mut self, utterance: &Utterance) -> TurnReply {
        let message = self.sanitize(&utterance.text);
        if message.is_empty() {
            return self.fallback(FallbackReason::EmptyMessage);
        }

        let recent = self.context.snapshot();
        let result = self.plugins.dispatch(&message, &recent).await;
        if result.handled
            && let Some(response) = result.response.filter(|r| !r.is_empty())
        {
            debug!(meta = ?result.meta, "Plugin handled turn");
            self.commit(ConversationTurn::new(
                &message,
                &response,
                None,
                0.0,
                &self.language,
            ))
            .await;
            return TurnReply::new(response, TurnOutcome::Plugin);
        }

        match ServiceRouter::parse(&message) {
            ParsedCommand::NotCommand => {}
            ParsedCommand::Usage => return TurnReply::new(USAGE, TurnOutcome::Service),
            ParsedCommand::Command(cmd) => {
                let text = match self
                    .services
                    .execute(&cmd.service, &cmd.operation, &cmd.params)
                    .await
                {
                    Some(value) => {
                        let text = render(&value);
                        self.commit(ConversationTurn::new(
                            &message,
                            &text,
                            None,
                            0.0,
                            &self.language,
                        ))
                        .await;
                        text
                    }
                    None => format!(
                        "Servicio '{}' u operación '{}' no disponible",
                        cmd.service, cmd.operation
                    ),
                };
                return TurnReply::new(text, TurnOutcome::Service);
            }
        }

        if let Some(command) = commands::parse_in(&message, &utterance.context) {
            let text = commands::execute(&mut self.memory, command).await;
            return TurnReply::new(text, TurnOutcome::MemoryCommand);
        }

        self.resolve_intent(&message, &recent).await
    }

    async fn resolve_intent(&mut self, message: &str, recent: &[ConversationTurn]) -> TurnReply {
        let language = self.effective_language(&self.detector.detect(message));
        self.language = language.clone();

        let resolution = self.resolver.resolve(message, &language);
        let Some(top) = resolution.top().cloned() else {
            let reason = match resolution.outcome {
                ResolutionOutcome::BelowThreshold => FallbackReason::LowConfidence,
                _ => FallbackReason::NoPrediction,
            };
            debug!(outcome = ?resolution.outcome, path = ?resolution.path, "No intent");
            return self.fallback(reason);
        };

        if top.probability < self.resolver.settings().confidence_threshold {
            debug!(intent = %top.intent, confidence = top.probability, "Low confidence");
            return self.fallback(FallbackReason::LowConfidence);
        }

        let table = self.resolver.table(&language);
        let answerable = table
            .and_then(|t| t.find(&top.intent))
            .is_some_and(|def| def.responses.iter().any(|r| !r.trim().is_empty()));
        if !answerable {
            debug!(intent = %top.intent, language, "Intent has no responses");
            return self.fallback(FallbackReason::UnknownIntent);
        }

        let response = self.selector.select(&top.intent, &language, table, recent);
        debug!(
            intent = %top.intent,
            confidence = top.probability,
            path = ?resolution.path,
            language,
            "Intent resolved"
        );

        self.last_intent = Some(top.intent.clone());
        self.last_confidence = top.probability;
        self.commit(ConversationTurn::new(
            message,
            &response,
            Some(top.intent.clone()),
            top.probability,
            &language,
        ))
        .await;

        TurnReply {
            text: response,
            outcome: TurnOutcome::Intent,
            intent: Some(top.intent),
        }
    }

    fn fallback(&self, reason: FallbackReason) -> TurnReply {
        TurnReply::new(
            self.selector.fallback(reason, &self.language),
            TurnOutcome::Fallback(reason),
        )
    }

    /// Append to the context and hand the turn to the store.
    async fn commit(&mut self, turn: ConversationTurn) {
        if let Some(store) = &self.store
            && let Err(e) = store.save_turn(&self.session, &turn).await
        {
            warn!(backend = store.name(), error = %e, "Failed to persist turn");
            self.telemetry.record_degradation(Degradation::Persistence);
        }
        self.context.append(turn);
    }

    /// Strip control characters (except newline and tab), trim, and cap the
    /// length in characters.
    fn sanitize(&self, raw: &str) -> String {
        let security = &self.config.security;
        let cleaned: String = if security.strip_control_chars {
            raw.chars()
                .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
                .collect()
        } else {
            raw.to_string()
        };
        cleaned
            .trim()
            .chars()
            .take(security.max_input_length)
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    /// `language` when it has a table, else the default language.
    fn effective_language(&self, language: &str) -> String {
        if self.resolver.table(language).is_some() {
            language.to_string()
        } else {
            self.config.model.default_language.clone()
        }
    }

    // ── Introspection ────────────────────────────────────────────────

    /// How `message` would be resolved, without touching any state.
    pub fn analyze(&self, message: &str) -> Analysis {
        let language = self.effective_language(&self.detector.detect(message));
        let features = self.resolver.bag().encode(message);
        Analysis {
            original_message: message.to_string(),
            processed_words: self.resolver.bag().active_words(message),
            predictions: self.resolver.predict(message, &language),
            bag_of_words_size: self.resolver.vocabulary_size(),
            active_features: features.iter().filter(|x| **x > 0.0).count(),
            detected_language: language,
        }
    }

    /// Up to five known patterns matching `partial` in the current language.
    pub fn autocomplete(&self, partial: &str) -> Vec<String> {
        let language = self.effective_language(&self.language);
        self.resolver
            .table(&language)
            .map(|t| table::suggest(t, partial, AUTOCOMPLETE_LIMIT))
            .unwrap_or_default()
    }

    pub fn stats(&self) -> EngineStats {
        let settings = self.resolver.settings();
        let intents_by_language = self
            .resolver
            .languages()
            .into_iter()
            .filter_map(|lang| {
                let count = self.resolver.table(&lang)?.len();
                Some((lang, count))
            })
            .collect();

        EngineStats {
            session_id: self.session.to_string(),
            model_loaded: self.resolver.has_classifier(),
            vocabulary_size: self.resolver.vocabulary_size(),
            classes_count: self.resolver.classes().len(),
            languages: self.config.model.supported_languages.clone(),
            current_language: self.language.clone(),
            default_language: self.config.model.default_language.clone(),
            context_length: self.context.len(),
            max_context: self.context.capacity(),
            confidence_threshold: settings.confidence_threshold,
            fallback_threshold: settings.fallback_threshold,
            last_intent: self.last_intent.clone(),
            last_confidence: self.last_confidence,
            intents_by_language,
            plugins: self.plugins.names().into_iter().map(String::from).collect(),
            services: self.services.names().into_iter().map(String::from).collect(),
            persistence: self.store.as_ref().map(|s| s.name().to_string()),
            memory: self.memory.status(),
            metrics: self.telemetry.snapshot(),
        }
    }

    /// Copy of the current context window, oldest first.
    pub fn context(&self) -> Vec<ConversationTurn> {
        self.context.snapshot()
    }

    /// Forget the context window and the anti-repetition state.
    pub fn clear_context(&mut self) {
        self.context.clear();
        self.selector.reset();
        self.last_intent = None;
        self.last_confidence = 0.0;
        debug!(session = %self.session, "Context cleared");
    }

    /// Switch the current language. Returns `false` (and changes nothing)
    /// when the language is unsupported or has no intent table.
    pub fn set_language(&mut self, language: &str) -> bool {
        let supported = self
            .config
            .model
            .supported_languages
            .iter()
            .any(|l| l == language);
        if !supported || self.resolver.table(language).is_none() {
            warn!(language, "Language not available");
            return false;
        }
        self.language = language.to_string();
        true
    }

    /// Intent tags of a language's table, in table order.
    pub fn available_intents(&self, language: &str) -> Vec<String> {
        self.resolver
            .table(language)
            .map(|t| t.intents.iter().map(|i| i.tag.clone()).collect())
            .unwrap_or_default()
    }

    pub fn export_conversation(&self) -> ConversationExport {
        ConversationExport {
            session_id: self.session.to_string(),
            language: self.language.clone(),
            exported_at: Utc::now(),
            turns: self.context.snapshot(),
        }
    }

    /// Persisted turns of this session, oldest first. Empty without a store.
    pub async fn history(&self, limit: usize) -> Result<Vec<ConversationTurn>, PersistenceError> {
        match &self.store {
            Some(store) => store.history(&self.session, limit).await,
            None => Ok(Vec::new()),
        }
    }

    /// Apply a new configuration between turns: thresholds, context size,
    /// input limits, default language, memory settings. Plugins, services,
    /// the classifier and intent tables are kept.
    pub fn reconfigure(&mut self, config: EngineConfig) {
        self.resolver
            .set_settings(ResolverSettings::from(&config.model));
        self.context.set_capacity(config.context.max_turns);
        self.memory.reconfigure(&config.memory, &config.privacy);
        self.selector
            .set_default_language(config.model.default_language.clone());
        self.detector = Box::new(KeywordDetector::new(
            config.model.default_language.clone(),
            config.model.supported_languages.clone(),
        ));
        if !config
            .model
            .supported_languages
            .iter()
            .any(|l| *l == self.language)
        {
            self.language = config.model.default_language.clone();
        }
        self.config = config;
        info!(session = %self.session, "Engine reconfigured");
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &Arc<Telemetry> {
        &self.telemetry
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }
}
