//! Plugin dispatcher: walks the chain and isolates plugin failures.
//!
//! A plugin that errors or panics inside `on_message` is logged, counted in
//! telemetry and treated as "not handled"; the chain moves on to the next
//! plugin. Lifecycle hook failures never abort startup or shutdown.

use crate::catalog::PluginCatalog;
use colloquy_config::PluginsConfig;
use colloquy_core::error::PluginError;
use colloquy_core::{ConversationTurn, EngineInfo, Plugin, PluginResult};
use colloquy_telemetry::{Degradation, Telemetry};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct PluginDispatcher {
    enabled: bool,
    registry: Vec<String>,
    settings: std::collections::HashMap<String, serde_json::Value>,
    catalog: PluginCatalog,
    plugins: Vec<Box<dyn Plugin>>,
    started: bool,
    telemetry: Arc<Telemetry>,
}

impl PluginDispatcher {
    pub fn new(config: &PluginsConfig, catalog: PluginCatalog, telemetry: Arc<Telemetry>) -> Self {
        Self {
            enabled: config.enabled,
            registry: config.registry.clone(),
            settings: config.settings.clone(),
            catalog,
            plugins: Vec::new(),
            started: false,
            telemetry,
        }
    }

    /// Dispatcher over the built-in catalog.
    pub fn from_config(config: &PluginsConfig, telemetry: Arc<Telemetry>) -> Self {
        Self::new(config, PluginCatalog::builtin(), telemetry)
    }

    /// Add a plugin ahead of the catalog plugins instantiated by `start`.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        debug!(plugin = plugin.name(), "Plugin registered");
        self.plugins.push(plugin);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Names of the plugins in the chain, in dispatch order.
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Instantiate the registry names and run every `on_start`. Runs once.
    pub async fn start(&mut self, engine: &EngineInfo) {
        if self.started {
            return;
        }
        self.started = true;

        if !self.enabled {
            info!("Plugin system disabled");
            return;
        }

        for name in &self.registry {
            match self.catalog.create(name) {
                Some(plugin) => self.plugins.push(plugin),
                None => warn!(plugin = %name, "Unknown plugin in registry, skipping"),
            }
        }

        let null = serde_json::Value::Null;
        for plugin in &mut self.plugins {
            let name = plugin.name().to_string();
            let config = self.settings.get(&name).unwrap_or(&null);
            let outcome = AssertUnwindSafe(plugin.on_start(engine, config))
                .catch_unwind()
                .await;
            match flatten(&name, outcome) {
                Ok(()) => debug!(plugin = %name, version = plugin.version(), "Plugin started"),
                Err(e) => warn!(plugin = %name, error = %e, "Plugin on_start failed"),
            }
        }

        info!(count = self.plugins.len(), "Plugins initialized");
    }

    /// Offer `message` to each plugin in order. The first handled result
    /// wins; otherwise the result is unhandled.
    pub async fn dispatch(&self, message: &str, context: &[ConversationTurn]) -> PluginResult {
        if !self.enabled || self.plugins.is_empty() {
            return PluginResult::unhandled();
        }

        for plugin in &self.plugins {
            let name = plugin.name();
            let outcome = AssertUnwindSafe(plugin.on_message(message, context))
                .catch_unwind()
                .await;

            match flatten(name, outcome) {
                Ok(result) if result.handled => {
                    debug!(plugin = name, "Message handled by plugin");
                    return result;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(plugin = name, error = %e, "Plugin on_message failed");
                    self.telemetry.record_degradation(Degradation::Plugin);
                }
            }
        }

        PluginResult::unhandled()
    }

    /// Run every `on_stop`. Runs once, and only after `start`.
    pub async fn stop(&mut self, engine: &EngineInfo) {
        if !self.started || self.plugins.is_empty() {
            return;
        }

        for plugin in &mut self.plugins {
            let name = plugin.name().to_string();
            let outcome = AssertUnwindSafe(plugin.on_stop(engine)).catch_unwind().await;
            if let Err(e) = flatten(&name, outcome) {
                warn!(plugin = %name, error = %e, "Plugin on_stop failed");
            }
        }
        self.plugins.clear();
        self.started = false;
        info!("Plugin system stopped");
    }
}

/// Fold a caught panic into a `PluginError`.
fn flatten<T>(
    plugin: &str,
    outcome: Result<Result<T, PluginError>, Box<dyn Any + Send>>,
) -> Result<T, PluginError> {
    match outcome {
        Ok(result) => result,
        Err(payload) => Err(PluginError::Panicked(format!(
            "{plugin}: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
