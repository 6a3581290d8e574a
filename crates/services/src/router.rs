//! Service router: parses `!api` commands and dispatches them to clients.

use crate::dummy::DummyClient;
use crate::http::HttpClient;
use colloquy_config::ServicesConfig;
use colloquy_core::error::ServiceError;
use colloquy_core::{ServiceClient, ServiceCommand, ServiceParams};
use colloquy_telemetry::{Degradation, Telemetry};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const PREFIX: &str = "!api ";

/// Shown when an `!api` command lacks a service or an operation.
pub const USAGE: &str = "Uso: !api <servicio> <operación> k=v ...";

/// How a message reads as a service command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    /// Not an `!api` message at all
    NotCommand,
    /// `!api` prefix but missing service or operation
    Usage,
    Command(ServiceCommand),
}

pub struct ServiceRouter {
    enabled: bool,
    timeout: Duration,
    clients: BTreeMap<String, Arc<dyn ServiceClient>>,
    telemetry: Arc<Telemetry>,
}

impl ServiceRouter {
    /// A router with no clients.
    pub fn new(config: &ServicesConfig, telemetry: Arc<Telemetry>) -> Self {
        Self {
            enabled: config.enabled,
            timeout: Duration::from_secs(config.timeout_secs),
            clients: BTreeMap::new(),
            telemetry,
        }
    }

    /// A router with the built-in clients the configuration enables.
    pub fn from_config(config: &ServicesConfig, telemetry: Arc<Telemetry>) -> Self {
        let mut router = Self::new(config, telemetry);
        if !config.enabled {
            info!("External services disabled");
            return router;
        }

        if config.clients.dummy.enabled {
            router.register(Arc::new(DummyClient::new(
                config.clients.dummy.echo_prefix.clone(),
            )));
        }

        if let Some(base_url) = &config.clients.http.base_url {
            match HttpClient::new(
                base_url.clone(),
                config.clients.http.api_key.clone(),
                config.timeout_secs,
            ) {
                Ok(client) => router.register(Arc::new(client)),
                Err(e) => warn!(error = %e, "http service not registered"),
            }
        }

        info!(clients = ?router.names(), "Service clients active");
        router
    }

    /// Register a client. Replaces any existing client with the same name.
    pub fn register(&mut self, client: Arc<dyn ServiceClient>) {
        debug!(service = client.name(), version = client.version(), "Service registered");
        self.clients.insert(client.name().to_string(), client);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Registered service names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.clients.keys().map(String::as_str).collect()
    }

    /// Parse `!api <service> <operation> k=v ...`.
    ///
    /// The prefix is case-insensitive. Parameters split on the first `=`;
    /// tokens without `=` are ignored and the last value for a key wins.
    pub fn parse(message: &str) -> ParsedCommand {
        let trimmed = message.trim();
        let is_command = trimmed
            .get(..PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(PREFIX));
        if !is_command {
            return ParsedCommand::NotCommand;
        }

        let mut tokens = trimmed.split_whitespace().skip(1);
        let (Some(service), Some(operation)) = (tokens.next(), tokens.next()) else {
            return ParsedCommand::Usage;
        };

        let params: ServiceParams = tokens
            .filter_map(|t| t.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        ParsedCommand::Command(ServiceCommand {
            service: service.to_string(),
            operation: operation.to_string(),
            params,
        })
    }

    /// Parse and execute. `None` for non-commands, usage errors and any
    /// failed call.
    pub async fn route(&self, message: &str) -> Option<Value> {
        match Self::parse(message) {
            ParsedCommand::Command(cmd) => {
                self.execute(&cmd.service, &cmd.operation, &cmd.params).await
            }
            ParsedCommand::Usage | ParsedCommand::NotCommand => None,
        }
    }

    /// Run one operation. Every failure is logged and yields `None`.
    pub async fn execute(
        &self,
        service: &str,
        operation: &str,
        params: &ServiceParams,
    ) -> Option<Value> {
        match self.try_execute(service, operation, params).await {
            Ok(value) => Some(value),
            Err(ServiceError::Disabled) => {
                warn!(service, operation, "Service call ignored: services disabled");
                None
            }
            Err(e) => {
                warn!(service, operation, error = %e, "Service call failed");
                self.telemetry.record_degradation(Degradation::Service);
                None
            }
        }
    }

    /// Like [`execute`](Self::execute) but keeps the error.
    pub async fn try_execute(
        &self,
        service: &str,
        operation: &str,
        params: &ServiceParams,
    ) -> Result<Value, ServiceError> {
        if !self.enabled {
            return Err(ServiceError::Disabled);
        }
        let client = self
            .clients
            .get(service)
            .ok_or_else(|| ServiceError::NotFound(service.to_string()))?;

        match tokio::time::timeout(self.timeout, client.execute(operation, params)).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout {
                service: service.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }
}

/// Render a raw service result for the user: strings verbatim, anything
/// else as compact JSON.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
