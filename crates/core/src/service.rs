//! Service client trait: named backends invoked through command syntax.
//!
//! A service is addressed as `!api <service> <operation> k=v ...`. The router
//! owns the parsing; clients only see the operation name and the parameters.

use crate::error::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String-keyed service parameters. Last value wins on duplicate keys.
pub type ServiceParams = BTreeMap<String, String>;

/// A parsed service command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCommand {
    /// Name of the registered client (e.g., "dummy")
    pub service: String,

    /// Operation understood by that client (e.g., "sum")
    pub operation: String,

    #[serde(default)]
    pub params: ServiceParams,
}

/// The core ServiceClient trait.
///
/// Clients return their raw result as JSON; the caller decides how to render it.
/// An operation the client does not know must be reported as
/// `ServiceError::UnsupportedOperation`.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// The unique name of this service (e.g., "dummy", "http").
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "0.1.0"
    }

    /// Execute an operation with the given parameters.
    async fn execute(
        &self,
        operation: &str,
        params: &ServiceParams,
    ) -> std::result::Result<serde_json::Value, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UpperClient;

    #[async_trait]
    impl ServiceClient for UpperClient {
        fn name(&self) -> &str {
            "upper"
        }

        async fn execute(
            &self,
            operation: &str,
            params: &ServiceParams,
        ) -> std::result::Result<serde_json::Value, ServiceError> {
            match operation {
                "upper" => Ok(serde_json::json!(
                    params.get("text").cloned().unwrap_or_default().to_uppercase()
                )),
                other => Err(ServiceError::UnsupportedOperation {
                    service: self.name().into(),
                    operation: other.into(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn client_executes_known_operation() {
        let mut params = ServiceParams::new();
        params.insert("text".into(), "hola".into());
        let value = UpperClient.execute("upper", &params).await.unwrap();
        assert_eq!(value, serde_json::json!("HOLA"));
    }

    #[tokio::test]
    async fn client_rejects_unknown_operation() {
        let err = UpperClient
            .execute("lower", &ServiceParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedOperation { .. }));
    }

    #[test]
    fn command_serialization() {
        let cmd = ServiceCommand {
            service: "dummy".into(),
            operation: "sum".into(),
            params: [("a".to_string(), "2".to_string())].into_iter().collect(),
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"service\":\"dummy\""));
        assert!(json.contains("\"a\":\"2\""));
    }
}
