//! `http` service: plain GET/POST against a configured base URL.
//!
//! `!api http get path=/status` issues `GET {base_url}/status`. Remaining
//! parameters become the query string (GET) or a JSON object body (POST);
//! a `body=` parameter, when present, is sent verbatim instead.

use async_trait::async_trait;
use colloquy_core::error::ServiceError;
use colloquy_core::{ServiceClient, ServiceParams};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub struct HttpClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, ServiceError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ServiceError::InvalidParams(format!(
                "base_url must start with http:// or https://: {base_url}"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ServiceError::Failed {
                service: "http".into(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    fn url(&self, params: &ServiceParams) -> String {
        let path = params.get("path").map(String::as_str).unwrap_or("");
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    fn failed(&self, reason: impl Into<String>) -> ServiceError {
        ServiceError::Failed {
            service: self.name().into(),
            reason: reason.into(),
        }
    }
}

/// Parameters other than `path` and `body`.
fn extra_params(params: &ServiceParams) -> Vec<(&str, &str)> {
    params
        .iter()
        .filter(|(k, _)| k.as_str() != "path" && k.as_str() != "body")
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

/// JSON when the text parses as JSON, otherwise the raw string.
fn body_value(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[async_trait]
impl ServiceClient for HttpClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn execute(&self, operation: &str, params: &ServiceParams) -> Result<Value, ServiceError> {
        let url = self.url(params);
        let method = operation.trim().to_lowercase();

        let mut request = match method.as_str() {
            "get" => self.client.get(&url).query(&extra_params(params)),
            "post" => {
                let req = self.client.post(&url);
                match params.get("body") {
                    Some(raw) => req
                        .header("Content-Type", "application/json")
                        .body(raw.clone()),
                    None => {
                        let body: serde_json::Map<String, Value> = extra_params(params)
                            .into_iter()
                            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                            .collect();
                        req.json(&body)
                    }
                }
            }
            _ => {
                return Err(ServiceError::UnsupportedOperation {
                    service: self.name().into(),
                    operation: operation.into(),
                });
            }
        };
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(method = %method, url = %url, "Calling http service");

        let response = request.send().await.map_err(|e| self.failed(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| self.failed(format!("Failed to read body: {e}")))?;

        Ok(serde_json::json!({
            "status": status,
            "body": body_value(text),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ServiceParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(HttpClient::new("ftp://example.com", None, 5).is_err());
        assert!(HttpClient::new("https://example.com", None, 5).is_ok());
    }

    #[test]
    fn joins_path_onto_base() {
        let client = HttpClient::new("https://example.com/api/", None, 5).unwrap();
        assert_eq!(
            client.url(&params(&[("path", "/status")])),
            "https://example.com/api/status"
        );
        assert_eq!(client.url(&ServiceParams::new()), "https://example.com/api");
    }

    #[test]
    fn extra_params_skip_reserved_keys() {
        let p = params(&[("path", "/x"), ("body", "{}"), ("q", "rust")]);
        assert_eq!(extra_params(&p), vec![("q", "rust")]);
    }

    #[test]
    fn body_is_parsed_when_json() {
        assert_eq!(body_value("{\"ok\":true}".into()), serde_json::json!({"ok": true}));
        assert_eq!(body_value("plain".into()), serde_json::json!("plain"));
    }

    #[tokio::test]
    async fn unsupported_method() {
        let client = HttpClient::new("http://127.0.0.1:9", None, 1).unwrap();
        let err = client.execute("delete", &ServiceParams::new()).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedOperation { .. }));
    }

    #[tokio::test]
    async fn unreachable_host_fails() {
        let client = HttpClient::new("http://127.0.0.1:9", None, 1).unwrap();
        let err = client.execute("get", &ServiceParams::new()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Failed { .. }));
    }
}
