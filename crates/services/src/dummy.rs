//! Built-in `dummy` service: `echo` and `sum`, no network involved.

use async_trait::async_trait;
use colloquy_core::error::ServiceError;
use colloquy_core::{ServiceClient, ServiceParams};
use serde_json::Value;

pub struct DummyClient {
    prefix: String,
}

impl DummyClient {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn number(params: &ServiceParams, key: &str) -> Result<f64, ServiceError> {
        match params.get(key) {
            None => Ok(0.0),
            Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
                ServiceError::InvalidParams(format!("'{key}' is not a number: {raw}"))
            }),
        }
    }
}

impl Default for DummyClient {
    fn default() -> Self {
        Self::new("")
    }
}

/// Integral finite values become JSON integers, everything else a float.
fn number_value(x: f64) -> Value {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < i64::MAX as f64 {
        Value::from(x as i64)
    } else {
        Value::from(x)
    }
}

#[async_trait]
impl ServiceClient for DummyClient {
    fn name(&self) -> &str {
        "dummy"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn execute(&self, operation: &str, params: &ServiceParams) -> Result<Value, ServiceError> {
        match operation.trim().to_lowercase().as_str() {
            "echo" => {
                let text = params.get("text").map(String::as_str).unwrap_or("");
                Ok(Value::String(format!("{}{text}", self.prefix)))
            }
            "sum" => {
                let a = Self::number(params, "a")?;
                let b = Self::number(params, "b")?;
                Ok(number_value(a + b))
            }
            _ => Err(ServiceError::UnsupportedOperation {
                service: self.name().into(),
                operation: operation.into(),
            }),
        }
    }
}
