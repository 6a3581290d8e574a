//! Dense embeddings from an OpenAI-compatible `/embeddings` endpoint.
//!
//! Works with OpenAI, Ollama, vLLM, LM Studio, and any server that exposes
//! the same request/response shape.

use async_trait::async_trait;
use colloquy_core::DenseEmbedder;
use colloquy_core::error::MemoryError;
use serde::Deserialize;
use tracing::debug;

pub struct HttpEmbedder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpEmbedder {
    /// Create an embedder for `base_url` (e.g. `http://localhost:11434/v1`).
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, MemoryError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(MemoryError::EmbeddingUnavailable(format!(
                "embedding URL must be http(s): {base_url}"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| MemoryError::EmbeddingUnavailable(e.to_string()))?;

        Ok(Self {
            base_url,
            model: model.into(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl DenseEmbedder for HttpEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
            "encoding_format": "float",
        });

        debug!(model = %self.model, chars = text.len(), "Sending embedding request");

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| MemoryError::EmbeddingFailed(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(MemoryError::EmbeddingFailed(format!(
                "HTTP {status}: {error_body}"
            )));
        }

        let api_resp: EmbeddingApiResponse = response.json().await.map_err(|e| {
            MemoryError::EmbeddingFailed(format!("Failed to parse embedding response: {e}"))
        })?;

        first_embedding(api_resp)
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

fn first_embedding(resp: EmbeddingApiResponse) -> Result<Vec<f32>, MemoryError> {
    resp.data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| MemoryError::EmbeddingFailed("empty embedding response".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_embedding_response() {
        let data = r#"{
            "data": [{"embedding": [0.1, 0.2, 0.3], "index": 0}],
            "model": "all-MiniLM-L6-v2",
            "usage": {"prompt_tokens": 8, "total_tokens": 8}
        }"#;
        let parsed: EmbeddingApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(first_embedding(parsed).unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn empty_response_is_an_error() {
        let parsed: EmbeddingApiResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(first_embedding(parsed).is_err());
    }

    #[test]
    fn rejects_non_http_url() {
        let err = HttpEmbedder::new("file:///tmp", "m", None, 5).err().unwrap();
        assert!(matches!(err, MemoryError::EmbeddingUnavailable(_)));
    }

    #[test]
    fn trims_trailing_slash() {
        let e = HttpEmbedder::new("http://localhost:11434/v1/", "m", None, 5).unwrap();
        assert_eq!(e.base_url, "http://localhost:11434/v1");
        assert_eq!(e.name(), "m");
    }

    #[tokio::test]
    async fn unreachable_server_fails() {
        let e = HttpEmbedder::new("http://127.0.0.1:9", "m", None, 1).unwrap();
        let err = e.embed("hola").await.unwrap_err();
        assert!(matches!(err, MemoryError::EmbeddingFailed(_)));
    }
}
