//! Ollama Embedding Provider
//!
//! Calls Ollama's `/api/embed` endpoint (e.g. with `nomic-embed-text`).
//! One request per text, no retries.

use crate::embeddings::provider::{Embedding, EmbeddingProvider};
use ragsync_core::{AppError, AppResult, EmbeddingSettings};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBED_ENDPOINT: &str = "/api/embed";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Ollama embedding provider using the local API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: Option<usize>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Build a provider from settings; the endpoint falls back to `OLLAMA_URL`
    /// and then to the local default.
    pub fn new(settings: &EmbeddingSettings) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                AppError::Embedding(format!("Failed to create HTTP client for Ollama: {}", e))
            })?;

        let base_url = settings
            .endpoint
            .clone()
            .or_else(|| std::env::var("OLLAMA_URL").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
        })
    }

    fn convert_response(&self, body: EmbedResponse) -> AppResult<Embedding> {
        let vector = body.embeddings.into_iter().next().ok_or_else(|| {
            AppError::Embedding("Ollama returned no embedding".to_string())
        })?;

        if let Some(expected) = self.dimensions {
            if vector.len() != expected {
                return Err(AppError::Embedding(format!(
                    "Unexpected embedding dimensions: got {}, expected {}",
                    vector.len(),
                    expected
                )));
            }
        }

        Ok(Embedding::new(vector, body.prompt_eval_count.unwrap_or(0)))
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed(&self, text: &str) -> AppResult<Embedding> {
        if text.trim().is_empty() {
            return Err(AppError::Embedding("Cannot embed empty text".to_string()));
        }

        let url = format!("{}{}", self.base_url, EMBED_ENDPOINT);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to Ollama: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let detail = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);
            return Err(AppError::Embedding(format!(
                "Ollama API error ({}): {}",
                status, detail
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        let embedding = self.convert_response(body)?;
        debug!(dimension = embedding.dimension(), "Generated embedding");
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(dimensions: Option<usize>) -> OllamaProvider {
        OllamaProvider::new(&EmbeddingSettings {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            endpoint: Some("http://ollama.internal:11434/".to_string()),
            dimensions,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_provider_settings() {
        let provider = provider(Some(768));
        assert_eq!(provider.base_url, "http://ollama.internal:11434");
        assert_eq!(provider.model_name(), "nomic-embed-text");
        assert_eq!(provider.dimensions(), Some(768));
    }

    #[test]
    fn test_convert_response() {
        let body: EmbedResponse = serde_json::from_str(
            r#"{"model":"nomic-embed-text","embeddings":[[0.1,0.2,0.3]],"prompt_eval_count":4}"#,
        )
        .unwrap();
        let embedding = provider(None).convert_response(body).unwrap();
        assert_eq!(embedding.vector, vec![0.1, 0.2, 0.3]);
        assert_eq!(embedding.input_token_count, 4);
    }

    #[test]
    fn test_convert_response_dimension_check() {
        let body: EmbedResponse =
            serde_json::from_str(r#"{"embeddings":[[0.1,0.2,0.3]]}"#).unwrap();
        assert!(provider(Some(768)).convert_response(body).is_err());
    }

    #[tokio::test]
    async fn test_empty_text_rejected_without_request() {
        assert!(provider(None).embed("").await.is_err());
    }
}
