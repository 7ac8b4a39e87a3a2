//! Embedding provider trait and factory.

use ragsync_core::{AppError, AppResult, EmbeddingSettings};
use std::sync::Arc;

/// A single embedding result.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// The embedding vector
    pub vector: Vec<f32>,

    /// Tokens the provider consumed for the input
    pub input_token_count: u32,
}

impl Embedding {
    pub fn new(vector: Vec<f32>, input_token_count: u32) -> Self {
        Self {
            vector,
            input_token_count,
        }
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// Trait for embedding providers.
///
/// A provider makes one attempt per call. Dimension must be stable for a
/// given model.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Expected embedding dimension, when known up front
    fn dimensions(&self) -> Option<usize>;

    /// Generate the embedding for one text.
    async fn embed(&self, text: &str) -> AppResult<Embedding>;
}

/// Create an embedding provider based on configuration.
pub fn create_provider(
    settings: &EmbeddingSettings,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "mock" => {
            let dimensions = settings.dimensions.unwrap_or(384);
            if dimensions == 0 {
                return Err(AppError::Config(
                    "Mock embedding provider needs a non-zero dimension".to_string(),
                ));
            }
            Ok(Arc::new(super::providers::mock::MockProvider::new(dimensions)))
        }

        "ollama" => Ok(Arc::new(super::providers::ollama::OllamaProvider::new(
            settings,
        )?)),

        "openai" => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("OpenAI embedding provider requires an API key".to_string())
            })?;
            Ok(Arc::new(super::providers::openai::OpenAiProvider::new(
                settings, api_key,
            )?))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, ollama, openai",
            settings.provider
        ))),
    }
}
