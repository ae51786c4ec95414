//! OpenAI-compatible embedding provider.
//!
//! Sends the whole batch to `POST {base_url}/v1/embeddings` with bearer
//! authentication and returns vectors in input order.

use crate::embeddings::providers::ollama::check_dimensions;
use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use keepsake_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI embeddings client.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiProvider {
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Config("OpenAI embeddings require an API key".to_string()))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                AppError::Embedding(format!("Failed to create HTTP client for OpenAI: {}", e))
            })?;

        let base_url = config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    /// Order vectors by `index` and check count and dimensions.
    fn collect_vectors(
        mut response: EmbeddingsResponse,
        expected_count: usize,
        dimensions: usize,
    ) -> AppResult<Vec<Vec<f32>>> {
        if response.data.len() != expected_count {
            return Err(AppError::Embedding(format!(
                "OpenAI returned {} embeddings for {} inputs",
                response.data.len(),
                expected_count
            )));
        }

        response.data.sort_by_key(|item| item.index);
        response
            .data
            .into_iter()
            .map(|item| check_dimensions(item.embedding, dimensions))
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(AppError::Embedding("Cannot embed empty text".to_string()));
        }

        tracing::debug!(model = %self.model, batch = texts.len(), "Requesting OpenAI embeddings");

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to OpenAI: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding(format!(
                "OpenAI API error ({}): {}",
                status, body
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse OpenAI response: {}", e)))?;

        Self::collect_vectors(parsed, texts.len(), self.dimensions)
    }
}
