//! Embedding provider configuration.

use keepsake_core::{AppConfig, AppError, AppResult};
use std::time::Duration;

/// Resolved settings for constructing an embedding provider.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "ollama", "openai", "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Base URL override for HTTP providers
    pub endpoint: Option<String>,

    /// Bearer token for providers that need one
    pub api_key: Option<String>,

    /// Per-request HTTP timeout
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl EmbeddingConfig {
    /// Resolve embedding settings from the application config.
    ///
    /// Provider, model and dimensions come from
    /// [`AppConfig::resolved_embedding`]; the endpoint and API key come
    /// from the selected provider's block.
    pub fn from_app_config(config: &AppConfig) -> AppResult<Self> {
        let settings = config.resolved_embedding();

        let endpoint = config
            .get_provider_config(&settings.provider)
            .as_ref()
            .and_then(|p| p.endpoint())
            .map(str::to_string);

        let api_key = if settings.provider == "openai" {
            Some(config.resolve_api_key(&settings.provider).ok_or_else(|| {
                AppError::Config("OpenAI embeddings require an API key".to_string())
            })?)
        } else {
            None
        };

        Ok(Self {
            provider: settings.provider,
            model: settings.model,
            dimensions: settings.dimensions,
            endpoint,
            api_key,
            timeout: config.retrieval.call_timeout(),
        })
    }
}
