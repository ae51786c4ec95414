//! Generation provider factory.
//!
//! Creates generation clients from a provider name, optional endpoint and
//! API key, with a per-request HTTP timeout.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use std::sync::Arc;
use std::time::Duration;

/// Create a generation client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (for providers that require it)
/// * `timeout` - Per-request HTTP timeout
///
/// # Errors
/// Returns an error if the provider is unknown, a required key is missing
/// or the HTTP client cannot be built.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> Result<Arc<dyn LlmClient>, String> {
    match provider.to_lowercase().as_str() {
        "ollama" => {
            let base_url = endpoint.unwrap_or(crate::providers::ollama::DEFAULT_OLLAMA_URL);
            let client = OllamaClient::with_timeout(base_url, timeout)?;
            Ok(Arc::new(client))
        }
        "openai" => {
            let api_key = api_key.ok_or_else(|| "OpenAI provider requires API key".to_string())?;
            let base_url = endpoint.unwrap_or(crate::providers::openai::DEFAULT_OPENAI_URL);
            let client = OpenAiClient::new(base_url, api_key, timeout)?;
            Ok(Arc::new(client))
        }
        _ => Err(format!("Unknown provider: {}", provider)),
    }
}
