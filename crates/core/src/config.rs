//! Configuration management for Keepsake.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config files (.keepsake/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources win. The archive database and config live in `.keepsake/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .keepsake/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Generation provider ("openai", "ollama")
    pub provider: String,

    /// Generation model identifier
    pub model: String,

    /// API key for the generation provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Path to the SQLite archive; defaults to `.keepsake/archive.db`
    pub database: Option<PathBuf>,

    /// Provider configurations from config.yaml
    pub llm: Option<LlmConfig>,

    /// Embedding model settings
    pub embedding: EmbeddingSettings,

    /// Retrieval pipeline tuning
    pub retrieval: RetrievalConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "activeEmbeddingProvider")]
    pub active_embedding_provider: Option<String>,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
    },
}

impl ProviderConfig {
    /// Custom endpoint for this provider, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAI { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint),
        }
    }

    /// Generation model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    /// Embedding model configured for this provider.
    pub fn embedding_model(&self) -> Option<&str> {
        match self {
            Self::OpenAI {
                embedding_model, ..
            }
            | Self::Ollama {
                embedding_model, ..
            } => embedding_model.as_deref(),
        }
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingSettings {
    /// Provider name: "ollama", "openai", "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Fixed vector dimension produced by the model
    pub dimensions: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
        }
    }
}

impl EmbeddingSettings {
    /// Default model and dimensions for a known embedding provider.
    pub fn for_provider(provider: &str) -> Option<Self> {
        let (model, dimensions) = match provider {
            "ollama" => ("nomic-embed-text", 768),
            "openai" => ("text-embedding-3-small", 1536),
            "trigram" => ("trigram-v1", 384),
            _ => return None,
        };
        Some(Self {
            provider: provider.to_string(),
            model: model.to_string(),
            dimensions,
        })
    }
}

/// Tuning knobs for the question-answering pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalConfig {
    /// Documents handed to the answer synthesizer
    pub limit: usize,

    /// Index candidate pool = limit * candidate_multiplier
    pub candidate_multiplier: usize,

    /// Cap on documents returned by the metadata filter
    pub filter_limit: usize,

    /// Deadline applied to every external call
    pub call_timeout_secs: u64,

    /// Directory cache lifetime; 0 disables the cache
    pub directory_cache_ttl_secs: u64,

    /// Token budget for synthesized answers
    pub answer_max_tokens: u32,

    /// Sampling temperature for synthesized answers
    pub answer_temperature: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            candidate_multiplier: 20,
            filter_limit: 50,
            call_timeout_secs: 30,
            directory_cache_ttl_secs: 60,
            answer_max_tokens: 500,
            answer_temperature: 0.7,
        }
    }
}

impl RetrievalConfig {
    /// Per-call deadline as a `Duration`.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    embedding: Option<EmbeddingSettings>,
    retrieval: Option<RetrievalConfig>,
    database: Option<DatabaseConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatabaseConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            database: None,
            llm: None,
            embedding: EmbeddingSettings::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment.
    ///
    /// Environment variables:
    /// - `KEEPSAKE_WORKSPACE`: Override workspace path
    /// - `KEEPSAKE_CONFIG`: Path to config file
    /// - `KEEPSAKE_PROVIDER`: Generation provider
    /// - `KEEPSAKE_MODEL`: Generation model
    /// - `KEEPSAKE_API_KEY`: API key
    /// - `KEEPSAKE_DB`: SQLite archive path
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Like [`AppConfig::load`], but an explicit workspace or config file
    /// (from CLI flags) wins over the environment when locating the YAML.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var_os("KEEPSAKE_WORKSPACE").map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var_os("KEEPSAKE_CONFIG").map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.keepsake_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("KEEPSAKE_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("KEEPSAKE_MODEL") {
            config.model = model;
        }

        if let Ok(db) = std::env::var("KEEPSAKE_DB") {
            config.database = Some(PathBuf::from(db));
        }

        config.api_key = std::env::var("KEEPSAKE_API_KEY").ok();
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(db) = config_file.database.and_then(|d| d.path) {
            result.database = Some(PathBuf::from(db));
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .keepsake directory.
    pub fn keepsake_dir(&self) -> PathBuf {
        self.workspace.join(".keepsake")
    }

    /// Ensure the .keepsake directory exists.
    pub fn ensure_keepsake_dir(&self) -> AppResult<()> {
        let dir = self.keepsake_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .keepsake directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolved path of the SQLite archive.
    pub fn database_path(&self) -> PathBuf {
        match self.database {
            Some(ref path) if path.is_absolute() => path.clone(),
            Some(ref path) => self.workspace.join(path),
            None => self.keepsake_dir().join("archive.db"),
        }
    }

    /// Get a provider's configuration block, if one was configured.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Resolve the API key for a provider.
    ///
    /// `KEEPSAKE_API_KEY` wins; otherwise the provider's `apiKeyEnv` is read.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider)? {
            ProviderConfig::OpenAI { api_key_env, .. } => std::env::var(&api_key_env).ok(),
            ProviderConfig::Ollama { .. } => None,
        }
    }

    /// Embedding settings after applying `llm.activeEmbeddingProvider`.
    ///
    /// The `embedding` section describes one provider. When the override
    /// selects a different one, that provider's defaults apply instead. A
    /// provider block's `embeddingModel` replaces the model name either way.
    pub fn resolved_embedding(&self) -> EmbeddingSettings {
        let active = self
            .llm
            .as_ref()
            .and_then(|llm| llm.active_embedding_provider.as_deref());

        let mut settings = match active {
            Some(provider) if provider != self.embedding.provider => {
                EmbeddingSettings::for_provider(provider).unwrap_or_else(|| EmbeddingSettings {
                    provider: provider.to_string(),
                    ..self.embedding.clone()
                })
            }
            _ => self.embedding.clone(),
        };

        if let Some(model) = self
            .get_provider_config(&settings.provider)
            .as_ref()
            .and_then(|p| p.embedding_model())
        {
            settings.model = model.to_string();
        }

        settings
    }

    /// Validate configuration for the active providers.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["openai", "ollama"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        let embedding = self.resolved_embedding();
        let known_embedders = ["openai", "ollama", "trigram"];
        if !known_embedders.contains(&embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                embedding.provider,
                known_embedders.join(", ")
            )));
        }

        if embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        for provider in [self.provider.as_str(), embedding.provider.as_str()] {
            if provider == "openai" && self.resolve_api_key(provider).is_none() {
                return Err(AppError::Config(
                    "OpenAI provider requires an API key (KEEPSAKE_API_KEY or apiKeyEnv)"
                        .to_string(),
                ));
            }
        }

        Ok(())
    }
}
