//! Configuration management for ragsync.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`<store_root>/.ragsync/config.yaml` or `RAGSYNC_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Provider and model identifiers live here so that the synchronizer and the
//! query engine never hard-code them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Embedding providers understood by the provider factory.
pub const EMBEDDING_PROVIDERS: [&str; 3] = ["mock", "ollama", "openai"];

/// Generation providers understood by the client factory.
pub const GENERATION_PROVIDERS: [&str; 2] = ["ollama", "openai"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root directory of the filesystem object store; buckets are subdirectories
    pub store_root: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Embedding provider selection
    pub embedding: EmbeddingSettings,

    /// Generation provider selection
    pub generation: GenerationSettings,
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingSettings {
    /// Provider name: "mock", "ollama", "openai"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Custom API endpoint
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    #[serde(rename = "apiKeyEnv", default)]
    pub api_key_env: Option<String>,

    /// Expected vector dimension; `None` accepts whatever the model returns
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// Maximum number of documents embedded concurrently during a sync
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    4
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            endpoint: None,
            api_key_env: None,
            dimensions: Some(384),
            concurrency: default_concurrency(),
        }
    }
}

impl EmbeddingSettings {
    /// Model, dimension and key defaults for a provider.
    ///
    /// Real models report their own dimension, so only the mock pins one.
    pub fn for_provider(provider: &str) -> Self {
        match provider {
            "mock" => Self::default(),
            "ollama" => Self {
                provider: provider.to_string(),
                model: "nomic-embed-text".to_string(),
                dimensions: None,
                ..Self::default()
            },
            "openai" => Self {
                provider: provider.to_string(),
                model: "text-embedding-3-small".to_string(),
                api_key_env: Some("OPENAI_API_KEY".to_string()),
                dimensions: None,
                ..Self::default()
            },
            other => Self {
                provider: other.to_string(),
                model: String::new(),
                dimensions: None,
                ..Self::default()
            },
        }
    }

    /// Select another provider. Provider-specific fields go back to that
    /// provider's defaults; concurrency is kept.
    pub fn switch_provider(&mut self, provider: &str) {
        if self.provider == provider {
            return;
        }
        let concurrency = self.concurrency;
        *self = Self::for_provider(provider);
        self.concurrency = concurrency;
    }
}

/// Generation provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationSettings {
    /// Provider name: "ollama", "openai"
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Custom API endpoint
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    #[serde(rename = "apiKeyEnv", default)]
    pub api_key_env: Option<String>,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(rename = "maxTokens", default)]
    pub max_tokens: Option<u32>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            endpoint: None,
            api_key_env: None,
            temperature: Some(0.3),
            max_tokens: Some(1000),
        }
    }
}

impl GenerationSettings {
    /// Model and key defaults for a provider.
    pub fn for_provider(provider: &str) -> Self {
        match provider {
            "ollama" => Self::default(),
            "openai" => Self {
                provider: provider.to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key_env: Some("OPENAI_API_KEY".to_string()),
                ..Self::default()
            },
            other => Self {
                provider: other.to_string(),
                model: String::new(),
                ..Self::default()
            },
        }
    }

    /// Select another provider, keeping the sampling settings.
    pub fn switch_provider(&mut self, provider: &str) {
        if self.provider == provider {
            return;
        }
        let temperature = self.temperature;
        let max_tokens = self.max_tokens;
        *self = Self::for_provider(provider);
        self.temperature = temperature;
        self.max_tokens = max_tokens;
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    store: Option<StoreSection>,
    embedding: Option<EmbeddingSettings>,
    generation: Option<GenerationSettings>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreSection {
    root: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            embedding: EmbeddingSettings::default(),
            generation: GenerationSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `RAGSYNC_STORE_ROOT`: Object store root directory
    /// - `RAGSYNC_CONFIG`: Path to config file
    /// - `RAGSYNC_EMBEDDING_PROVIDER` / `RAGSYNC_EMBEDDING_MODEL`
    /// - `RAGSYNC_GENERATION_PROVIDER` / `RAGSYNC_GENERATION_MODEL`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], but a store root or config file given on
    /// the command line decides where the config file is looked up.
    pub fn load_from(store_root: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(root) = std::env::var("RAGSYNC_STORE_ROOT") {
            config.store_root = PathBuf::from(root);
        }
        if let Some(root) = store_root {
            config.store_root = root;
        }

        if let Ok(config_file) = std::env::var("RAGSYNC_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }
        if config_file.is_some() {
            config.config_file = config_file;
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.store_root.join(".ragsync/config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        if let Ok(provider) = std::env::var("RAGSYNC_EMBEDDING_PROVIDER") {
            config.embedding.switch_provider(&provider);
        }
        if let Ok(model) = std::env::var("RAGSYNC_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Ok(provider) = std::env::var("RAGSYNC_GENERATION_PROVIDER") {
            config.generation.switch_provider(&provider);
        }
        if let Ok(model) = std::env::var("RAGSYNC_GENERATION_MODEL") {
            config.generation.model = model;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> Result<Self, serde_yaml::Error> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut result = self.clone();

        if let Some(root) = config_file.store.and_then(|s| s.root) {
            result.store_root = PathBuf::from(root);
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

        if let Some(generation) = config_file.generation {
            result.generation = generation;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        store_root: Option<PathBuf>,
        config_file: Option<PathBuf>,
        embedding_provider: Option<String>,
        embedding_model: Option<String>,
        generation_provider: Option<String>,
        generation_model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(store_root) = store_root {
            self.store_root = store_root;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = embedding_provider {
            self.embedding.switch_provider(&provider);
        }
        if let Some(model) = embedding_model {
            self.embedding.model = model;
        }

        if let Some(provider) = generation_provider {
            self.generation.switch_provider(&provider);
        }
        if let Some(model) = generation_model {
            self.generation.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Resolve an API key from the environment variable named in settings.
    pub fn resolve_api_key(api_key_env: Option<&str>) -> Option<String> {
        api_key_env.and_then(|var| std::env::var(var).ok())
    }

    /// Validate provider selection and provider-specific requirements.
    pub fn validate(&self) -> AppResult<()> {
        if !EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if !GENERATION_PROVIDERS.contains(&self.generation.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown generation provider: {}. Supported: {}",
                self.generation.provider,
                GENERATION_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.concurrency == 0 {
            return Err(AppError::Config(
                "embedding.concurrency must be at least 1".to_string(),
            ));
        }

        if self.embedding.provider == "openai" {
            require_key_env("embedding", self.embedding.api_key_env.as_deref())?;
        }
        if self.generation.provider == "openai" {
            require_key_env("generation", self.generation.api_key_env.as_deref())?;
        }

        Ok(())
    }
}

fn require_key_env(section: &str, api_key_env: Option<&str>) -> AppResult<()> {
    let var = api_key_env.ok_or_else(|| {
        AppError::Config(format!("{}.apiKeyEnv is required for openai", section))
    })?;

    if std::env::var(var).is_err() {
        return Err(AppError::Config(format!(
            "API key not found in environment variable: {}",
            var
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.embedding.provider, "mock");
        assert_eq!(config.generation.provider, "ollama");
        assert_eq!(config.embedding.concurrency, 4);
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            Some(PathBuf::from("/srv/corpus")),
            None,
            Some("ollama".to_string()),
            None,
            Some("openai".to_string()),
            None,
            None,
            true,
            false,
        );

        assert_eq!(config.store_root, PathBuf::from("/srv/corpus"));
        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.generation.provider, "openai");
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_provider_override_resets_model_defaults() {
        let config = AppConfig::default().with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            None,
            Some("openai".to_string()),
            None,
            None,
            false,
            false,
        );

        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert_eq!(config.embedding.dimensions, None);
        assert_eq!(config.embedding.concurrency, 4);
        assert_eq!(config.generation.model, "gpt-4o-mini");
        assert_eq!(config.generation.api_key_env.as_deref(), Some("OPENAI_API_KEY"));
        assert_eq!(config.generation.max_tokens, Some(1000));
    }

    #[test]
    fn test_model_override_applies_after_provider_switch() {
        let config = AppConfig::default().with_overrides(
            None,
            None,
            Some("openai".to_string()),
            Some("text-embedding-3-large".to_string()),
            None,
            Some("llama3.1".to_string()),
            None,
            false,
            false,
        );

        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.embedding.model, "text-embedding-3-large");
        assert_eq!(config.embedding.api_key_env.as_deref(), Some("OPENAI_API_KEY"));
        assert_eq!(config.generation.provider, "ollama");
        assert_eq!(config.generation.model, "llama3.1");
    }

    #[test]
    fn test_same_provider_keeps_settings() {
        let mut settings = EmbeddingSettings {
            provider: "ollama".to_string(),
            model: "mxbai-embed-large".to_string(),
            dimensions: Some(1024),
            ..Default::default()
        };
        settings.switch_provider("ollama");
        assert_eq!(settings.model, "mxbai-embed-large");
        assert_eq!(settings.dimensions, Some(1024));
    }

    #[test]
    fn test_merge_yaml() {
        let yaml = r#"
store:
  root: /data/buckets
embedding:
  provider: ollama
  model: nomic-embed-text
  dimensions: 768
generation:
  provider: ollama
  model: llama3.1
  maxTokens: 512
logging:
  level: debug
  color: false
"#;
        let merged = AppConfig::default().merge_yaml_str(yaml).unwrap();
        assert_eq!(merged.store_root, PathBuf::from("/data/buckets"));
        assert_eq!(merged.embedding.model, "nomic-embed-text");
        assert_eq!(merged.embedding.dimensions, Some(768));
        assert_eq!(merged.embedding.concurrency, 4);
        assert_eq!(merged.generation.max_tokens, Some(512));
        assert_eq!(merged.log_level.as_deref(), Some("debug"));
        assert!(merged.no_color);
    }

    #[test]
    fn test_merge_yaml_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "generation:\n  provider: ollama\n  model: mistral\n").unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.generation.model, "mistral");
        assert_eq!(merged.embedding, EmbeddingSettings::default());
    }

    #[test]
    fn test_load_from_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragsync.yaml");
        std::fs::write(&path, "generation:\n  provider: ollama\n  model: mistral\n").unwrap();

        let config = AppConfig::load_from(Some(dir.path().to_path_buf()), Some(path)).unwrap();
        assert_eq!(config.store_root, dir.path());
        assert_eq!(config.generation.model, "mistral");

        let missing = dir.path().join("absent.yaml");
        let err = AppConfig::load_from(None, Some(missing)).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.embedding.provider = "bedrock".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.generation.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_openai_requires_key_env() {
        let mut config = AppConfig::default();
        config.generation.provider = "openai".to_string();
        config.generation.api_key_env = None;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        config.generation.api_key_env = Some("RAGSYNC_TEST_SURELY_UNSET_KEY".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = AppConfig::default();
        config.embedding.concurrency = 0;
        assert!(config.validate().is_err());
    }
}
