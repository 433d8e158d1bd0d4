//! Configuration management for imgsearch.
//!
//! Configuration is layered, lowest precedence first:
//! - Built-in defaults
//! - Config file (`.imgsearch/config.yaml` or `--config`)
//! - Environment variables
//! - Command-line flags
//!
//! Connection parameters and the embedding dimension are always supplied at
//! startup; nothing here is written back to disk.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Encoder providers understood by the encoder factory.
pub const KNOWN_PROVIDERS: [&str; 2] = ["hash", "http"];

/// Distance metrics understood by the store.
pub const KNOWN_METRICS: [&str; 2] = ["cosine", "l2"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Workspace root (contains .imgsearch/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    pub storage: StorageConfig,

    pub encoder: EncoderConfig,
}

/// Where and how embeddings are stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// SQLite database file; defaults to `.imgsearch/index.sqlite`
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Collection (table) name
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Embedding dimension, fixed at collection creation
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Distance metric: "cosine" or "l2"
    #[serde(default = "default_metric")]
    pub metric: String,
}

/// Encoder provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncoderConfig {
    /// Provider name: "hash" or "http"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default = "default_model")]
    pub model: String,

    /// Inference server base URL (http provider only)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Embedding vector dimensions produced by the model
    #[serde(default = "default_dimension")]
    pub dimensions: usize,

    /// Whether to normalize embeddings to unit length
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Maximum number of inputs per encoder call
    #[serde(default = "default_batch_size", rename = "batchSize")]
    pub batch_size: usize,

    /// Request timeout in seconds (http provider only)
    #[serde(default = "default_timeout_secs", rename = "timeoutSecs")]
    pub timeout_secs: u64,
}

fn default_collection() -> String {
    "image_embeddings".to_string()
}

fn default_dimension() -> usize {
    512
}

fn default_metric() -> String {
    "cosine".to_string()
}

fn default_provider() -> String {
    "hash".to_string()
}

fn default_model() -> String {
    "hash-v1".to_string()
}

fn default_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_normalize() -> bool {
    true
}

fn default_batch_size() -> usize {
    32
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: None,
            collection: default_collection(),
            dimension: default_dimension(),
            metric: default_metric(),
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            endpoint: default_endpoint(),
            dimensions: default_dimension(),
            normalize: default_normalize(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    storage: Option<StorageConfig>,
    encoder: Option<EncoderConfig>,
    logging: Option<LoggingConfig>,
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
            log_level: None,
            verbose: false,
            no_color: false,
            storage: StorageConfig::default(),
            encoder: EncoderConfig::default(),
        }
    }
}

/// CLI flags that override loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub workspace: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub collection: Option<String>,
    pub encoder: Option<String>,
    pub log_level: Option<String>,
    pub verbose: bool,
    pub no_color: bool,
}

impl AppConfig {
    /// Load configuration from defaults, config file and environment.
    ///
    /// Environment variables:
    /// - `IMGSEARCH_WORKSPACE`: workspace path
    /// - `IMGSEARCH_CONFIG`: config file path
    /// - `IMGSEARCH_DATABASE`: SQLite database path
    /// - `IMGSEARCH_COLLECTION`: collection name
    /// - `IMGSEARCH_ENCODER`: encoder provider
    /// - `IMGSEARCH_ENDPOINT`: inference server URL
    /// - `RUST_LOG`: log level
    /// - `NO_COLOR`: disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_with(Overrides::default())
    }

    /// Load configuration, then apply CLI overrides.
    ///
    /// Workspace and config file flags are applied first so that they decide
    /// which YAML file is read.
    pub fn load_with(overrides: Overrides) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("IMGSEARCH_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }
        if let Some(workspace) = &overrides.workspace {
            config.workspace = workspace.clone();
        }

        if let Ok(config_file) = std::env::var("IMGSEARCH_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }
        if let Some(config_file) = &overrides.config_file {
            config.config_file = Some(config_file.clone());
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.state_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.apply_env();
        Ok(config.with_overrides(overrides))
    }

    fn apply_env(&mut self) {
        if let Ok(database) = std::env::var("IMGSEARCH_DATABASE") {
            self.storage.database = Some(PathBuf::from(database));
        }
        if let Ok(collection) = std::env::var("IMGSEARCH_COLLECTION") {
            self.storage.collection = collection;
        }
        if let Ok(provider) = std::env::var("IMGSEARCH_ENCODER") {
            self.encoder.provider = provider;
        }
        if let Ok(endpoint) = std::env::var("IMGSEARCH_ENDPOINT") {
            self.encoder.endpoint = endpoint;
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }
        if std::env::var_os("NO_COLOR").is_some() {
            self.no_color = true;
        }
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

        if let Some(storage) = config_file.storage {
            result.storage = storage;
        }

        if let Some(encoder) = config_file.encoder {
            result.encoder = encoder;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides; flags take precedence over everything else.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(workspace) = overrides.workspace {
            self.workspace = workspace;
        }
        if let Some(config_file) = overrides.config_file {
            self.config_file = Some(config_file);
        }
        if let Some(database) = overrides.database {
            self.storage.database = Some(database);
        }
        if let Some(collection) = overrides.collection {
            self.storage.collection = collection;
        }
        if let Some(encoder) = overrides.encoder {
            self.encoder.provider = encoder;
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = Some(log_level);
        }
        if overrides.verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }
        if overrides.no_color {
            self.no_color = true;
        }
        self
    }

    /// Path to the .imgsearch state directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(".imgsearch")
    }

    /// Resolved SQLite database path.
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database
            .clone()
            .unwrap_or_else(|| self.state_dir().join("index.sqlite"))
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.encoder.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown encoder provider: {}. Supported: {}",
                self.encoder.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_METRICS.contains(&self.storage.metric.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown distance metric: {}. Supported: {}",
                self.storage.metric,
                KNOWN_METRICS.join(", ")
            )));
        }

        if self.storage.dimension == 0 {
            return Err(AppError::Config(
                "Embedding dimension must be greater than zero".to_string(),
            ));
        }

        if self.encoder.dimensions != self.storage.dimension {
            return Err(AppError::Config(format!(
                "Encoder produces {}-dimensional embeddings but the collection expects {}",
                self.encoder.dimensions, self.storage.dimension
            )));
        }

        if self.encoder.batch_size == 0 {
            return Err(AppError::Config(
                "Encoder batch size must be greater than zero".to_string(),
            ));
        }

        validate_collection_name(&self.storage.collection)
    }
}

/// Collection names become SQL identifiers: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_collection_name(name: &str) -> AppResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Invalid collection name '{}': use letters, digits and underscores",
            name
        )))
    }
}
