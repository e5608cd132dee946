#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub actions: ActionsConfig,
    #[serde(default)]
    pub data: DataConfig,
    /// Overrides the on-disk location of databases, models and feedback
    /// files. Not persisted; set by tests and one-off invocations.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
    pub embedding_dimension: u32,
}

impl Default for OllamaConfig {
    #[inline]
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "nomic-embed-text:latest".to_string(),
            batch_size: 16,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

/// FAQ matching thresholds. A top score at or above `high_score` answers
/// directly; at or above `threshold` answers with suggestions attached;
/// below `threshold` the query falls through to intent classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchingConfig {
    pub top_k: usize,
    pub threshold: f32,
    pub high_score: f32,
}

impl Default for MatchingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            top_k: 3,
            threshold: 0.5,
            high_score: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub confidence_threshold: f32,
    /// Zero-shot predictions below this score escalate instead of
    /// triggering an action.
    pub zero_shot_floor: f32,
}

impl Default for ClassifierConfig {
    #[inline]
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            zero_shot_floor: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ActionsConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,
}

impl Default for ActionsConfig {
    #[inline]
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8808".to_string(),
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub catalog_file: PathBuf,
    pub action_map_file: PathBuf,
}

impl Default for DataConfig {
    #[inline]
    fn default() -> Self {
        Self {
            catalog_file: PathBuf::from("data/faq_catalog.toml"),
            action_map_file: PathBuf::from("data/intent_actions.json"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid threshold {1} for {0} (must be between 0 and 1)")]
    InvalidThreshold(&'static str, f32),
    #[error("Invalid top_k: {0} (must be at least 1)")]
    InvalidTopK(usize),
    #[error("Invalid action timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidTimeout(u64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            matching: MatchingConfig::default(),
            classifier: ClassifierConfig::default(),
            actions: ActionsConfig::default(),
            data: DataConfig::default(),
            base_dir: None,
        }
    }
}

impl Config {
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".erp-sentinel"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("erp-sentinel"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    #[inline]
    pub fn load() -> Result<Self> {
        let config_path =
            Self::config_file_path().context("Failed to determine config file path")?;
        Self::load_from(&config_path)
    }

    #[inline]
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = Self::config_dir().context("Failed to determine config directory")?;

        fs::create_dir_all(&config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.matching.validate()?;
        self.classifier.validate()?;
        self.actions.validate()?;
        Ok(())
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!(
            "{}://{}:{}",
            self.ollama.protocol, self.ollama.host, self.ollama.port
        );
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    /// Root directory for databases, models and feedback files.
    #[inline]
    pub fn base_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.base_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::config_dir(),
        }
    }

    #[inline]
    pub fn metadata_db_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.base_dir()?.join("metadata.db"))
    }

    #[inline]
    pub fn vectors_dir(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.base_dir()?.join("vectors"))
    }

    #[inline]
    pub fn models_dir(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.base_dir()?.join("models"))
    }

    #[inline]
    pub fn query_log_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.base_dir()?.join("logs").join("query_log.csv"))
    }

    #[inline]
    pub fn manual_tags_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.base_dir()?.join("logs").join("manual_tags.csv"))
    }

    #[inline]
    pub fn weekly_dataset_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.base_dir()?.join("retrain").join("weekly_dataset.csv"))
    }
}

impl OllamaConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;

        Ok(())
    }

    #[inline]
    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        let candidate = OllamaConfig {
            host: host.clone(),
            ..self.clone()
        };
        candidate.validate()?;
        self.host = host;
        Ok(())
    }

    #[inline]
    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }

    #[inline]
    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    #[inline]
    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if batch_size == 0 || batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }
}

fn validate_unit_interval(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) || value.is_nan() {
        return Err(ConfigError::InvalidThreshold(name, value));
    }
    Ok(())
}

impl MatchingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }
        validate_unit_interval("matching.threshold", self.threshold)?;
        validate_unit_interval("matching.high_score", self.high_score)?;
        Ok(())
    }
}

impl ClassifierConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_unit_interval("classifier.confidence_threshold", self.confidence_threshold)?;
        validate_unit_interval("classifier.zero_shot_floor", self.zero_shot_floor)?;
        Ok(())
    }
}

impl ActionsConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_seconds == 0 || self.timeout_seconds > 300 {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }
        Url::parse(&self.endpoint).map_err(|_| ConfigError::InvalidUrl(self.endpoint.clone()))?;
        Ok(())
    }
}
