//! Pipeline configuration file support.
//!
//! `churnwise.toml` names the data source, the artifact root, the schema and
//! model-search files, and the model registry. A handful of environment
//! variables override the deployment-specific values.

use churnwise_training::BalanceScope;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_MONGODB_URL: &str = "CHURNWISE_MONGODB_URL";
pub const ENV_MODEL_BUCKET: &str = "CHURNWISE_MODEL_BUCKET";
pub const ENV_ARTIFACT_DIR: &str = "CHURNWISE_ARTIFACT_DIR";

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root under which every run creates its timestamped directory.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Schema descriptor YAML.
    #[serde(default = "default_schema_file")]
    pub schema_file: PathBuf,

    /// Model-search YAML.
    #[serde(default = "default_model_config_file")]
    pub model_config_file: PathBuf,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    pub transformation: TransformationConfig,

    #[serde(default)]
    pub trainer: TrainerConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Mongo,
    Csv,
}

/// Where customer records are read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default = "default_mongodb_url")]
    pub mongodb_url: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Directory holding `<collection>.csv` when `kind = "csv"`.
    #[serde(default = "default_csv_dir")]
    pub csv_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Share of rows held out for testing, in `(0, 1)`.
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Cell value treated as missing.
    #[serde(default = "default_missing_token")]
    pub missing_token: String,
    #[serde(default = "default_feature_store_file")]
    pub feature_store_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationConfig {
    #[serde(default)]
    pub balance_scope: BalanceScope,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Minimum cross-validated score a model must reach.
    #[serde(default = "default_expected_score")]
    pub expected_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryKind {
    #[default]
    S3,
    Local,
}

/// Object store holding the production model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub kind: RegistryKind,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_model_key")]
    pub model_key: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Root directory when `kind = "local"`.
    #[serde(default = "default_registry_dir")]
    pub local_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifact")
}

fn default_schema_file() -> PathBuf {
    PathBuf::from("config/schema.yaml")
}

fn default_model_config_file() -> PathBuf {
    PathBuf::from("config/model.yaml")
}

fn default_mongodb_url() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "churnwise".to_string()
}

fn default_collection() -> String {
    "telco_customers".to_string()
}

fn default_csv_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_test_ratio() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_missing_token() -> String {
    "na".to_string()
}

fn default_feature_store_file() -> String {
    "customers.csv".to_string()
}

fn default_expected_score() -> f64 {
    0.6
}

fn default_bucket() -> String {
    "churnwise-model-registry".to_string()
}

fn default_model_key() -> String {
    "model-registry/model.bin".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_registry_dir() -> PathBuf {
    PathBuf::from("registry")
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            mongodb_url: default_mongodb_url(),
            database: default_database(),
            collection: default_collection(),
            csv_dir: default_csv_dir(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            test_ratio: default_test_ratio(),
            seed: default_seed(),
            missing_token: default_missing_token(),
            feature_store_file: default_feature_store_file(),
        }
    }
}

impl Default for TransformationConfig {
    fn default() -> Self {
        Self { balance_scope: BalanceScope::default(), seed: default_seed() }
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self { expected_score: default_expected_score() }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            kind: RegistryKind::default(),
            bucket: default_bucket(),
            model_key: default_model_key(),
            region: default_region(),
            local_dir: default_registry_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            schema_file: default_schema_file(),
            model_config_file: default_model_config_file(),
            source: SourceConfig::default(),
            ingestion: IngestionConfig::default(),
            transformation: TransformationConfig::default(),
            trainer: TrainerConfig::default(),
            registry: RegistryConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl From<ConfigError> for crate::error::PipelineError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound(path) => Self::NotFound(path),
            other => Self::Config(other.to_string()),
        }
    }
}

impl PipelineConfig {
    /// Default configuration file path.
    pub fn default_path() -> PathBuf {
        PathBuf::from("churnwise.toml")
    }

    /// Load configuration from a TOML file. Does not apply environment overrides.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, apply environment overrides, then validate again.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides_from(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::ReadError(format!("Failed to create directory: {}", e)))?;
        }

        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("Failed to write file: {}", e)))?;

        Ok(())
    }

    /// Override deployment values from `lookup`, normally the process environment.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_MONGODB_URL) {
            self.source.mongodb_url = url;
        }
        if let Some(bucket) = lookup(ENV_MODEL_BUCKET) {
            self.registry.bucket = bucket;
        }
        if let Some(dir) = lookup(ENV_ARTIFACT_DIR) {
            self.artifact_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let ratio = self.ingestion.test_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(ConfigError::InvalidValue(format!(
                "ingestion.test_ratio must lie in (0, 1), got {ratio}"
            )));
        }
        let expected = self.trainer.expected_score;
        if !(0.0..=1.0).contains(&expected) {
            return Err(ConfigError::InvalidValue(format!(
                "trainer.expected_score must lie in [0, 1], got {expected}"
            )));
        }
        if self.source.collection.trim().is_empty() {
            return Err(ConfigError::InvalidValue("source.collection must not be empty".to_string()));
        }
        if self.registry.bucket.trim().is_empty() || self.registry.model_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "registry.bucket and registry.model_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` for the HTTP server.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("churnwise.toml");
        std::fs::write(
            &path,
            r#"
artifact_dir = "runs"

[source]
kind = "csv"
collection = "customers"

[transformation]
balance_scope = "train_and_test"
"#,
        )
        .unwrap();

        let config = PipelineConfig::load_from_file(&path).unwrap();
        assert_eq!(config.artifact_dir, PathBuf::from("runs"));
        assert_eq!(config.source.kind, SourceKind::Csv);
        assert_eq!(config.source.collection, "customers");
        assert_eq!(config.transformation.balance_scope, BalanceScope::TrainAndTest);
        assert!((config.ingestion.test_ratio - 0.2).abs() < f64::EPSILON);
        assert!((config.trainer.expected_score - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.registry.kind, RegistryKind::S3);
    }

    #[test]
    fn test_missing_file() {
        let result = PipelineConfig::load_from_file(Path::new("/nonexistent/churnwise.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("churnwise.toml");
        std::fs::write(&path, "[ingestion\ntest_ratio = ").unwrap();
        assert!(matches!(PipelineConfig::load_from_file(&path), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_ratio_out_of_range_rejected() {
        for ratio in [0.0, 1.0, 2.0, -0.1] {
            let mut config = PipelineConfig::default();
            config.ingestion.test_ratio = ratio;
            assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))), "ratio {ratio}");
        }
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_MONGODB_URL, "mongodb://db:27017"),
            (ENV_MODEL_BUCKET, "prod-models"),
            (ENV_ARTIFACT_DIR, "/var/churnwise"),
        ]);
        let mut config = PipelineConfig::default();
        config.apply_env_overrides_from(|name| env.get(name).map(ToString::to_string));

        assert_eq!(config.source.mongodb_url, "mongodb://db:27017");
        assert_eq!(config.registry.bucket, "prod-models");
        assert_eq!(config.artifact_dir, PathBuf::from("/var/churnwise"));
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("churnwise.toml");
        let mut config = PipelineConfig::default();
        config.registry.kind = RegistryKind::Local;
        config.server.port = 8080;

        config.save_to_file(&path).unwrap();
        let loaded = PipelineConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.server_addr(), "0.0.0.0:8080");
    }
}
