use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants;
use crate::error::{PipelineError, Result};

/// Top-level pipeline configuration, read from `pipeline.toml`.
/// Every section is optional; a missing file yields the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub storage: StorageConfig,
    pub catalog: CatalogConfig,
    pub inference: InferenceConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Directory tree under `root`
    Fs,
    /// REST object storage at `endpoint`
    Http,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    pub root: PathBuf,
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub raw_prefix: String,
    pub structured_prefix: String,
    pub analyzed_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            bucket: constants::DEFAULT_BUCKET.to_string(),
            root: PathBuf::from("data"),
            endpoint: None,
            token: None,
            raw_prefix: constants::DEFAULT_RAW_PREFIX.to_string(),
            structured_prefix: constants::DEFAULT_STRUCTURED_PREFIX.to_string(),
            analyzed_prefix: constants::DEFAULT_ANALYZED_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: constants::DEFAULT_CATALOG_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceBackend {
    Http,
    /// Offline runs: every completion fails, so every record is marked `analysis_failed`
    Fake,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub backend: InferenceBackend,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model_id: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            backend: InferenceBackend::Http,
            endpoint: None,
            api_key: None,
            model_id: constants::DEFAULT_MODEL_ID.to_string(),
            temperature: constants::DEFAULT_TEMPERATURE,
            max_tokens: constants::DEFAULT_MAX_TOKENS,
        }
    }
}

impl PipelineConfig {
    /// Load from `path`, falling back to defaults when the file does not exist,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path.is_some();
        let config_path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("PIPELINE_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_CONFIG_PATH));

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).map_err(|e| {
                PipelineError::Config(format!(
                    "Failed to read config file '{}': {}",
                    config_path.display(),
                    e
                ))
            })?;
            info!("Loaded configuration from {}", config_path.display());
            Self::from_toml(&content)?
        } else if explicit {
            return Err(PipelineError::Config(format!(
                "Config file '{}' does not exist",
                config_path.display()
            )));
        } else {
            debug!("No config file at {}, using defaults", config_path.display());
            Self::default()
        };

        config.apply_env_overrides();
        config.check()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(bucket) = var("PIPELINE_BUCKET") {
            self.storage.bucket = bucket;
        }
        if let Some(root) = var("PIPELINE_STORAGE_ROOT") {
            self.storage.root = PathBuf::from(root);
        }
        if let Some(token) = var("PIPELINE_STORAGE_TOKEN") {
            self.storage.token = Some(token);
        }
        if let Some(url) = var("PIPELINE_CATALOG_URL") {
            self.catalog.url = url;
        }
        if let Some(endpoint) = var("PIPELINE_INFERENCE_ENDPOINT") {
            self.inference.endpoint = Some(endpoint);
        }
        if let Some(key) = var("PIPELINE_INFERENCE_API_KEY") {
            self.inference.api_key = Some(key);
        }
    }

    fn check(&self) -> Result<()> {
        if self.storage.bucket.trim().is_empty() {
            return Err(PipelineError::Config("storage.bucket must not be empty".to_string()));
        }
        if self.storage.backend == StorageBackend::Http && self.storage.endpoint.is_none() {
            return Err(PipelineError::Config(
                "storage.endpoint is required for the http storage backend".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.inference.temperature) {
            return Err(PipelineError::Config(format!(
                "inference.temperature must be within [0, 1], got {}",
                self.inference.temperature
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config.storage.bucket, constants::DEFAULT_BUCKET);
        assert_eq!(config.storage.backend, StorageBackend::Fs);
        assert_eq!(config.catalog.url, constants::DEFAULT_CATALOG_URL);
        assert_eq!(config.inference.model_id, constants::DEFAULT_MODEL_ID);
        assert_eq!(config.inference.max_tokens, 100);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let toml = r#"
            [storage]
            bucket = "catalog-bucket"
            raw_prefix = "raw"

            [inference]
            backend = "fake"
            temperature = 0.2
        "#;
        let config = PipelineConfig::from_toml(toml).unwrap();
        assert_eq!(config.storage.bucket, "catalog-bucket");
        assert_eq!(config.storage.raw_prefix, "raw");
        assert_eq!(config.storage.structured_prefix, constants::DEFAULT_STRUCTURED_PREFIX);
        assert_eq!(config.inference.backend, InferenceBackend::Fake);
        assert!((config.inference.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_http_storage_requires_endpoint() {
        let config = PipelineConfig::from_toml("[storage]\nbackend = \"http\"\n").unwrap();
        assert!(matches!(config.check(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = PipelineConfig::from_toml(include_str!("../pipeline.toml")).unwrap();
        assert!(config.check().is_ok());
        assert_eq!(config.inference.backend, InferenceBackend::Fake);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = PipelineConfig::from_toml("[storage]\nbackend = \"s4\"\n");
        assert!(matches!(result, Err(PipelineError::Toml(_))));
    }
}
