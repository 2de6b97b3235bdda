//! KGX Configuration Management
//!
//! Handles configuration from TOML files and environment variables with
//! sensible defaults for development. The `[extraction]` table is required;
//! everything inside it has a default.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Backend names that disable a stage entirely
const DISABLED_BACKENDS: [&str; 4] = ["", "none", "null", "disabled"];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Extraction pipeline configuration
    pub extraction: ExtractionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::parse_toml(&content, path)
    }

    /// Parse from TOML text; the `[extraction]` table must be present
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse_toml(content, PathBuf::from("<inline>"))
    }

    fn parse_toml(content: &str, path: PathBuf) -> Result<Self, ConfigError> {
        let root: toml::Value = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            message: e.to_string(),
        })?;

        if !root.get("extraction").is_some_and(toml::Value::is_table) {
            return Err(ConfigError::MissingRequired("[extraction] table".to_string()));
        }

        root.try_into().map_err(|e: toml::de::Error| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Build from defaults plus environment variable overrides, without a
    /// config file
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Apply environment variable overrides (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        if let Ok(backend) = std::env::var("KGX_NER_BACKEND") {
            self.extraction.ner.backend = backend;
        }
        if let Ok(backend) = std::env::var("KGX_RE_BACKEND") {
            self.extraction.re.backend = backend;
        }
        if let Ok(endpoint) = std::env::var("KGX_ENDPOINT") {
            self.extraction.ner.params.endpoint = Some(endpoint.clone());
            self.extraction.re.params.endpoint = Some(endpoint);
        }
        if let Ok(threshold) = std::env::var("KGX_NER_THRESHOLD") {
            self.extraction.ner_threshold = parse_threshold("KGX_NER_THRESHOLD", &threshold)?;
        }
        if let Ok(threshold) = std::env::var("KGX_RE_THRESHOLD") {
            self.extraction.re_threshold = parse_threshold("KGX_RE_THRESHOLD", &threshold)?;
        }
        if let Ok(level) = std::env::var("KGX_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(self)
    }
}

fn parse_threshold(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Extraction pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Entity labels the NER stage should look for
    pub entity_labels: Vec<String>,

    /// Relation-type vocabulary for the RE stage; empty disables RE
    pub relation_types: Vec<String>,

    /// NER confidence threshold
    pub ner_threshold: f64,

    /// RE confidence threshold
    pub re_threshold: f64,

    /// Ask the NER backend for character spans
    pub with_spans: bool,

    /// NER backend selection
    pub ner: BackendConfig,

    /// RE backend selection
    pub re: BackendConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            entity_labels: Vec::new(),
            relation_types: Vec::new(),
            ner_threshold: 0.55,
            re_threshold: 0.50,
            with_spans: false,
            ner: BackendConfig::named("gliner2"),
            re: BackendConfig::named("none"),
        }
    }
}

/// Selection of one backend plus its parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Registered backend name
    pub backend: String,

    /// Backend-specific parameters
    pub params: BackendParams,
}

impl BackendConfig {
    pub fn named(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            params: BackendParams::default(),
        }
    }

    /// Whether this stage is switched off in configuration
    pub fn is_disabled(&self) -> bool {
        DISABLED_BACKENDS.contains(&self.backend.as_str())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::named("none")
    }
}

/// Parameters handed to a backend constructor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendParams {
    /// Model identifier; `name` is accepted as a legacy alias
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    /// Device hint forwarded to the inference server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// Inference server base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Backend version to report in run metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Anything else, recorded verbatim in run metadata
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {message}", path.display())]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.extraction.ner_threshold, 0.55);
        assert_eq!(config.extraction.re_threshold, 0.50);
        assert_eq!(config.extraction.ner.backend, "gliner2");
        assert!(config.extraction.re.is_disabled());
    }

    #[test]
    fn test_parse_full_extraction_table() {
        let config = AppConfig::from_toml_str(
            r#"
            [extraction]
            entity_labels = ["organization", "person"]
            relation_types = ["has_ceo"]
            ner_threshold = 0.6
            with_spans = true

            [extraction.ner]
            backend = "gliner2"

            [extraction.ner.params]
            model_name = "gliner2-base"
            device = "cuda:0"

            [extraction.re]
            backend = "gliner2_re"

            [extraction.re.params]
            name = "gliner2-base"
            "#,
        )
        .unwrap();

        assert_eq!(config.extraction.entity_labels.len(), 2);
        assert_eq!(config.extraction.ner_threshold, 0.6);
        assert_eq!(config.extraction.re_threshold, 0.50);
        assert!(config.extraction.with_spans);
        assert_eq!(
            config.extraction.ner.params.model_name.as_deref(),
            Some("gliner2-base")
        );
        // `name` is accepted as an alias for `model_name`
        assert_eq!(
            config.extraction.re.params.model_name.as_deref(),
            Some("gliner2-base")
        );
    }

    #[test]
    fn test_missing_extraction_table_rejected() {
        let err = AppConfig::from_toml_str("[logging]\nlevel = \"debug\"").unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(_)));
    }

    // Single test for the env override path; parallel tests must not share
    // the KGX_* namespace
    #[test]
    fn test_env_override_takes_precedence() {
        std::env::set_var("KGX_RE_BACKEND", "gliner2_re");
        std::env::set_var("KGX_RE_THRESHOLD", "0.65");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.extraction.re.backend, "gliner2_re");
        assert_eq!(config.extraction.re_threshold, 0.65);

        std::env::set_var("KGX_RE_THRESHOLD", "hot");
        let err = AppConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        std::env::remove_var("KGX_RE_BACKEND");
        std::env::remove_var("KGX_RE_THRESHOLD");
    }

    #[test]
    fn test_disabled_backend_sentinels() {
        for name in ["", "none", "null", "disabled"] {
            assert!(BackendConfig::named(name).is_disabled(), "{name:?}");
        }
        assert!(!BackendConfig::named("gliner2_re").is_disabled());
    }

    #[test]
    fn test_extra_params_survive() {
        let config = AppConfig::from_toml_str(
            r#"
            [extraction]
            entity_labels = ["organization"]

            [extraction.ner.params]
            model_name = "gliner2-base"
            batch_size = 16
            "#,
        )
        .unwrap();

        assert_eq!(
            config.extraction.ner.params.extra.get("batch_size"),
            Some(&serde_json::json!(16))
        );
    }
}
