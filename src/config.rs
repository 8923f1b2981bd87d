//! Configuration management for the valuation service

use crate::forecast::GrowthProjection;
use crate::types::verdict::VerdictThresholds;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Environment variable pointing at an alternative config file
pub const CONFIG_PATH_ENV: &str = "URBANVALUATE_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub models: ModelsConfig,
    #[serde(default)]
    pub verdict: VerdictThresholds,
    #[serde(default)]
    pub forecast: GrowthProjection,
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject valuation requests arrive on
    pub request_subject: String,
    /// Queue group shared by service instances
    #[serde(default)]
    pub queue_group: Option<String>,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Directory containing the ONNX model files
    pub models_dir: String,
    /// Investment classifier file name
    #[serde(default = "default_classifier_file")]
    pub classifier_file: String,
    /// Price regressor file name
    #[serde(default = "default_regressor_file")]
    pub regressor_file: String,
    /// Number of threads for ONNX inference per model (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

fn default_classifier_file() -> String {
    "rf_classifier_pipeline.onnx".to_string()
}

fn default_regressor_file() -> String {
    "rf_regressor_pipeline.onnx".to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            models_dir: "models".to_string(),
            classifier_file: default_classifier_file(),
            regressor_file: default_regressor_file(),
            onnx_threads: default_onnx_threads(),
        }
    }
}

/// Request handling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Maximum requests evaluated concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    pub metrics_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from `$URBANVALUATE_CONFIG` or the default file
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config/config.toml".to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                request_subject: "valuate.requests".to_string(),
                queue_group: Some("urbanvaluate".to_string()),
            },
            models: ModelsConfig::default(),
            verdict: VerdictThresholds::default(),
            forecast: GrowthProjection::default(),
            service: ServiceConfig {
                workers: 4,
                metrics_interval_secs: 60,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.models.classifier_file, "rf_classifier_pipeline.onnx");
        assert_eq!(config.verdict.high, 0.75);
        assert_eq!(config.verdict.moderate, 0.50);
        assert_eq!(config.forecast.annual_growth_rate, 0.08);
        assert_eq!(config.forecast.horizon_years, 5);
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[nats]
url = "nats://nats:4222"
request_subject = "valuate.requests"

[models]
models_dir = "/srv/models"

[verdict]
moderate = 0.4
high = 0.8

[service]
workers = 2
metrics_interval_secs = 30

[logging]
level = "debug"
format = "json"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.nats.url, "nats://nats:4222");
        assert_eq!(config.models.models_dir, "/srv/models");
        assert_eq!(config.models.regressor_file, "rf_regressor_pipeline.onnx");
        assert_eq!(config.verdict.high, 0.8);
        // Missing section falls back to the 8% / 5 year projection
        assert_eq!(config.forecast, GrowthProjection::default());
        assert_eq!(config.service.workers, 2);
    }

    #[test]
    fn test_shipped_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/config.toml");
        let config = AppConfig::load_from_path(path).unwrap();
        assert_eq!(config.nats.request_subject, "valuate.requests");
        assert_eq!(config.models.models_dir, "models");
    }
}
