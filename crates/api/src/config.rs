//! Application configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `HAZARD_*` environment variables (`__` separates sections,
//! e.g. `HAZARD_ALERT__CONFIRM_DELAY_MS=0`).

use std::path::PathBuf;

use alerting::AlertConfig;
use camera_capture::CameraConfig;
use inference_engine::PreprocessConfig;
use serde::{Deserialize, Serialize};
use serial_distance::SerialConfig;
use thiserror::Error;
use tracing::Level;

/// Config file read when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "hazard-monitor.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "HAZARD";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Model section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// ONNX model; the mock model is used when unset
    pub path: Option<PathBuf>,
    /// Label/shape metadata; defaults to `metadata.json` next to the model
    pub metadata_path: Option<PathBuf>,
    /// Preprocessing applied before inference
    pub preprocess: PreprocessConfig,
    /// Scores returned by the mock model
    pub mock_scores: Vec<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            metadata_path: None,
            preprocess: PreprocessConfig::default(),
            mock_scores: vec![0.05, 0.9, 0.05],
        }
    }
}

impl ModelConfig {
    /// Metadata location: explicit path, else beside the model
    pub fn metadata_location(&self) -> Option<PathBuf> {
        self.metadata_path.clone().or_else(|| {
            self.path
                .as_ref()
                .map(|model| model.with_file_name("metadata.json"))
        })
    }
}

/// HTTP status server section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn max_level(&self) -> Result<Level, ConfigError> {
        self.level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level {:?}", self.level)))
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub model: ModelConfig,
    pub serial: SerialConfig,
    pub alert: AlertConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from `path` (optional) and the `HAZARD_*` environment
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Self::load_with_env(path, ENV_PREFIX)
    }

    /// Load from `path` (optional) and variables under `prefix`
    pub fn load_with_env(path: &str, prefix: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.fps == 0 {
            return Err(ConfigError::Invalid("camera.fps must be positive".into()));
        }
        if !(0.0..=100.0).contains(&self.alert.confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "alert.confidence_threshold must be within 0..=100, got {}",
                self.alert.confidence_threshold
            )));
        }
        if self.alert.distance_threshold_cm <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "alert.distance_threshold_cm must be positive, got {}",
                self.alert.distance_threshold_cm
            )));
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Invalid("serial.baud_rate must be positive".into()));
        }
        self.logging.max_level()?;
        Ok(())
    }
}
