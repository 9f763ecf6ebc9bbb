//! Configuration for the heatlink daemon.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::registers::{SignalDescriptor, SignalKind};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatlinkConfig {
    /// The controller to poll
    pub device: DeviceConfig,

    /// Named signals backed by the controller's registers and coils
    pub signals: Vec<SignalConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection and scheduling settings for the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Host address (IP or hostname)
    pub host: String,

    /// TCP port (default: 502)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Modbus unit/slave ID (1-247)
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,

    /// Per-operation timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Poll period in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_port() -> u16 {
    502
}

fn default_unit_id() -> u8 {
    1
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

/// Configuration for a single named signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Signal name, unique within the catalogue
    pub name: String,

    /// Register address (float32) or coil bit index
    pub address: u16,

    /// Signal kind: "float32" or "coil"
    #[serde(rename = "type")]
    pub kind: SignalKind,

    /// Inclusive lower bound for accepted write values
    pub min: Option<f32>,

    /// Inclusive upper bound for accepted write values
    pub max: Option<f32>,
}

impl SignalConfig {
    /// Convert to the immutable descriptor used by the register map.
    pub fn descriptor(&self) -> SignalDescriptor {
        SignalDescriptor {
            name: self.name.clone(),
            address: self.address,
            kind: self.kind,
            valid_range: match (self.min, self.max) {
                (Some(min), Some(max)) => Some((min, max)),
                _ => None,
            },
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json"
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl HeatlinkConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: HeatlinkConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Address-level checks (overlaps, duplicates) happen when the register
    /// map is built from the descriptors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.host.is_empty() {
            return Err(ConfigError::Validation(
                "Device host cannot be empty".to_string(),
            ));
        }

        if self.device.unit_id == 0 {
            return Err(ConfigError::Validation(
                "unit_id must be 1-247".to_string(),
            ));
        }

        if self.device.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.device.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.signals.is_empty() {
            return Err(ConfigError::Validation(
                "At least one signal must be configured".to_string(),
            ));
        }

        for signal in &self.signals {
            if signal.name.is_empty() {
                return Err(ConfigError::Validation(
                    "Signal name cannot be empty".to_string(),
                ));
            }

            if signal.min.is_some() != signal.max.is_some() {
                return Err(ConfigError::Validation(format!(
                    "Signal '{}': min and max must be given together",
                    signal.name
                )));
            }

            if signal.kind == SignalKind::Coil && signal.min.is_some() {
                return Err(ConfigError::Validation(format!(
                    "Signal '{}': ranges apply to float32 signals only",
                    signal.name
                )));
            }
        }

        Ok(())
    }

    /// Descriptors for every configured signal, in declaration order.
    pub fn descriptors(&self) -> Vec<SignalDescriptor> {
        self.signals.iter().map(SignalConfig::descriptor).collect()
    }
}
