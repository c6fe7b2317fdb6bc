use domain::services::FailurePolicy;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::logging::LogFormat;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// What a rule failure does to the rest of an evaluation pass.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Buffer size of the in-process alert channel.
    #[serde(default = "default_alert_channel_capacity")]
    pub alert_channel_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Newline-delimited JSON input; "-" reads standard input.
    #[serde(default = "default_telemetry_source")]
    pub source: String,

    /// Geofence and rule catalog (JSON). Optional.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_listen_addr")]
    pub listen_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: default_metrics_listen_addr(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_alert_channel_capacity() -> usize {
    1024
}
fn default_telemetry_source() -> String {
    "-".to_string()
}
fn default_metrics_listen_addr() -> String {
    "0.0.0.0:9100".to_string()
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with TRACKER__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("TRACKER").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Built entirely from embedded defaults and overrides, without config files.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [logging]
            level = "info"
            format = "json"

            [engine]
            failure_policy = "fail_fast"
            alert_channel_capacity = 1024

            [telemetry]
            source = "-"

            [metrics]
            enabled = false
            listen_addr = "0.0.0.0:9100"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.telemetry.source.trim().is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "TRACKER__TELEMETRY__SOURCE must name a file or \"-\"".to_string(),
            ));
        }

        self.logging.format.parse::<LogFormat>()?;

        if self.engine.alert_channel_capacity == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "alert_channel_capacity cannot be 0".to_string(),
            ));
        }

        if self.metrics.enabled {
            self.metrics_addr()?;
        }

        Ok(())
    }

    pub fn metrics_addr(&self) -> Result<SocketAddr, ConfigValidationError> {
        self.metrics.listen_addr.parse().map_err(|_| {
            ConfigValidationError::InvalidValue(format!(
                "metrics listen_addr is not a socket address: {}",
                self.metrics.listen_addr
            ))
        })
    }

    /// Whether telemetry is read from standard input.
    pub fn reads_stdin(&self) -> bool {
        self.telemetry.source == "-"
    }
}
