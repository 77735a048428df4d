//! Configuration module for the load generator
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`LOADGEN_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use loadgen::config::LoadgenConfig;
//!
//! let config = LoadgenConfig::default();
//! assert_eq!(config.server.port, 3000);
//! assert_eq!(config.generator.interval_ms, 1000);
//!
//! let toml = r#"
//! [generator]
//! interval_ms = 250
//! "#;
//! let config: LoadgenConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.generator.interval_ms, 250);
//! ```

pub mod error;
pub mod generator;
pub mod logging;
pub mod server;
pub mod target;

pub use error::ConfigError;
pub use generator::GeneratorConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use server::ServerConfig;
pub use target::{TargetConfig, TargetMethod};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the load generator and its dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoadgenConfig {
    /// Dashboard HTTP server
    pub server: ServerConfig,
    /// Sample endpoint under load
    pub target: TargetConfig,
    /// Request loop and rolling windows
    pub generator: GeneratorConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl LoadgenConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply `LOADGEN_*` environment variable overrides.
    ///
    /// Invalid values are silently ignored (the previous value is kept).
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using an arbitrary variable lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("LOADGEN_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(host) = lookup("LOADGEN_HOST") {
            self.server.host = host;
        }
        if let Some(url) = lookup("LOADGEN_TARGET_URL") {
            self.target.base_url = url;
        }
        if let Some(interval) = lookup("LOADGEN_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.generator.interval_ms = interval;
        }
        if let Some(level) = lookup("LOADGEN_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOADGEN_LOG_FORMAT").and_then(|v| v.parse().ok()) {
            self.logging.format = format;
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::validation(
                "server.port",
                "port must be non-zero",
            ));
        }

        let base_url = self.target.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::validation(
                "target.base_url",
                "URL cannot be empty",
            ));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::validation(
                "target.base_url",
                "URL must start with http:// or https://",
            ));
        }

        if self.target.timeout_ms == Some(0) {
            return Err(ConfigError::validation(
                "target.timeout_ms",
                "timeout must be non-zero when set",
            ));
        }

        if self.generator.interval_ms == 0 {
            return Err(ConfigError::validation(
                "generator.interval_ms",
                "interval must be at least 1ms",
            ));
        }
        if self.generator.log_capacity == 0 {
            return Err(ConfigError::validation(
                "generator.log_capacity",
                "capacity must be non-zero",
            ));
        }
        if self.generator.chart_capacity == 0 {
            return Err(ConfigError::validation(
                "generator.chart_capacity",
                "capacity must be non-zero",
            ));
        }

        Ok(())
    }
}
