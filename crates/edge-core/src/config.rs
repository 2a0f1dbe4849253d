//! Processor configuration
//!
//! Passed as JSON through `initProcessorWithConfig` on Android, or loaded
//! from a TOML file by host-side tools. Every field has a default, so an
//! empty document is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EdgeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Low hysteresis threshold used when the caller does not pass one
    #[serde(default = "default_threshold1")]
    pub default_threshold1: i32,

    /// High hysteresis threshold used when the caller does not pass one
    #[serde(default = "default_threshold2")]
    pub default_threshold2: i32,

    /// `tracing` filter directive, e.g. `"info"` or `"edge_core=debug"`
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            default_threshold1: default_threshold1(),
            default_threshold2: default_threshold2(),
            log_filter: default_log_filter(),
        }
    }
}

impl ProcessorConfig {
    pub fn from_json(json: &str) -> Result<Self, EdgeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, EdgeError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, EdgeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Threshold order is not checked; unordered pairs go to Canny as-is.
    pub fn validate(&self) -> Result<(), EdgeError> {
        if self.log_filter.trim().is_empty() {
            return Err(EdgeError::Config("log_filter must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn default_thresholds(&self) -> (i32, i32) {
        (self.default_threshold1, self.default_threshold2)
    }
}

fn default_threshold1() -> i32 {
    50
}

fn default_threshold2() -> i32 {
    150
}

fn default_log_filter() -> String {
    "info".to_string()
}
