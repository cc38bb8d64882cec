//! Configuration schema (querylens.toml)

use serde::{Deserialize, Serialize};

/// Marker that suppresses the table reference it precedes
pub const DEFAULT_IGNORE_UPSTREAM: &str = "@ignoreupstream";

/// Default size of the usage collection window
pub const DEFAULT_USAGE_PERIOD_IN_DAY: i64 = 7;

/// Largest accepted usage window, in days
pub const MAX_USAGE_PERIOD_IN_DAY: i64 = 3650;

/// Table usage collection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageConfig {
    /// Collect usage statistics from the audit log
    #[serde(default)]
    pub collect_table_usage: bool,

    /// Size of the collection window, in days
    #[serde(default = "default_usage_period")]
    pub usage_period_in_day: i64,

    /// Projects whose audit logs are read (defaults to the main project)
    #[serde(default)]
    pub usage_project_ids: Vec<String>,

    /// Extract join and filter conditions from query text
    #[serde(default = "default_true")]
    pub extract_conditions: bool,
}

fn default_usage_period() -> i64 {
    DEFAULT_USAGE_PERIOD_IN_DAY
}

fn default_true() -> bool {
    true
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            collect_table_usage: false,
            usage_period_in_day: DEFAULT_USAGE_PERIOD_IN_DAY,
            usage_project_ids: Vec::new(),
            extract_conditions: true,
        }
    }
}

impl UsageConfig {
    /// Projects to read logs from, falling back to `project_id`
    pub fn effective_project_ids(&self, project_id: &str) -> Vec<String> {
        if self.usage_project_ids.is_empty() {
            vec![project_id.to_string()]
        } else {
            self.usage_project_ids.clone()
        }
    }
}

/// Comment directives recognised during upstream resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveConfig {
    /// Token that excludes the following table reference from upstreams
    #[serde(default = "default_ignore_upstream")]
    pub ignore_upstream: String,
}

fn default_ignore_upstream() -> String {
    DEFAULT_IGNORE_UPSTREAM.to_string()
}

impl Default for DirectiveConfig {
    fn default() -> Self {
        Self {
            ignore_upstream: default_ignore_upstream(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Warehouse project the extractor runs against
    #[serde(default)]
    pub project_id: String,

    /// Usage collection
    #[serde(default)]
    pub usage: UsageConfig,

    /// Comment directives
    #[serde(default)]
    pub directives: DirectiveConfig,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        let period = config.usage.usage_period_in_day;
        if !(0..=MAX_USAGE_PERIOD_IN_DAY).contains(&period) {
            return Err(ConfigError::InvalidValue(format!(
                "usage.usage_period_in_day must be between 0 and {MAX_USAGE_PERIOD_IN_DAY}, got {period}"
            )));
        }

        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Projects whose audit logs feed usage collection
    pub fn usage_project_ids(&self) -> Vec<String> {
        self.usage.effective_project_ids(&self.project_id)
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
