//! Configuration for the entity tables

use crate::error::{Result, TableError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Environment variable for [`TableConfig::max_provenance_depth`]
pub const ENV_MAX_PROVENANCE_DEPTH: &str = "SF_TABLES_MAX_PROVENANCE_DEPTH";

/// Environment variable for [`TableConfig::initial_capacity`]
pub const ENV_INITIAL_CAPACITY: &str = "SF_TABLES_INITIAL_CAPACITY";

/// Environment variable for [`TableConfig::enable_metrics`]
pub const ENV_ENABLE_METRICS: &str = "SF_TABLES_ENABLE_METRICS";

/// Configuration for an entity table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Longest ancestor chain a provenance walk will produce
    /// Walks that reach it stop and mark the tree as truncated
    pub max_provenance_depth: usize,

    /// Capacity reserved for each map when a window starts
    pub initial_capacity: usize,

    /// Track provenance hit/miss and cycle counters
    pub enable_metrics: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_provenance_depth: 1024,
            initial_capacity: 0,
            enable_metrics: true,
        }
    }
}

impl TableConfig {
    /// Create a new builder for table configuration
    pub fn builder() -> TableConfigBuilder {
        TableConfigBuilder::default()
    }

    /// Load configuration from the environment, reading a `.env` file if present
    ///
    /// Unset variables fall back to defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            max_provenance_depth: env_or(ENV_MAX_PROVENANCE_DEPTH, defaults.max_provenance_depth)?,
            initial_capacity: env_or(ENV_INITIAL_CAPACITY, defaults.initial_capacity)?,
            enable_metrics: env_or(ENV_ENABLE_METRICS, defaults.enable_metrics)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_provenance_depth == 0 {
            return Err(TableError::ConfigError(
                "max_provenance_depth must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| TableError::ConfigError(format!("{} has invalid value '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}

/// Builder for table configuration
#[derive(Debug, Default)]
pub struct TableConfigBuilder {
    max_provenance_depth: Option<usize>,
    initial_capacity: Option<usize>,
    enable_metrics: Option<bool>,
}

impl TableConfigBuilder {
    /// Set the provenance depth limit
    pub fn max_provenance_depth(mut self, depth: usize) -> Self {
        self.max_provenance_depth = Some(depth);
        self
    }

    /// Set the per-map capacity reserved on construction and reset
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Enable or disable metrics collection
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Build the table configuration
    pub fn build(self) -> TableConfig {
        let defaults = TableConfig::default();

        TableConfig {
            max_provenance_depth: self
                .max_provenance_depth
                .unwrap_or(defaults.max_provenance_depth),
            initial_capacity: self.initial_capacity.unwrap_or(defaults.initial_capacity),
            enable_metrics: self.enable_metrics.unwrap_or(defaults.enable_metrics),
        }
    }

    /// Build and validate the table configuration
    pub fn build_validated(self) -> Result<TableConfig> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
