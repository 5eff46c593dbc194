//! Market configuration
//!
//! The matching core needs very little configuration: the number of shard
//! workers the symbol space is spread over. The struct still follows the
//! usual load / validate split so the binary can read it from a YAML file
//! or override it from flags.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Shard count used when none is configured.
pub const DEFAULT_SHARD_COUNT: usize = 4;

/// Errors raised while loading or validating a [`MarketConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The shard count was zero
    #[error("shard count must be at least 1")]
    ZeroShards,
}

/// Configuration for a [`crate::market::Market`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarketConfig {
    /// Number of shard workers; symbols map to shards by `symbol_id % shards`
    pub shards: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARD_COUNT,
        }
    }
}

impl MarketConfig {
    /// Creates a config with an explicit shard count.
    pub fn with_shards(shards: usize) -> Self {
        Self { shards }
    }

    /// Loads and validates a config from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values the market cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shards == 0 {
            return Err(ConfigError::ZeroShards);
        }
        Ok(())
    }
}
