//! Engine Configuration Module
//!
//! Loads [`EngineConfig`] from built-in defaults, an optional TOML file and
//! environment overrides (`AMM__POOL__SWAP_FEE_BPS=25` style), then validates
//! the result before handing it to the pool factory and the oracle.

use crate::params::{ConfigValidationError, OracleParams, PoolParams};
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "AMM";

/// Complete engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pool: PoolParams,
    pub oracle: OracleParams,
}

impl EngineConfig {
    /// Load configuration, layering file and environment over defaults
    ///
    /// A missing file is not an error: defaults and environment still apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = toml::to_string(&Self::default())
            .context("Failed to render default configuration")?;

        let mut builder =
            Config::builder().add_source(File::from_str(&defaults, FileFormat::Toml));

        if let Some(path) = path {
            if path.exists() {
                info!("Loading engine config: {:?}", path);
            } else {
                warn!("Engine config not found, using defaults: {:?}", path);
            }
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .context("Failed to build engine configuration")?
            .try_deserialize()
            .context("Failed to deserialize engine configuration")?;

        config
            .validate()
            .context("Engine configuration failed validation")?;
        debug!(?config, "Engine configuration loaded");
        Ok(config)
    }

    /// Parse configuration from an in-memory TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse engine TOML")?;
        config
            .validate()
            .context("Engine configuration failed validation")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.pool.validate()?;
        self.oracle.validate()
    }
}

/// Convenience function to load configuration from an optional file
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    EngineConfig::load(path)
}
