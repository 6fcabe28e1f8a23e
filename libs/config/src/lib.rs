//! # Torq AMM Engine Configuration
//!
//! Parameters shared by the pool invariant engine and the price oracle,
//! together with the loader that layers defaults, an optional TOML file and
//! `AMM__*` environment overrides.
//!
//! ## Usage
//!
//! ```rust
//! use amm_config::{EngineConfig, PoolParams};
//!
//! let config = EngineConfig::default();
//! assert_eq!(config.pool.swap_fee_bps, PoolParams::DEFAULT_SWAP_FEE_BPS);
//! config.validate().unwrap();
//! ```

pub mod engine_config;
pub mod params;

pub use engine_config::{load_config, EngineConfig};
pub use params::{ConfigValidationError, OracleParams, PoolParams, BPS_DENOMINATOR};
