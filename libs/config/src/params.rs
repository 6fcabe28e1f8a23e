//! Pool and oracle parameters
//!
//! All fee rates are expressed in basis points of the input amount. The swap
//! fee is the rate charged inside the constant-product check; the protocol and
//! creator rates are carved out of it and must never exceed it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Basis-point denominator (100% = 10_000 bps)
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Errors raised when a configuration is internally inconsistent
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("swap fee {swap_fee_bps} bps must be below 10000 bps")]
    SwapFeeTooHigh { swap_fee_bps: u16 },

    #[error(
        "protocol fee {protocol_fee_bps} bps + creator fee {creator_fee_bps} bps exceeds swap fee {swap_fee_bps} bps"
    )]
    FeeSplitExceedsSwapFee {
        protocol_fee_bps: u16,
        creator_fee_bps: u16,
        swap_fee_bps: u16,
    },

    #[error("minimum liquidity must be non-zero")]
    ZeroMinimumLiquidity,

    #[error("protocol share divisor must be non-zero")]
    ZeroShareDivisor,

    #[error("oracle cardinality {cardinality} must be at least 2")]
    CardinalityTooSmall { cardinality: usize },

    #[error("min update interval {min_update_interval}s must be in (0, {max_window}s]")]
    InvalidUpdateInterval {
        min_update_interval: u32,
        max_window: u32,
    },

    #[error("max time elapsed must be non-zero")]
    ZeroMaxTimeElapsed,
}

/// Pool invariant engine parameters, fixed per deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolParams {
    /// Fee charged on every input inside the K-check (30 = 0.3%)
    pub swap_fee_bps: u16,
    /// Share of each input routed to the protocol fee recipient
    pub protocol_fee_bps: u16,
    /// Share of each input routed to the input asset's originator
    pub creator_fee_bps: u16,
    /// Shares locked forever on the first mint
    pub minimum_liquidity: u64,
    /// `d` in `totalShares * (rootK - rootKLast) / (d * rootK + rootKLast)`;
    /// the protocol receives `1 / (d + 1)` of sqrt(K) growth
    pub protocol_share_divisor: u32,
}

impl PoolParams {
    pub const DEFAULT_SWAP_FEE_BPS: u16 = 30;
    pub const DEFAULT_PROTOCOL_FEE_BPS: u16 = 5;
    pub const DEFAULT_CREATOR_FEE_BPS: u16 = 5;
    pub const DEFAULT_MINIMUM_LIQUIDITY: u64 = 1_000;
    pub const DEFAULT_PROTOCOL_SHARE_DIVISOR: u32 = 5;

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if u32::from(self.swap_fee_bps) >= BPS_DENOMINATOR {
            return Err(ConfigValidationError::SwapFeeTooHigh {
                swap_fee_bps: self.swap_fee_bps,
            });
        }
        let carved = u32::from(self.protocol_fee_bps) + u32::from(self.creator_fee_bps);
        if carved > u32::from(self.swap_fee_bps) {
            return Err(ConfigValidationError::FeeSplitExceedsSwapFee {
                protocol_fee_bps: self.protocol_fee_bps,
                creator_fee_bps: self.creator_fee_bps,
                swap_fee_bps: self.swap_fee_bps,
            });
        }
        if self.minimum_liquidity == 0 {
            return Err(ConfigValidationError::ZeroMinimumLiquidity);
        }
        if self.protocol_share_divisor == 0 {
            return Err(ConfigValidationError::ZeroShareDivisor);
        }
        Ok(())
    }
}

impl Default for PoolParams {
    fn default() -> Self {
        Self {
            swap_fee_bps: Self::DEFAULT_SWAP_FEE_BPS,
            protocol_fee_bps: Self::DEFAULT_PROTOCOL_FEE_BPS,
            creator_fee_bps: Self::DEFAULT_CREATOR_FEE_BPS,
            minimum_liquidity: Self::DEFAULT_MINIMUM_LIQUIDITY,
            protocol_share_divisor: Self::DEFAULT_PROTOCOL_SHARE_DIVISOR,
        }
    }
}

/// Price oracle parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleParams {
    /// Number of observation slots kept per pool
    pub cardinality: usize,
    /// Minimum seconds between two updates of the same pool
    pub min_update_interval: u32,
    /// Longest averaging period and staleness bound (seconds)
    pub max_window: u32,
    /// Longest extrapolation allowed past a pool's last sync (seconds)
    pub max_time_elapsed: u32,
}

impl OracleParams {
    pub const DEFAULT_CARDINALITY: usize = 24;
    pub const DEFAULT_MIN_UPDATE_INTERVAL: u32 = 300;
    pub const DEFAULT_MAX_WINDOW: u32 = 86_400;
    pub const DEFAULT_MAX_TIME_ELAPSED: u32 = 7_200;

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.cardinality < 2 {
            return Err(ConfigValidationError::CardinalityTooSmall {
                cardinality: self.cardinality,
            });
        }
        if self.min_update_interval == 0 || self.min_update_interval > self.max_window {
            return Err(ConfigValidationError::InvalidUpdateInterval {
                min_update_interval: self.min_update_interval,
                max_window: self.max_window,
            });
        }
        if self.max_time_elapsed == 0 {
            return Err(ConfigValidationError::ZeroMaxTimeElapsed);
        }
        Ok(())
    }
}

impl Default for OracleParams {
    fn default() -> Self {
        Self {
            cardinality: Self::DEFAULT_CARDINALITY,
            min_update_interval: Self::DEFAULT_MIN_UPDATE_INTERVAL,
            max_window: Self::DEFAULT_MAX_WINDOW,
            max_time_elapsed: Self::DEFAULT_MAX_TIME_ELAPSED,
        }
    }
}
