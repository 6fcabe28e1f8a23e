//! # Torq AMM - Pool Invariant Engine and TWAP Oracle
//!
//! ## Purpose
//!
//! Two-asset constant-product liquidity pools with exact integer accounting,
//! plus a manipulation-resistant time-weighted price feed derived purely from
//! each pool's own trade history.
//!
//! ## Integration Points
//!
//! - **Host runtime**: balances, time and the event log come from a [`Ledger`]
//!   and a [`Clock`]; the ledger's nested checkpoints make every operation
//!   all-or-nothing
//! - **Registry**: [`PairFactory`] creates pools and supplies the protocol fee
//!   recipient and per-asset originators through [`FeeSettings`]
//! - **Callers**: liquidity providers and traders call [`Pool`] directly, or go
//!   through the [`Router`] for deadlines and minimum-output checks
//! - **Price consumers**: [`PriceOracle`] pulls cumulative prices from pools on
//!   `update` and answers spot and TWAP queries
//!
//! ## Architecture Role
//!
//! ```text
//! FixedPointMath ─┬─> FeeLib ─> Pool ──(cumulative prices)──> PriceOracle
//!                 └─────────────────┘      ^
//!                          Router ─────────┘
//! ```
//!
//! ## Precision
//!
//! - Amounts are `u128`; reserves are bounded to 112 bits and checked at commit
//! - Products, square roots and TWAP quotients use `U256`/`U512` intermediates
//! - Prices are UQ112x112 fixed point; cumulative accumulators wrap mod 2^256
//!   and timestamps wrap mod 2^32

pub mod error;
pub mod events;
pub mod fees;
pub mod host;
pub mod math;
pub mod oracle;
pub mod pool;
pub mod pool_traits;
pub mod registry;
pub mod router;
pub mod types;
pub mod v2_math;

pub use error::{LedgerError, MathError, OracleError, OracleResult, PoolError, PoolResult};
pub use events::Event;
pub use fees::{AccruedFees, FeeSplit};
pub use host::{Clock, InMemoryLedger, Ledger, ManualClock, SystemClock};
pub use math::{Uq112x112, U256};
pub use oracle::{
    current_cumulative_prices, extrapolated_cumulative_prices, Observation, PriceOracle,
};
pub use pool::{sort_assets, FlashSwapCallee, Pool, Reserves};
pub use pool_traits::AmmPool;
pub use registry::{FeeSettings, PairFactory, PairRegistry, ProtocolSettings};
pub use router::Router;
pub use types::Address;
pub use v2_math::V2Math;

pub use amm_config::{EngineConfig, OracleParams, PoolParams};

/// Decimal rendering of fixed-point prices
pub use rust_decimal::Decimal;
