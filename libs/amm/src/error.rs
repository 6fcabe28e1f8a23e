//! Error types for the liquidity engine
//!
//! Every failure is surfaced to the caller as a tagged reason. Precondition
//! and rate-limit failures are raised before any mutation; invariant and
//! external-call failures are raised after provisional mutation and the whole
//! operation is rolled back by the host ledger.

use crate::types::Address;
use thiserror::Error;

/// Arithmetic failures in fixed-point and wide-integer helpers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Division by zero")]
    DivisionByZero,
}

/// Failures reported by the host ledger
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance of {asset} for {holder}: needed {needed}, available {available}")]
    InsufficientBalance {
        asset: Address,
        holder: Address,
        needed: u128,
        available: u128,
    },

    #[error("Transfer of {asset} rejected by the asset")]
    TransferRejected { asset: Address },

    #[error("Balance of {asset} for {holder} would overflow")]
    BalanceOverflow { asset: Address, holder: Address },
}

/// Pool invariant engine, registry and router failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Pool is locked by an operation in progress")]
    Locked,

    #[error("Zero address is not allowed")]
    ZeroAddress,

    #[error("Pair assets must differ")]
    IdenticalAssets,

    #[error("Pair already exists: {pool}")]
    PairExists { pool: Address },

    #[error("No pair for {asset_a} / {asset_b}")]
    PairNotFound { asset_a: Address, asset_b: Address },

    #[error("Asset {asset} is not part of this pair")]
    InvalidAsset { asset: Address },

    #[error("Initial deposit must exceed the minimum liquidity of {minimum}")]
    InsufficientInitialLiquidity { minimum: u128 },

    #[error("Insufficient liquidity minted")]
    InsufficientLiquidityMinted,

    #[error("Insufficient liquidity burned")]
    InsufficientLiquidityBurned,

    #[error("Insufficient output amount")]
    InsufficientOutputAmount,

    #[error("Insufficient input amount")]
    InsufficientInputAmount,

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Recipient {to} is one of the pair's assets")]
    InvalidTo { to: Address },

    #[error("Constant-product check failed")]
    KValueCheckFailed,

    #[error("Reserve overflow: {reserve} exceeds 112 bits")]
    ReserveOverflow { reserve: u128 },

    #[error("Balance {balance} of {asset} is below accrued fee liabilities {accrued}")]
    FeeStateInvalid {
        asset: Address,
        balance: u128,
        accrued: u128,
    },

    #[error("No protocol fee recipient configured")]
    FeeRecipientNotSet,

    #[error("Flash-swap data supplied without a callee")]
    MissingCallee,

    #[error("Flash-swap callee failed: {0}")]
    Callback(String),

    #[error("Insufficient share balance: needed {needed}, available {available}")]
    InsufficientShareBalance { needed: u128, available: u128 },

    #[error("Insufficient share allowance: needed {needed}, allowed {allowed}")]
    InsufficientAllowance { needed: u128, allowed: u128 },

    #[error("Deadline {deadline} expired at {now}")]
    Expired { deadline: u32, now: u32 },

    #[error("Insufficient {asset} amount: got {actual}, minimum {minimum}")]
    SlippageExceeded {
        asset: Address,
        actual: u128,
        minimum: u128,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Math(#[from] MathError),
}

/// Price oracle failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("Oracle not initialized for {pool}")]
    NotInitialized { pool: Address },

    #[error("Oracle already initialized for {pool}")]
    AlreadyInitialized { pool: Address },

    #[error("{pool} is not a recognized pair")]
    InvalidPair { pool: Address },

    #[error("Update too frequent: {elapsed}s since last update, minimum {min_interval}s")]
    UpdateTooFrequent { elapsed: u32, min_interval: u32 },

    #[error("Invalid period {period}s (maximum {max_window}s)")]
    InvalidPeriod { period: u32, max_window: u32 },

    #[error("Stale price: last update {age}s ago exceeds {max_window}s")]
    StalePrice { age: u32, max_window: u32 },

    #[error("Elapsed time is zero")]
    ElapsedTimeZero,

    #[error("Invalid time elapsed: {elapsed}s")]
    InvalidTimeElapsed { elapsed: u32 },

    #[error("Asset {asset} is not part of pair {pool}")]
    InvalidToken { pool: Address, asset: Address },

    #[error("Pair {pool} has no reserves yet")]
    NoReserves { pool: Address },

    #[error("Pair {pool} is mid-operation; its reserves are provisional")]
    PoolLocked { pool: Address },

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Amount in must be non-zero")]
    ZeroAmount,

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Math(#[from] MathError),
}

pub type PoolResult<T> = std::result::Result<T, PoolError>;
pub type OracleResult<T> = std::result::Result<T, OracleError>;
