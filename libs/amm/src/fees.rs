//! Fee math
//!
//! Two independent mechanisms pay the protocol:
//!
//! - **Share dilution** ([`protocol_fee_liquidity`]): at every mint/burn the
//!   protocol is issued new liquidity shares worth a fixed fraction of the
//!   growth in `sqrt(K)` since the last fee-affecting operation.
//! - **Input carve-out** ([`split_input_fee`]): part of the swap fee charged on
//!   each input is set aside as a liability owed to the protocol recipient and
//!   to the input asset's originator. Set-aside amounts stay in the pool's
//!   balance but are excluded from reserves until collected.

use crate::error::MathError;
use crate::math::{product, sqrt, to_u128, U256};
use amm_config::{PoolParams, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};

/// Fee amounts taken from a single input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeSplit {
    pub protocol: u128,
    pub creator: u128,
}

impl FeeSplit {
    pub fn total(&self) -> u128 {
        self.protocol + self.creator
    }
}

/// Fees accrued in one asset and not yet collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccruedFees {
    pub protocol: u128,
    pub creator: u128,
}

impl AccruedFees {
    pub fn total(&self) -> u128 {
        self.protocol.saturating_add(self.creator)
    }

    pub fn is_empty(&self) -> bool {
        self.protocol == 0 && self.creator == 0
    }

    pub fn accrue(&mut self, split: FeeSplit) -> Result<(), MathError> {
        self.protocol = self
            .protocol
            .checked_add(split.protocol)
            .ok_or(MathError::Overflow)?;
        self.creator = self
            .creator
            .checked_add(split.creator)
            .ok_or(MathError::Overflow)?;
        Ok(())
    }
}

/// Shares to issue to the protocol for sqrt(K) growth since `k_last`
///
/// `totalShares * (rootK - rootKLast) / (d * rootK + rootKLast)`; with the
/// default divisor `d = 5` the protocol receives 1/6th of the growth.
pub fn protocol_fee_liquidity(
    total_shares: u128,
    reserve0: u128,
    reserve1: u128,
    k_last: U256,
    share_divisor: u32,
) -> Result<u128, MathError> {
    if k_last.is_zero() || total_shares == 0 {
        return Ok(0);
    }
    let root_k = sqrt(product(reserve0, reserve1));
    let root_k_last = sqrt(k_last);
    if root_k <= root_k_last {
        return Ok(0);
    }

    let numerator = U256::from(total_shares)
        .checked_mul(root_k - root_k_last)
        .ok_or(MathError::Overflow)?;
    let denominator = root_k
        .checked_mul(U256::from(share_divisor))
        .and_then(|scaled| scaled.checked_add(root_k_last))
        .ok_or(MathError::Overflow)?;
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    to_u128(numerator / denominator)
}

/// Split the carved-out part of the swap fee on one input
///
/// The protocol part only accrues when a fee recipient is configured and
/// the creator part only when the input asset has an originator.
pub fn split_input_fee(
    amount_in: u128,
    params: &PoolParams,
    protocol_enabled: bool,
    has_originator: bool,
) -> FeeSplit {
    let share = |bps: u16| {
        // amount_in * bps stays below 2^144, and the quotient is <= amount_in
        (product(amount_in, u128::from(bps)) / U256::from(BPS_DENOMINATOR)).low_u128()
    };
    FeeSplit {
        protocol: if protocol_enabled {
            share(params.protocol_fee_bps)
        } else {
            0
        },
        creator: if has_originator {
            share(params.creator_fee_bps)
        } else {
            0
        },
    }
}

/// `balance * D - amount_in * fee_bps`, the fee-adjusted balance of the K-check
pub fn fee_adjusted_balance(balance: u128, amount_in: u128, fee_bps: u16) -> U256 {
    let scaled = product(balance, u128::from(BPS_DENOMINATOR));
    let fee = product(amount_in, u128::from(fee_bps));
    // amount_in <= balance and fee_bps < D, so this never underflows
    scaled.saturating_sub(fee)
}

/// Fee-adjusted constant-product check:
/// `adj0 * adj1 >= reserve0 * reserve1 * D^2`
///
/// Balances must already be bounded to 112 bits so the products fit in 256.
pub fn k_invariant_holds(
    balance0: u128,
    balance1: u128,
    amount0_in: u128,
    amount1_in: u128,
    reserve0: u128,
    reserve1: u128,
    fee_bps: u16,
) -> Result<bool, MathError> {
    let adjusted0 = fee_adjusted_balance(balance0, amount0_in, fee_bps);
    let adjusted1 = fee_adjusted_balance(balance1, amount1_in, fee_bps);
    let lhs = adjusted0
        .checked_mul(adjusted1)
        .ok_or(MathError::Overflow)?;
    let denominator_sq = U256::from(BPS_DENOMINATOR) * U256::from(BPS_DENOMINATOR);
    let rhs = product(reserve0, reserve1)
        .checked_mul(denominator_sq)
        .ok_or(MathError::Overflow)?;
    Ok(lhs >= rhs)
}
