//! Constant-product (V2) pricing math with exact integer rounding
//!
//! These are the quoting helpers callers use to size a trade before handing
//! it to a pool. Outputs round down and required inputs round up, so a trade
//! sized with them always passes the pool's fee-adjusted K-check.

use crate::error::{MathError, PoolError};
use crate::math::{mul_div, product, to_u128, U256, U512};
use amm_config::BPS_DENOMINATOR;

/// V2 AMM math functions
pub struct V2Math;

impl V2Math {
    /// Equivalent amount of the other asset at the current reserve ratio
    pub fn quote(amount_a: u128, reserve_a: u128, reserve_b: u128) -> Result<u128, PoolError> {
        if amount_a == 0 {
            return Err(PoolError::InsufficientInputAmount);
        }
        if reserve_a == 0 || reserve_b == 0 {
            return Err(PoolError::InsufficientLiquidity);
        }
        Ok(mul_div(amount_a, reserve_b, reserve_a)?)
    }

    /// Exact output for `amount_in` after the swap fee
    ///
    /// `out = in * (D - fee) * reserve_out / (reserve_in * D + in * (D - fee))`
    pub fn get_amount_out(
        amount_in: u128,
        reserve_in: u128,
        reserve_out: u128,
        fee_bps: u16,
    ) -> Result<u128, PoolError> {
        if amount_in == 0 {
            return Err(PoolError::InsufficientInputAmount);
        }
        if reserve_in == 0 || reserve_out == 0 {
            return Err(PoolError::InsufficientLiquidity);
        }

        let fee_multiplier = u128::from(BPS_DENOMINATOR - u32::from(fee_bps));
        let amount_in_with_fee = product(amount_in, fee_multiplier);
        let numerator = amount_in_with_fee.full_mul(U256::from(reserve_out));
        let denominator = product(reserve_in, u128::from(BPS_DENOMINATOR))
            .checked_add(amount_in_with_fee)
            .ok_or(MathError::Overflow)?;

        let quotient =
            U256::try_from(numerator / U512::from(denominator)).map_err(|_| MathError::Overflow)?;
        Ok(to_u128(quotient)?)
    }

    /// Minimum input that yields `amount_out`, rounded up
    pub fn get_amount_in(
        amount_out: u128,
        reserve_in: u128,
        reserve_out: u128,
        fee_bps: u16,
    ) -> Result<u128, PoolError> {
        if amount_out == 0 {
            return Err(PoolError::InsufficientOutputAmount);
        }
        if reserve_in == 0 || amount_out >= reserve_out {
            return Err(PoolError::InsufficientLiquidity);
        }

        let numerator = product(reserve_in, amount_out)
            .checked_mul(U256::from(BPS_DENOMINATOR))
            .ok_or(MathError::Overflow)?;
        let denominator = product(
            reserve_out - amount_out,
            u128::from(BPS_DENOMINATOR - u32::from(fee_bps)),
        );

        // Add 1 to round up (ensures sufficient input)
        Ok(to_u128(numerator / denominator + U256::one())?)
    }
}
