//! Integer helpers over `u128` amounts and `U256` intermediates

use crate::error::MathError;
use ethers_core::types::U256;

/// Largest value a reserve may hold (2^112 - 1)
pub const MAX_U112: u128 = (1u128 << 112) - 1;

/// Full-width product of two amounts
pub fn product(a: u128, b: u128) -> U256 {
    // Cannot overflow: both factors are below 2^128
    U256::from(a) * U256::from(b)
}

/// Floor square root
pub fn sqrt(value: U256) -> U256 {
    value.integer_sqrt()
}

/// `floor(sqrt(a * b))`, which always fits back into 128 bits
pub fn sqrt_product(a: u128, b: u128) -> u128 {
    sqrt(product(a, b)).low_u128()
}

/// `floor(a * b / denominator)` without intermediate overflow
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    to_u128(product(a, b) / U256::from(denominator))
}

/// Narrow a `U256` to `u128`, rejecting rather than truncating
pub fn to_u128(value: U256) -> Result<u128, MathError> {
    if value > U256::from(u128::MAX) {
        return Err(MathError::Overflow);
    }
    Ok(value.low_u128())
}
