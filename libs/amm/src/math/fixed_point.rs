//! UQ112x112 binary fixed-point
//!
//! A relative price `reserveOut / reserveIn` is encoded as `reserveOut << 112`
//! divided by `reserveIn`. With both reserves bounded to 112 bits the result
//! fits in 224 bits, which leaves 32 bits of headroom for multiplying by a
//! 32-bit elapsed time before accumulation.
//!
//! Cumulative accumulators are plain `U256` values that wrap modulo 2^256;
//! only differences between two readings are meaningful.

use crate::error::MathError;
use crate::math::integer::{to_u128, MAX_U112};
use ethers_core::types::{U256, U512};
use rust_decimal::Decimal;

/// Number of fractional bits
pub const RESOLUTION: usize = 112;

/// Decimal places kept when rendering a price as [`Decimal`]
const DECIMAL_SCALE: u32 = 18;

/// Unsigned fixed-point number with 112 integer and 112 fractional bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Uq112x112(U256);

impl Uq112x112 {
    /// 1.0 in UQ112x112
    pub fn one() -> Self {
        Self(U256::one() << RESOLUTION)
    }

    /// Encode a 112-bit integer
    pub fn encode(value: u128) -> Result<Self, MathError> {
        if value > MAX_U112 {
            return Err(MathError::Overflow);
        }
        Ok(Self(U256::from(value) << RESOLUTION))
    }

    /// `numerator / denominator` as a fixed-point ratio
    pub fn ratio(numerator: u128, denominator: u128) -> Result<Self, MathError> {
        Self::encode(numerator)?.uqdiv(denominator)
    }

    /// Divide by an integer, flooring
    pub fn uqdiv(self, divisor: u128) -> Result<Self, MathError> {
        if divisor == 0 {
            return Err(MathError::DivisionByZero);
        }
        Ok(Self(self.0 / U256::from(divisor)))
    }

    /// Multiply by an integer and drop the fractional bits
    pub fn mul_decode(self, value: u128) -> Result<u128, MathError> {
        let wide = self.0.full_mul(U256::from(value)) >> RESOLUTION;
        let narrowed = U256::try_from(wide).map_err(|_| MathError::Overflow)?;
        to_u128(narrowed)
    }

    /// Integer part
    pub fn decode(self) -> U256 {
        self.0 >> RESOLUTION
    }

    pub fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> U256 {
        self.0
    }

    /// Render with 18 decimal places; `None` when the integer part is too
    /// large for [`Decimal`]
    pub fn to_decimal(self) -> Option<Decimal> {
        let scale = U256::exp10(DECIMAL_SCALE as usize);
        let fraction_mask = (U256::one() << RESOLUTION) - U256::one();
        let integer = self.decode();
        let fraction = ((self.0 & fraction_mask) * scale) >> RESOLUTION;
        let scaled = integer.checked_mul(scale)?.checked_add(fraction)?;
        if scaled > U256::from(i128::MAX as u128) {
            return None;
        }
        Decimal::try_from_i128_with_scale(scaled.low_u128() as i128, DECIMAL_SCALE)
            .ok()
            .map(|d| d.normalize())
    }
}

/// Add `price * elapsed` to a wrapping cumulative accumulator
pub fn accumulate_price(cumulative: U256, price: Uq112x112, elapsed: u32) -> U256 {
    // price < 2^224 and elapsed < 2^32, so only the addition can wrap
    let (increment, _) = price.raw().overflowing_mul(U256::from(elapsed));
    let (next, _) = cumulative.overflowing_add(increment);
    next
}

/// `delta * amount_in / (elapsed * 2^112)`: the time-weighted average price
/// over `elapsed` seconds applied to `amount_in`
pub fn twap_amount_out(delta: U256, amount_in: u128, elapsed: u32) -> Result<u128, MathError> {
    if elapsed == 0 {
        return Err(MathError::DivisionByZero);
    }
    let numerator = delta.full_mul(U256::from(amount_in));
    let denominator = U512::from(elapsed) << RESOLUTION;
    let quotient = U256::try_from(numerator / denominator).map_err(|_| MathError::Overflow)?;
    to_u128(quotient)
}
