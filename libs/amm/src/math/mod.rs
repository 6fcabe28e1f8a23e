//! Exact integer arithmetic for the pool engine and the oracle
//!
//! - [`integer`]: wide products, square roots and bounded conversions
//! - [`fixed_point`]: the UQ112x112 binary fixed-point format used for
//!   relative prices and their time integrals

pub mod fixed_point;
pub mod integer;

pub use ethers_core::types::{U256, U512};
pub use fixed_point::{accumulate_price, twap_amount_out, Uq112x112};
pub use integer::{mul_div, product, sqrt, sqrt_product, to_u128, MAX_U112};
