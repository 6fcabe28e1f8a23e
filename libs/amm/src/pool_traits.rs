//! Pool trait definitions for a unified quoting interface

use crate::error::{PoolError, PoolResult};
use crate::math::Uq112x112;
use crate::pool::{Pool, Reserves};
use crate::types::Address;
use crate::v2_math::V2Math;

/// Read-only pricing view over a two-asset pool
///
/// Quotes are computed from recorded reserves, so they match what the pool
/// will enforce on the next swap provided nothing else trades first.
pub trait AmmPool {
    /// Canonically ordered assets
    fn assets(&self) -> (Address, Address);

    fn reserves(&self) -> Reserves;

    /// Swap fee charged on input
    fn fee_bps(&self) -> u16;

    /// Reserves oriented as `(reserve_in, reserve_out)` for `asset_in`
    fn oriented_reserves(&self, asset_in: Address) -> PoolResult<(u128, u128)> {
        let (asset0, asset1) = self.assets();
        let reserves = self.reserves();
        if asset_in == asset0 {
            Ok((reserves.reserve0, reserves.reserve1))
        } else if asset_in == asset1 {
            Ok((reserves.reserve1, reserves.reserve0))
        } else {
            Err(PoolError::InvalidAsset { asset: asset_in })
        }
    }

    /// The other asset of the pair
    fn counterpart(&self, asset: Address) -> PoolResult<Address> {
        let (asset0, asset1) = self.assets();
        if asset == asset0 {
            Ok(asset1)
        } else if asset == asset1 {
            Ok(asset0)
        } else {
            Err(PoolError::InvalidAsset { asset })
        }
    }

    /// Exact output of swapping `amount_in` of `asset_in`
    fn get_amount_out(&self, asset_in: Address, amount_in: u128) -> PoolResult<u128> {
        let (reserve_in, reserve_out) = self.oriented_reserves(asset_in)?;
        V2Math::get_amount_out(amount_in, reserve_in, reserve_out, self.fee_bps())
    }

    /// Minimum input of the counterpart asset needed to receive `amount_out`
    /// of `asset_out`
    fn get_amount_in(&self, asset_out: Address, amount_out: u128) -> PoolResult<u128> {
        let asset_in = self.counterpart(asset_out)?;
        let (reserve_in, reserve_out) = self.oriented_reserves(asset_in)?;
        V2Math::get_amount_in(amount_out, reserve_in, reserve_out, self.fee_bps())
    }

    /// Spot price of `asset_in` in units of the other asset
    fn spot_price(&self, asset_in: Address) -> PoolResult<Uq112x112> {
        let (reserve_in, reserve_out) = self.oriented_reserves(asset_in)?;
        if reserve_in == 0 || reserve_out == 0 {
            return Err(PoolError::InsufficientLiquidity);
        }
        Ok(Uq112x112::ratio(reserve_out, reserve_in)?)
    }
}

impl AmmPool for Pool {
    fn assets(&self) -> (Address, Address) {
        (self.asset0(), self.asset1())
    }

    fn reserves(&self) -> Reserves {
        Pool::reserves(self)
    }

    fn fee_bps(&self) -> u16 {
        self.params().swap_fee_bps
    }
}
