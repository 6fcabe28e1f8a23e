//! Single-pool router
//!
//! Wraps the pool's low-level "transfer first, then call" operations with
//! deadlines, optimal deposit sizing and minimum-output checks. Each call runs
//! inside one ledger checkpoint, so a failed minimum check after execution
//! still leaves nothing behind.

use crate::error::{PoolError, PoolResult};
use crate::host::{Clock, Ledger};
use crate::pool::Pool;
use crate::pool_traits::AmmPool;
use crate::registry::PairRegistry;
use crate::types::Address;
use crate::v2_math::V2Math;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Router {
    registry: Arc<dyn PairRegistry>,
    ledger: Arc<dyn Ledger>,
    clock: Arc<dyn Clock>,
}

impl Router {
    pub fn new(
        registry: Arc<dyn PairRegistry>,
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            ledger,
            clock,
        }
    }

    /// Deposit at the pool's current ratio without exceeding either desired
    /// amount; returns `(amount_a, amount_b, shares)`
    #[allow(clippy::too_many_arguments)]
    pub fn add_liquidity(
        &self,
        sender: Address,
        asset_a: Address,
        asset_b: Address,
        desired_a: u128,
        desired_b: u128,
        min_a: u128,
        min_b: u128,
        to: Address,
        deadline: u32,
    ) -> PoolResult<(u128, u128, u128)> {
        self.ensure(deadline)?;
        let pool = self.pair(asset_a, asset_b)?;

        self.atomically("add_liquidity", || {
            let (reserve_a, reserve_b) = pool.oriented_reserves(asset_a)?;
            let (amount_a, amount_b) = if reserve_a == 0 && reserve_b == 0 {
                (desired_a, desired_b)
            } else {
                let optimal_b = V2Math::quote(desired_a, reserve_a, reserve_b)?;
                if optimal_b <= desired_b {
                    check_minimum(asset_b, optimal_b, min_b)?;
                    (desired_a, optimal_b)
                } else {
                    let optimal_a = V2Math::quote(desired_b, reserve_b, reserve_a)?;
                    if optimal_a > desired_a {
                        return Err(PoolError::InsufficientInputAmount);
                    }
                    check_minimum(asset_a, optimal_a, min_a)?;
                    (optimal_a, desired_b)
                }
            };

            self.ledger
                .transfer(asset_a, sender, pool.address(), amount_a)?;
            self.ledger
                .transfer(asset_b, sender, pool.address(), amount_b)?;
            let shares = pool.mint(sender, to)?;
            Ok((amount_a, amount_b, shares))
        })
    }

    /// Redeem `shares` for both assets; returns `(amount_a, amount_b)`
    #[allow(clippy::too_many_arguments)]
    pub fn remove_liquidity(
        &self,
        sender: Address,
        asset_a: Address,
        asset_b: Address,
        shares: u128,
        min_a: u128,
        min_b: u128,
        to: Address,
        deadline: u32,
    ) -> PoolResult<(u128, u128)> {
        self.ensure(deadline)?;
        let pool = self.pair(asset_a, asset_b)?;

        self.atomically("remove_liquidity", || {
            pool.transfer_shares(sender, pool.address(), shares)?;
            let (amount0, amount1) = pool.burn(sender, to)?;
            let (amount_a, amount_b) = if asset_a == pool.asset0() {
                (amount0, amount1)
            } else {
                (amount1, amount0)
            };
            check_minimum(asset_a, amount_a, min_a)?;
            check_minimum(asset_b, amount_b, min_b)?;
            Ok((amount_a, amount_b))
        })
    }

    /// Swap an exact input, tolerating assets that deliver less than sent
    ///
    /// The output is priced from what the pool actually received, and the
    /// minimum is enforced twice: on the computed output before execution and
    /// on what the recipient actually received after it. Returns the amount
    /// received.
    #[allow(clippy::too_many_arguments)]
    pub fn swap_exact_in(
        &self,
        sender: Address,
        asset_in: Address,
        asset_out: Address,
        amount_in: u128,
        min_out: u128,
        to: Address,
        deadline: u32,
    ) -> PoolResult<u128> {
        self.ensure(deadline)?;
        let pool = self.pair(asset_in, asset_out)?;

        self.atomically("swap_exact_in", || {
            let (reserve_in, reserve_out) = pool.oriented_reserves(asset_in)?;

            let pool_before = self.ledger.balance_of(asset_in, pool.address());
            self.ledger
                .transfer(asset_in, sender, pool.address(), amount_in)?;
            let received = self
                .ledger
                .balance_of(asset_in, pool.address())
                .saturating_sub(pool_before);

            let amount_out =
                V2Math::get_amount_out(received, reserve_in, reserve_out, pool.fee_bps())?;
            check_minimum(asset_out, amount_out, min_out)?;

            let recipient_before = self.ledger.balance_of(asset_out, to);
            let (amount0_out, amount1_out) = if asset_in == pool.asset0() {
                (0, amount_out)
            } else {
                (amount_out, 0)
            };
            pool.swap(sender, amount0_out, amount1_out, to, &[], None)?;

            let delivered = self
                .ledger
                .balance_of(asset_out, to)
                .saturating_sub(recipient_before);
            check_minimum(asset_out, delivered, min_out)?;

            debug!(pool = %pool.address(), %asset_in, amount_in, received, amount_out, delivered, "swap_exact_in");
            Ok(delivered)
        })
    }

    fn ensure(&self, deadline: u32) -> PoolResult<()> {
        let now = self.clock.now();
        if now > deadline {
            return Err(PoolError::Expired { deadline, now });
        }
        Ok(())
    }

    fn pair(&self, asset_a: Address, asset_b: Address) -> PoolResult<Arc<Pool>> {
        self.registry
            .pair_for(asset_a, asset_b)
            .ok_or(PoolError::PairNotFound { asset_a, asset_b })
    }

    fn atomically<T>(&self, operation: &'static str, body: impl FnOnce() -> PoolResult<T>) -> PoolResult<T> {
        let checkpoint = self.ledger.checkpoint();
        match body() {
            Ok(value) => {
                self.ledger.release(checkpoint);
                Ok(value)
            }
            Err(err) => {
                self.ledger.rollback(checkpoint);
                warn!(operation, error = %err, "router call rolled back");
                Err(err)
            }
        }
    }
}

fn check_minimum(asset: Address, actual: u128, minimum: u128) -> PoolResult<()> {
    if actual < minimum {
        return Err(PoolError::SlippageExceeded {
            asset,
            actual,
            minimum,
        });
    }
    Ok(())
}
