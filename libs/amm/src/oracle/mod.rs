//! Time-Weighted Average Price oracle
//!
//! Pull model: the oracle never hears from pools. Any caller may invoke
//! [`PriceOracle::update`], at most once per minimum interval per pool, which
//! reads the pool's live cumulative prices into the next slot of a
//! fixed-cardinality ring. [`PriceOracle::consult`] later finds the newest
//! observation at least `period` old and divides the accumulator delta by the
//! elapsed time, recovering the average price over the window.
//!
//! Pool state is read-only here; the oracle owns only its rings. Ring writes
//! join the host ledger's open checkpoint, so an enclosing failure discards
//! them along with their events, and a pool that is mid-operation (its
//! reserves possibly provisional) is never observed.

mod cumulative;
mod observation;

pub use cumulative::{current_cumulative_prices, extrapolated_cumulative_prices};
pub use observation::{Observation, ObservationRing};

use crate::error::{OracleError, OracleResult};
use crate::events::Event;
use crate::host::{Clock, Ledger};
use crate::math::{mul_div, twap_amount_out, Uq112x112};
use crate::pool::Pool;
use crate::pool_traits::AmmPool;
use crate::registry::PairRegistry;
use crate::types::Address;
use amm_config::OracleParams;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Per-pool oracle state
#[derive(Debug, Clone)]
struct PairObservations {
    ring: ObservationRing,
    last_update_time: u32,
}

/// TWAP oracle over every pool known to a registry
pub struct PriceOracle {
    registry: Arc<dyn PairRegistry>,
    ledger: Arc<dyn Ledger>,
    clock: Arc<dyn Clock>,
    params: OracleParams,
    pairs: Arc<DashMap<Address, PairObservations>>,
}

impl PriceOracle {
    pub fn new(
        registry: Arc<dyn PairRegistry>,
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
        params: OracleParams,
    ) -> Self {
        Self {
            registry,
            ledger,
            clock,
            params,
            pairs: Arc::new(DashMap::new()),
        }
    }

    pub fn params(&self) -> &OracleParams {
        &self.params
    }

    /// Start tracking `pool`, filling every ring slot with one observation
    pub fn initialize_pair(&self, pool: Address) -> OracleResult<()> {
        if self.pairs.contains_key(&pool) {
            return Err(OracleError::AlreadyInitialized { pool });
        }
        let pair = self.lookup(pool)?;
        let reserves = pair.reserves();
        if reserves.reserve0 == 0 || reserves.reserve1 == 0 {
            return Err(OracleError::NoReserves { pool });
        }

        let now = self.clock.now();
        let observation = self.observe(&pair, now)?;
        self.pairs.insert(
            pool,
            PairObservations {
                ring: ObservationRing::filled(observation, self.params.cardinality),
                last_update_time: now,
            },
        );
        let pairs = Arc::clone(&self.pairs);
        self.ledger.record_undo(Box::new(move || {
            pairs.remove(&pool);
        }));

        self.ledger.emit(Event::PairInitialized {
            pool,
            timestamp: now,
        });
        info!(%pool, timestamp = now, cardinality = self.params.cardinality, "oracle pair initialized");
        Ok(())
    }

    /// Record a new observation for `pool`, initializing it on first use
    pub fn update(&self, pool: Address) -> OracleResult<()> {
        let pair = self.lookup(pool)?;
        let now = self.clock.now();

        let Some(mut entry) = self.pairs.get_mut(&pool) else {
            return self.initialize_pair(pool);
        };

        let elapsed = now.wrapping_sub(entry.last_update_time);
        if elapsed < self.params.min_update_interval {
            return Err(OracleError::UpdateTooFrequent {
                elapsed,
                min_interval: self.params.min_update_interval,
            });
        }

        let observation = self.observe(&pair, now)?;
        let previous = entry.value().clone();
        entry.ring.push(observation);
        entry.last_update_time = now;
        let index = entry.ring.current_index();
        drop(entry);

        let pairs = Arc::clone(&self.pairs);
        self.ledger.record_undo(Box::new(move || {
            pairs.insert(pool, previous);
        }));

        self.ledger.emit(Event::OracleUpdated {
            pool,
            price0_cumulative: observation.price0_cumulative,
            price1_cumulative: observation.price1_cumulative,
            timestamp: now,
        });
        let spot = pair
            .spot_price(pair.asset0())
            .ok()
            .and_then(Uq112x112::to_decimal);
        info!(%pool, timestamp = now, index, spot = ?spot, "oracle updated");
        Ok(())
    }

    /// Average output for `amount_in` of `asset_in` over the trailing `period`
    pub fn consult(
        &self,
        pool: Address,
        asset_in: Address,
        amount_in: u128,
        period: u32,
    ) -> OracleResult<u128> {
        let last_update_time = self
            .last_update_time(pool)
            .ok_or(OracleError::NotInitialized { pool })?;

        if period == 0 || period > self.params.max_window {
            return Err(OracleError::InvalidPeriod {
                period,
                max_window: self.params.max_window,
            });
        }

        let now = self.clock.now();
        let age = now.wrapping_sub(last_update_time);
        if age > self.params.max_window {
            return Err(OracleError::StalePrice {
                age,
                max_window: self.params.max_window,
            });
        }

        let pair = self.lookup(pool)?;
        if !pair.contains(asset_in) {
            return Err(OracleError::InvalidToken {
                pool,
                asset: asset_in,
            });
        }
        if amount_in == 0 {
            return Err(OracleError::ZeroAmount);
        }

        let past = self
            .pairs
            .get(&pool)
            .map(|entry| *entry.ring.observation_at_or_before(now, period))
            .ok_or(OracleError::NotInitialized { pool })?;

        let elapsed = now.wrapping_sub(past.timestamp);
        if elapsed == 0 {
            return Err(OracleError::ElapsedTimeZero);
        }
        if elapsed < self.params.min_update_interval || elapsed > self.params.max_window {
            return Err(OracleError::InvalidTimeElapsed { elapsed });
        }

        // Staleness is bounded by max_window above; a quiet pool still
        // extrapolates exactly
        let (price0_now, price1_now, _) = extrapolated_cumulative_prices(&pair, now)?;
        // Accumulators wrap; the modular difference is the integral
        let delta = if asset_in == pair.asset0() {
            price0_now.overflowing_sub(past.price0_cumulative).0
        } else {
            price1_now.overflowing_sub(past.price1_cumulative).0
        };

        let amount_out = twap_amount_out(delta, amount_in, elapsed)?;
        debug!(%pool, %asset_in, amount_in, period, elapsed, amount_out, "twap consulted");
        Ok(amount_out)
    }

    /// Spot conversion at current reserves, without smoothing or fee
    pub fn get_current_price(
        &self,
        pool: Address,
        asset_in: Address,
        amount_in: u128,
    ) -> OracleResult<u128> {
        let pair = self.lookup(pool)?;
        if amount_in == 0 {
            return Err(OracleError::ZeroAmount);
        }
        let (reserve_in, reserve_out) = pair.oriented_reserves(asset_in).map_err(|_| {
            OracleError::InvalidToken {
                pool,
                asset: asset_in,
            }
        })?;
        if reserve_in == 0 || reserve_out == 0 {
            return Err(OracleError::InsufficientLiquidity);
        }
        Ok(mul_div(amount_in, reserve_out, reserve_in)?)
    }

    pub fn is_initialized(&self, pool: Address) -> bool {
        self.pairs.contains_key(&pool)
    }

    /// Ring contents in slot order; empty when the pool is not tracked
    pub fn observations(&self, pool: Address) -> Vec<Observation> {
        self.pairs
            .get(&pool)
            .map(|entry| entry.ring.slots().to_vec())
            .unwrap_or_default()
    }

    pub fn current_index(&self, pool: Address) -> Option<usize> {
        self.pairs.get(&pool).map(|entry| entry.ring.current_index())
    }

    pub fn last_update_time(&self, pool: Address) -> Option<u32> {
        self.pairs.get(&pool).map(|entry| entry.last_update_time)
    }

    fn lookup(&self, pool: Address) -> OracleResult<Arc<Pool>> {
        self.registry
            .pool(pool)
            .ok_or(OracleError::InvalidPair { pool })
    }

    fn observe(&self, pair: &Pool, now: u32) -> OracleResult<Observation> {
        if pair.is_locked() {
            return Err(OracleError::PoolLocked {
                pool: pair.address(),
            });
        }
        let (price0_cumulative, price1_cumulative, timestamp) =
            current_cumulative_prices(pair, now, self.params.max_time_elapsed)?;
        Ok(Observation {
            timestamp,
            price0_cumulative,
            price1_cumulative,
        })
    }
}
