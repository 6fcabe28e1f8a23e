//! Live cumulative prices of a pool

use crate::error::{OracleError, OracleResult};
use crate::math::{accumulate_price, Uq112x112, U256};
use crate::pool::Pool;

/// Cumulative prices as they would read if the pool synced at `now`
///
/// Extrapolates from the pool's last recorded accumulators using its current
/// reserves, so no pool mutation is needed. Returns the accumulators and the
/// timestamp they are valid for. Fails when the pool has not synced for longer
/// than `max_time_elapsed` seconds.
pub fn current_cumulative_prices(
    pool: &Pool,
    now: u32,
    max_time_elapsed: u32,
) -> OracleResult<(U256, U256, u32)> {
    let elapsed = now.wrapping_sub(pool.reserves().block_timestamp_last);
    if elapsed > max_time_elapsed {
        return Err(OracleError::InvalidTimeElapsed { elapsed });
    }
    extrapolated_cumulative_prices(pool, now)
}

/// [`current_cumulative_prices`] without the idle-pool bound
///
/// Reserves are constant between syncs, so extrapolating across any gap is
/// exact; the bound only guards what gets written into observations.
pub fn extrapolated_cumulative_prices(pool: &Pool, now: u32) -> OracleResult<(U256, U256, u32)> {
    let reserves = pool.reserves();
    let (mut price0, mut price1) = pool.price_cumulative_last();

    let elapsed = now.wrapping_sub(reserves.block_timestamp_last);
    if elapsed > 0 && reserves.reserve0 != 0 && reserves.reserve1 != 0 {
        price0 = accumulate_price(
            price0,
            Uq112x112::ratio(reserves.reserve1, reserves.reserve0)?,
            elapsed,
        );
        price1 = accumulate_price(
            price1,
            Uq112x112::ratio(reserves.reserve0, reserves.reserve1)?,
            elapsed,
        );
    }
    Ok((price0, price1, now))
}
