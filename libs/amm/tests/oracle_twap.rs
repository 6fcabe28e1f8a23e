//! TWAP oracle against live pools

mod common;

use common::*;
use torq_amm::math::U256;
use std::sync::Mutex;
use torq_amm::{
    Address, EngineConfig, Event, FlashSwapCallee, Ledger, OracleError, OracleResult, PoolError,
};

/// Pool A/B at 1 A = 2 B, oracle initialized at `START`
fn initialized() -> (Harness, std::sync::Arc<torq_amm::Pool>) {
    let h = Harness::new();
    let pool = h.pool_ab();
    h.add_liquidity(&pool, 100_000, 200_000);
    h.oracle.initialize_pair(pool.address()).unwrap();
    (h, pool)
}

#[test]
fn initialize_fills_every_slot() {
    let (h, pool) = initialized();

    let observations = h.oracle.observations(pool.address());
    assert_eq!(observations.len(), 24);
    assert!(observations
        .iter()
        .all(|obs| obs.timestamp == START as u32 && *obs == observations[0]));
    assert_eq!(h.oracle.current_index(pool.address()), Some(0));
    assert_eq!(h.oracle.last_update_time(pool.address()), Some(START as u32));
    assert!(matches!(
        h.ledger.events().last(),
        Some(Event::PairInitialized { timestamp, .. }) if *timestamp == START as u32
    ));

    assert_eq!(
        h.oracle.initialize_pair(pool.address()),
        Err(OracleError::AlreadyInitialized {
            pool: pool.address()
        })
    );
}

#[test]
fn initialize_rejects_unknown_and_empty_pools() {
    let h = Harness::new();
    let unknown = Address::repeat_byte(0x77);
    assert_eq!(
        h.oracle.initialize_pair(unknown),
        Err(OracleError::InvalidPair { pool: unknown })
    );

    let pool = h.pool_ab();
    assert_eq!(
        h.oracle.initialize_pair(pool.address()),
        Err(OracleError::NoReserves {
            pool: pool.address()
        })
    );
    assert!(!h.oracle.is_initialized(pool.address()));
}

#[test]
fn update_on_uninitialized_pair_initializes_it() {
    let h = Harness::new();
    let pool = h.pool_ab();
    h.add_liquidity(&pool, 100_000, 200_000);

    h.oracle.update(pool.address()).unwrap();

    assert!(h.oracle.is_initialized(pool.address()));
    assert_eq!(h.oracle.current_index(pool.address()), Some(0));
    assert!(matches!(
        h.ledger.events().last(),
        Some(Event::PairInitialized { .. })
    ));
}

#[test]
fn update_is_rate_limited() {
    let (h, pool) = initialized();

    h.clock.advance(299);
    assert_eq!(
        h.oracle.update(pool.address()),
        Err(OracleError::UpdateTooFrequent {
            elapsed: 299,
            min_interval: 300
        })
    );

    h.clock.advance(1);
    h.oracle.update(pool.address()).unwrap();
    assert_eq!(h.oracle.current_index(pool.address()), Some(1));
    assert!(matches!(
        h.ledger.events().last(),
        Some(Event::OracleUpdated { timestamp, .. }) if *timestamp == START as u32 + 300
    ));
}

#[test]
fn update_rejects_pool_idle_beyond_sanity_bound() {
    let (h, pool) = initialized();

    h.clock.advance(7_201);
    assert_eq!(
        h.oracle.update(pool.address()),
        Err(OracleError::InvalidTimeElapsed { elapsed: 7_201 })
    );
    assert_eq!(h.oracle.last_update_time(pool.address()), Some(START as u32));

    // Any pool activity restarts the clock
    pool.sync().unwrap();
    h.oracle.update(pool.address()).unwrap();
}

#[test]
fn twap_matches_spot_under_constant_reserves() {
    let (h, pool) = initialized();
    h.clock.advance(3_600);
    h.oracle.update(pool.address()).unwrap();

    let twap_a = h.oracle.consult(pool.address(), token_a(), 1_000, 3_600).unwrap();
    let spot_a = h.oracle.get_current_price(pool.address(), token_a(), 1_000).unwrap();
    assert_eq!(twap_a, 2_000);
    assert_eq!(twap_a, spot_a);

    let twap_b = h.oracle.consult(pool.address(), token_b(), 1_000, 3_600).unwrap();
    let spot_b = h.oracle.get_current_price(pool.address(), token_b(), 1_000).unwrap();
    assert_eq!(twap_b, 500);
    assert_eq!(twap_b, spot_b);
}

#[test]
fn twap_averages_across_a_price_move() {
    let (h, pool) = initialized();

    h.clock.advance(1_800);
    h.swap_in(&pool, token_a(), 10_000).unwrap();
    h.clock.advance(1_800);
    h.oracle.update(pool.address()).unwrap();

    let twap = h.oracle.consult(pool.address(), token_a(), 1_000, 3_600).unwrap();
    let spot = h.oracle.get_current_price(pool.address(), token_a(), 1_000).unwrap();
    assert!(spot < twap, "spot {spot} should sit below twap {twap}");
    assert!(twap < 2_000, "twap {twap} should sit below the opening price");
}

#[test]
fn consult_falls_back_to_oldest_observation() {
    let (h, pool) = initialized();
    h.clock.advance(600);
    h.oracle.update(pool.address()).unwrap();
    h.clock.advance(600);

    // No observation is 7200s old; the oldest (1200s) is used instead
    assert_eq!(
        h.oracle.consult(pool.address(), token_a(), 1_000, 7_200).unwrap(),
        2_000
    );
}

#[test]
fn stale_oracle_fails_for_every_period() {
    let (h, pool) = initialized();
    h.clock.advance(3_600);
    h.oracle.update(pool.address()).unwrap();
    h.clock.advance(86_401);

    for period in [1, 3_600, 86_400] {
        assert_eq!(
            h.oracle.consult(pool.address(), token_a(), 1_000, period),
            Err(OracleError::StalePrice {
                age: 86_401,
                max_window: 86_400
            })
        );
    }
}

#[test]
fn twap_on_quiet_pool_extrapolates_past_idle_bound() {
    let (h, pool) = initialized();
    h.clock.advance(3_600);
    h.oracle.update(pool.address()).unwrap();
    h.clock.advance(3_600);
    h.oracle.update(pool.address()).unwrap();

    // No trade for three hours: new observations are refused...
    h.clock.advance(3_600);
    assert_eq!(
        h.oracle.update(pool.address()),
        Err(OracleError::InvalidTimeElapsed { elapsed: 10_800 })
    );

    // ...but the recent ones still price exactly
    let twap_a = h.oracle.consult(pool.address(), token_a(), 1_000, 3_600).unwrap();
    let spot_a = h.oracle.get_current_price(pool.address(), token_a(), 1_000).unwrap();
    assert_eq!(twap_a, 2_000);
    assert_eq!(twap_a, spot_a);
    assert_eq!(
        h.oracle.consult(pool.address(), token_b(), 1_000, 3_600).unwrap(),
        500
    );
}

#[test]
fn oracle_writes_roll_back_with_enclosing_checkpoint() {
    let (h, pool) = initialized();
    let before = h.oracle.observations(pool.address());
    h.clock.advance(600);

    let checkpoint = h.ledger.checkpoint();
    h.oracle.update(pool.address()).unwrap();
    assert_eq!(h.oracle.current_index(pool.address()), Some(1));
    h.ledger.rollback(checkpoint);

    assert_eq!(h.oracle.current_index(pool.address()), Some(0));
    assert_eq!(h.oracle.last_update_time(pool.address()), Some(START as u32));
    assert_eq!(h.oracle.observations(pool.address()), before);
    assert!(!h
        .ledger
        .events()
        .iter()
        .any(|event| matches!(event, Event::OracleUpdated { .. })));

    // The discarded write does not count toward the rate limit
    h.oracle.update(pool.address()).unwrap();
    assert_eq!(h.oracle.current_index(pool.address()), Some(1));
}

#[test]
fn initialization_rolls_back_with_enclosing_checkpoint() {
    let h = Harness::new();
    let pool = h.pool_ab();
    h.add_liquidity(&pool, 100_000, 200_000);

    let checkpoint = h.ledger.checkpoint();
    h.oracle.initialize_pair(pool.address()).unwrap();
    h.ledger.rollback(checkpoint);

    assert!(!h.oracle.is_initialized(pool.address()));
    assert!(h.oracle.observations(pool.address()).is_empty());
    h.oracle.initialize_pair(pool.address()).unwrap();
}

#[test]
fn flash_swap_callback_cannot_record_provisional_prices() {
    let (h, pool) = initialized();
    h.clock.advance(600);

    let inner: Mutex<Option<OracleResult<()>>> = Mutex::new(None);
    let callee = |_: Address, _: u128, _: u128, _: &[u8]| -> Result<(), PoolError> {
        *inner.lock().unwrap() = Some(h.oracle.update(pool.address()));
        // Never repays
        Ok(())
    };

    assert_eq!(
        pool.swap(
            trader(),
            0,
            90_000,
            trader(),
            b"skew",
            Some(&callee as &dyn FlashSwapCallee),
        ),
        Err(PoolError::InsufficientInputAmount)
    );
    assert_eq!(
        inner.lock().unwrap().take(),
        Some(Err(OracleError::PoolLocked {
            pool: pool.address()
        }))
    );
    assert_eq!(h.oracle.current_index(pool.address()), Some(0));
    assert_eq!(h.oracle.last_update_time(pool.address()), Some(START as u32));

    // Once the pool is idle the observation reflects the real 1:2 reserves
    h.oracle.update(pool.address()).unwrap();
    let latest = h.oracle.observations(pool.address())[1];
    assert_eq!(
        latest.price0_cumulative,
        (U256::from(2u8) << 112) * U256::from(600u32)
    );
    assert_eq!(
        latest.price1_cumulative,
        (U256::from(1u8) << 111) * U256::from(600u32)
    );
}

#[test]
fn consult_argument_validation() {
    let (h, pool) = initialized();
    let address = pool.address();

    let other = h.factory.create_pair(token_c(), token_d()).unwrap();
    assert_eq!(
        h.oracle.consult(other.address(), token_c(), 1_000, 600),
        Err(OracleError::NotInitialized {
            pool: other.address()
        })
    );
    for period in [0, 86_401] {
        assert_eq!(
            h.oracle.consult(address, token_a(), 1_000, period),
            Err(OracleError::InvalidPeriod {
                period,
                max_window: 86_400
            })
        );
    }

    // Every slot was written at this instant
    assert_eq!(
        h.oracle.consult(address, token_a(), 1_000, 1),
        Err(OracleError::ElapsedTimeZero)
    );

    h.clock.advance(100);
    assert_eq!(
        h.oracle.consult(address, token_a(), 1_000, 50),
        Err(OracleError::InvalidTimeElapsed { elapsed: 100 })
    );

    h.clock.advance(500);
    assert_eq!(
        h.oracle.consult(address, token_c(), 1_000, 600),
        Err(OracleError::InvalidToken {
            pool: address,
            asset: token_c()
        })
    );
    assert_eq!(
        h.oracle.consult(address, token_a(), 0, 600),
        Err(OracleError::ZeroAmount)
    );
}

#[test]
fn current_price_validation() {
    let h = Harness::new();
    let pool = h.pool_ab();
    assert_eq!(
        h.oracle.get_current_price(pool.address(), token_a(), 1_000),
        Err(OracleError::InsufficientLiquidity)
    );
    assert_eq!(
        h.oracle.get_current_price(pool.address(), token_c(), 1_000),
        Err(OracleError::InvalidToken {
            pool: pool.address(),
            asset: token_c()
        })
    );
}

#[test]
fn twap_survives_timestamp_wraparound() {
    let h = Harness::starting_at(EngineConfig::default(), u64::from(u32::MAX) - 1_000);
    let pool = h.pool_ab();
    h.add_liquidity(&pool, 100_000, 200_000);
    h.oracle.initialize_pair(pool.address()).unwrap();

    h.clock.advance(3_600);
    assert_eq!(h.clock.seconds(), u64::from(u32::MAX) + 2_600);
    h.oracle.update(pool.address()).unwrap();
    assert_eq!(h.oracle.last_update_time(pool.address()), Some(2_599));

    assert_eq!(
        h.oracle.consult(pool.address(), token_a(), 1_000, 3_600).unwrap(),
        2_000
    );

    pool.sync().unwrap();
    let (price0, _) = pool.price_cumulative_last();
    assert_eq!(price0, (U256::from(2u8) << 112) * U256::from(3_600u32));
    assert_eq!(pool.reserves().block_timestamp_last, 2_599);
}
