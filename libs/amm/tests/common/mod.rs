//! Shared fixtures for the engine integration tests

#![allow(dead_code)]

use std::sync::Arc;
use torq_amm::{
    Address, AmmPool, EngineConfig, InMemoryLedger, Ledger, ManualClock, PairFactory, Pool,
    PoolResult, PriceOracle, ProtocolSettings, Router,
};
use tracing_subscriber::EnvFilter;

/// Clock value every harness starts at
pub const START: u64 = 1_700_000_000;

pub fn token_a() -> Address {
    Address::from_low_u64(0xa0)
}

pub fn token_b() -> Address {
    Address::from_low_u64(0xb0)
}

pub fn token_c() -> Address {
    Address::from_low_u64(0xc0)
}

pub fn token_d() -> Address {
    Address::from_low_u64(0xd0)
}

pub fn lp() -> Address {
    Address::repeat_byte(0x11)
}

pub fn trader() -> Address {
    Address::repeat_byte(0x22)
}

pub fn treasury() -> Address {
    Address::repeat_byte(0xfe)
}

pub fn creator() -> Address {
    Address::repeat_byte(0xcc)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Ledger, clock, factory, oracle and router wired together
pub struct Harness {
    pub ledger: Arc<InMemoryLedger>,
    pub clock: Arc<ManualClock>,
    pub settings: Arc<ProtocolSettings>,
    pub factory: Arc<PairFactory>,
    pub oracle: PriceOracle,
    pub router: Router,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::starting_at(config, START)
    }

    pub fn starting_at(config: EngineConfig, start: u64) -> Self {
        init_tracing();
        config.validate().unwrap();

        let ledger = Arc::new(InMemoryLedger::new());
        let clock = Arc::new(ManualClock::new(start));
        let settings = Arc::new(ProtocolSettings::new());
        let factory = Arc::new(PairFactory::new(
            ledger.clone(),
            clock.clone(),
            settings.clone(),
            config.pool,
        ));
        let oracle = PriceOracle::new(factory.clone(), ledger.clone(), clock.clone(), config.oracle);
        let router = Router::new(factory.clone(), ledger.clone(), clock.clone());

        Self {
            ledger,
            clock,
            settings,
            factory,
            oracle,
            router,
        }
    }

    /// The A/B pool (A sorts first, so it is asset0)
    pub fn pool_ab(&self) -> Arc<Pool> {
        self.factory.create_pair(token_a(), token_b()).unwrap()
    }

    pub fn fund(&self, asset: Address, holder: Address, amount: u128) {
        self.ledger.mint(asset, holder, amount).unwrap();
    }

    pub fn balance(&self, asset: Address, holder: Address) -> u128 {
        self.ledger.balance_of(asset, holder)
    }

    /// Fund `lp()`, send both amounts to the pool and mint to `lp()`
    pub fn add_liquidity(&self, pool: &Pool, amount0: u128, amount1: u128) -> u128 {
        self.deposit(pool, lp(), amount0, amount1);
        pool.mint(lp(), lp()).unwrap()
    }

    /// Fund `from` and move both amounts into the pool without minting
    pub fn deposit(&self, pool: &Pool, from: Address, amount0: u128, amount1: u128) {
        self.fund(pool.asset0(), from, amount0);
        self.fund(pool.asset1(), from, amount1);
        self.ledger
            .transfer(pool.asset0(), from, pool.address(), amount0)
            .unwrap();
        self.ledger
            .transfer(pool.asset1(), from, pool.address(), amount1)
            .unwrap();
    }

    /// Fund `trader()` with `amount_in`, pay it in and take the quoted output
    pub fn swap_in(&self, pool: &Pool, asset_in: Address, amount_in: u128) -> PoolResult<u128> {
        let amount_out = pool.get_amount_out(asset_in, amount_in)?;
        self.fund(asset_in, trader(), amount_in);
        self.ledger
            .transfer(asset_in, trader(), pool.address(), amount_in)?;
        let (amount0_out, amount1_out) = if asset_in == pool.asset0() {
            (0, amount_out)
        } else {
            (amount_out, 0)
        };
        pool.swap(trader(), amount0_out, amount1_out, trader(), &[], None)?;
        Ok(amount_out)
    }
}
