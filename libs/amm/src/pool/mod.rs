//! Pool Invariant Engine
//!
//! One [`Pool`] per unordered asset pair. The pool owns its reserves, price
//! accumulators, fee liabilities and liquidity-share ledger; balances live in
//! the host [`Ledger`]. Every state-mutating entry point:
//!
//! 1. takes the pool's single-writer lock (failing with `Locked` on reentry),
//! 2. opens a ledger checkpoint and registers a restore with it (a copy of
//!    the fixed-size state plus the share-ledger edits made by the operation),
//! 3. runs, and on any failure rolls the checkpoint back so balances, pool
//!    state and events all return to where they were.
//!
//! Amounts received are always measured as balance deltas against recorded
//! reserves, never trusted from a nominal transfer amount, so assets that
//! deliver less than requested are handled uniformly.

mod callee;
mod guard;
mod shares;
mod state;

pub use callee::FlashSwapCallee;
pub use shares::{ShareEdit, ShareLedger};
pub use state::Reserves;

use crate::error::{PoolError, PoolResult};
use crate::events::Event;
use crate::fees::{self, AccruedFees};
use crate::host::{Clock, Ledger};
use crate::math::{
    accumulate_price, mul_div, product, sqrt_product, Uq112x112, MAX_U112, U256,
};
use crate::registry::FeeSettings;
use crate::types::Address;
use amm_config::PoolParams;
use guard::ReentrancyLock;
use parking_lot::Mutex;
use state::PoolState;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Order two assets canonically, rejecting zero and identical identifiers
pub fn sort_assets(asset_a: Address, asset_b: Address) -> PoolResult<(Address, Address)> {
    if asset_a == asset_b {
        return Err(PoolError::IdenticalAssets);
    }
    let (asset0, asset1) = if asset_a < asset_b {
        (asset_a, asset_b)
    } else {
        (asset_b, asset_a)
    };
    if asset0.is_zero() {
        return Err(PoolError::ZeroAddress);
    }
    Ok((asset0, asset1))
}

/// Constant-product pool over two canonically ordered assets
pub struct Pool {
    address: Address,
    asset0: Address,
    asset1: Address,
    params: PoolParams,
    ledger: Arc<dyn Ledger>,
    clock: Arc<dyn Clock>,
    settings: Arc<dyn FeeSettings>,
    state: Arc<Mutex<PoolState>>,
    lock: ReentrancyLock,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("address", &self.address)
            .field("asset0", &self.asset0)
            .field("asset1", &self.asset1)
            .field("reserves", &self.reserves())
            .finish()
    }
}

impl Pool {
    /// Bind a pool to its pair. Assets are fixed for the pool's lifetime.
    pub fn new(
        address: Address,
        asset_a: Address,
        asset_b: Address,
        params: PoolParams,
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
        settings: Arc<dyn FeeSettings>,
    ) -> PoolResult<Self> {
        if address.is_zero() {
            return Err(PoolError::ZeroAddress);
        }
        let (asset0, asset1) = sort_assets(asset_a, asset_b)?;
        Ok(Self {
            address,
            asset0,
            asset1,
            params,
            ledger,
            clock,
            settings,
            state: Arc::new(Mutex::new(PoolState::default())),
            lock: ReentrancyLock::default(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn asset0(&self) -> Address {
        self.asset0
    }

    pub fn asset1(&self) -> Address {
        self.asset1
    }

    pub fn contains(&self, asset: Address) -> bool {
        asset == self.asset0 || asset == self.asset1
    }

    pub fn params(&self) -> &PoolParams {
        &self.params
    }

    pub fn reserves(&self) -> Reserves {
        self.state.lock().reserves()
    }

    /// Cumulative prices as of the last sync (asset1 per asset0, asset0 per asset1)
    pub fn price_cumulative_last(&self) -> (U256, U256) {
        let state = self.state.lock();
        (state.price0_cumulative_last, state.price1_cumulative_last)
    }

    pub fn k_last(&self) -> U256 {
        self.state.lock().k_last
    }

    /// Uncollected fee liabilities per asset
    pub fn accrued_fees(&self) -> (AccruedFees, AccruedFees) {
        let state = self.state.lock();
        (state.fees0, state.fees1)
    }

    pub fn total_shares(&self) -> u128 {
        self.state.lock().shares.total_supply()
    }

    pub fn share_balance_of(&self, holder: Address) -> u128 {
        self.state.lock().shares.balance_of(holder)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> u128 {
        self.state.lock().shares.allowance(owner, spender)
    }

    /// Whether an operation is currently executing on this pool
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Issue liquidity shares for assets already transferred into the pool
    ///
    /// Returns the number of shares issued to `to`.
    pub fn mint(&self, sender: Address, to: Address) -> PoolResult<u128> {
        self.transact("mint", || {
            if to.is_zero() {
                return Err(PoolError::ZeroAddress);
            }

            let mut state = self.state.lock();
            let (reserve0, reserve1) = (state.reserve0, state.reserve1);
            let balance0 = self.net_balance(self.asset0, &state.fees0)?;
            let balance1 = self.net_balance(self.asset1, &state.fees1)?;
            let amount0 = balance0
                .checked_sub(reserve0)
                .ok_or(PoolError::InsufficientInputAmount)?;
            let amount1 = balance1
                .checked_sub(reserve1)
                .ok_or(PoolError::InsufficientInputAmount)?;

            let fee_on = self.mint_fee(&mut state, reserve0, reserve1)?;
            let total_shares = state.shares.total_supply();
            let minimum = u128::from(self.params.minimum_liquidity);

            let liquidity = if total_shares == 0 {
                if amount0 <= minimum || amount1 <= minimum {
                    return Err(PoolError::InsufficientInitialLiquidity { minimum });
                }
                // Lock the floor forever so the share price can never be
                // pushed up from a dust-sized supply
                self.mint_shares(&mut state, Address::BURN, minimum)?;
                sqrt_product(amount0, amount1) - minimum
            } else {
                mul_div(amount0, total_shares, reserve0)?
                    .min(mul_div(amount1, total_shares, reserve1)?)
            };

            if liquidity == 0 {
                return Err(PoolError::InsufficientLiquidityMinted);
            }
            self.mint_shares(&mut state, to, liquidity)?;

            self.update(&mut state, balance0, balance1, reserve0, reserve1)?;
            if fee_on {
                state.k_last = product(state.reserve0, state.reserve1);
            }
            drop(state);

            self.ledger.emit(Event::Mint {
                pool: self.address,
                sender,
                amount0,
                amount1,
            });
            info!(pool = %self.address, %to, liquidity, amount0, amount1, "mint");
            Ok(liquidity)
        })
    }

    /// Redeem the shares held by the pool itself for a pro-rata slice of both
    /// assets, sent to `to`
    pub fn burn(&self, sender: Address, to: Address) -> PoolResult<(u128, u128)> {
        self.transact("burn", || {
            if to.is_zero() {
                return Err(PoolError::ZeroAddress);
            }

            let mut state = self.state.lock();
            let (reserve0, reserve1) = (state.reserve0, state.reserve1);
            let balance0 = self.net_balance(self.asset0, &state.fees0)?;
            let balance1 = self.net_balance(self.asset1, &state.fees1)?;
            let liquidity = state.shares.balance_of(self.address);

            let fee_on = self.mint_fee(&mut state, reserve0, reserve1)?;
            let total_shares = state.shares.total_supply();
            if total_shares == 0 {
                return Err(PoolError::InsufficientLiquidityBurned);
            }

            let amount0 = mul_div(liquidity, balance0, total_shares)?;
            let amount1 = mul_div(liquidity, balance1, total_shares)?;
            if amount0 == 0 || amount1 == 0 {
                return Err(PoolError::InsufficientLiquidityBurned);
            }

            // Shares are destroyed before any asset leaves the pool
            state.shares.burn(self.address, liquidity)?;
            self.ledger.emit(Event::Transfer {
                pool: self.address,
                from: self.address,
                to: Address::ZERO,
                value: liquidity,
            });
            drop(state);

            self.ledger
                .transfer(self.asset0, self.address, to, amount0)?;
            self.ledger
                .transfer(self.asset1, self.address, to, amount1)?;

            let mut state = self.state.lock();
            let balance0 = self.net_balance(self.asset0, &state.fees0)?;
            let balance1 = self.net_balance(self.asset1, &state.fees1)?;
            self.update(&mut state, balance0, balance1, reserve0, reserve1)?;
            if fee_on {
                state.k_last = product(state.reserve0, state.reserve1);
            }
            drop(state);

            self.ledger.emit(Event::Burn {
                pool: self.address,
                sender,
                amount0,
                amount1,
                to,
            });
            info!(pool = %self.address, %to, liquidity, amount0, amount1, "burn");
            Ok((amount0, amount1))
        })
    }

    /// Send the requested outputs to `to`, optionally call back into `callee`,
    /// then require that the fee-adjusted constant product did not decrease
    ///
    /// Non-empty `data` makes this a flash swap: output is delivered first and
    /// `callee` must settle before the pool verifies payment.
    pub fn swap(
        &self,
        sender: Address,
        amount0_out: u128,
        amount1_out: u128,
        to: Address,
        data: &[u8],
        callee: Option<&dyn FlashSwapCallee>,
    ) -> PoolResult<()> {
        self.transact("swap", || {
            if amount0_out == 0 && amount1_out == 0 {
                return Err(PoolError::InsufficientOutputAmount);
            }
            if to.is_zero() {
                return Err(PoolError::ZeroAddress);
            }
            if to == self.asset0 || to == self.asset1 {
                return Err(PoolError::InvalidTo { to });
            }

            // Provisional commit: a nested reader during the callback sees
            // reserves net of the optimistic outputs
            let (reserve0, reserve1) = {
                let mut state = self.state.lock();
                let (reserve0, reserve1) = (state.reserve0, state.reserve1);
                if amount0_out >= reserve0 || amount1_out >= reserve1 {
                    return Err(PoolError::InsufficientLiquidity);
                }
                state.reserve0 = reserve0 - amount0_out;
                state.reserve1 = reserve1 - amount1_out;
                (reserve0, reserve1)
            };

            if amount0_out > 0 {
                self.ledger
                    .transfer(self.asset0, self.address, to, amount0_out)?;
            }
            if amount1_out > 0 {
                self.ledger
                    .transfer(self.asset1, self.address, to, amount1_out)?;
            }
            if !data.is_empty() {
                let callee = callee.ok_or(PoolError::MissingCallee)?;
                debug!(pool = %self.address, %to, amount0_out, amount1_out, "flash-swap callback");
                callee.on_flash_swap(sender, amount0_out, amount1_out, data)?;
            }

            let mut state = self.state.lock();
            let balance0 = self.net_balance(self.asset0, &state.fees0)?;
            let balance1 = self.net_balance(self.asset1, &state.fees1)?;
            for balance in [balance0, balance1] {
                if balance > MAX_U112 {
                    return Err(PoolError::ReserveOverflow { reserve: balance });
                }
            }

            let amount0_in = balance0.saturating_sub(reserve0 - amount0_out);
            let amount1_in = balance1.saturating_sub(reserve1 - amount1_out);
            if amount0_in == 0 && amount1_in == 0 {
                return Err(PoolError::InsufficientInputAmount);
            }

            if !fees::k_invariant_holds(
                balance0,
                balance1,
                amount0_in,
                amount1_in,
                reserve0,
                reserve1,
                self.params.swap_fee_bps,
            )? {
                return Err(PoolError::KValueCheckFailed);
            }

            let protocol_enabled = self.settings.fee_to().is_some();
            let mut reserve0_next = balance0;
            let mut reserve1_next = balance1;
            if amount0_in > 0 {
                let split = fees::split_input_fee(
                    amount0_in,
                    &self.params,
                    protocol_enabled,
                    self.settings.originator_of(self.asset0).is_some(),
                );
                state.fees0.accrue(split)?;
                reserve0_next -= split.total();
            }
            if amount1_in > 0 {
                let split = fees::split_input_fee(
                    amount1_in,
                    &self.params,
                    protocol_enabled,
                    self.settings.originator_of(self.asset1).is_some(),
                );
                state.fees1.accrue(split)?;
                reserve1_next -= split.total();
            }

            self.update(&mut state, reserve0_next, reserve1_next, reserve0, reserve1)?;
            drop(state);

            self.ledger.emit(Event::Swap {
                pool: self.address,
                sender,
                amount0_in,
                amount1_in,
                amount0_out,
                amount1_out,
                to,
            });
            info!(
                pool = %self.address,
                %to,
                amount0_in,
                amount1_in,
                amount0_out,
                amount1_out,
                "swap"
            );
            Ok(())
        })
    }

    /// Send any balance above reserves and fee liabilities to `to`
    ///
    /// With a fee recipient configured, accrued fees are collected first.
    /// Reserves are re-synchronized to the resulting balances.
    pub fn skim(&self, to: Address) -> PoolResult<(u128, u128)> {
        self.transact("skim", || {
            if to.is_zero() {
                return Err(PoolError::ZeroAddress);
            }
            if let Some(fee_to) = self.settings.fee_to() {
                self.distribute_fees(fee_to)?;
            }

            let (excess0, excess1) = {
                let state = self.state.lock();
                let balance0 = self.net_balance(self.asset0, &state.fees0)?;
                let balance1 = self.net_balance(self.asset1, &state.fees1)?;
                (
                    balance0.saturating_sub(state.reserve0),
                    balance1.saturating_sub(state.reserve1),
                )
            };
            if excess0 > 0 {
                self.ledger
                    .transfer(self.asset0, self.address, to, excess0)?;
            }
            if excess1 > 0 {
                self.ledger
                    .transfer(self.asset1, self.address, to, excess1)?;
            }

            let mut state = self.state.lock();
            let balance0 = self.net_balance(self.asset0, &state.fees0)?;
            let balance1 = self.net_balance(self.asset1, &state.fees1)?;
            let (reserve0, reserve1) = (state.reserve0, state.reserve1);
            self.update(&mut state, balance0, balance1, reserve0, reserve1)?;
            debug!(pool = %self.address, %to, excess0, excess1, "skim");
            Ok((excess0, excess1))
        })
    }

    /// Force reserves to match balances net of fee liabilities
    pub fn sync(&self) -> PoolResult<()> {
        self.transact("sync", || {
            let mut state = self.state.lock();
            let balance0 = self.net_balance(self.asset0, &state.fees0)?;
            let balance1 = self.net_balance(self.asset1, &state.fees1)?;
            if balance0 == 0 || balance1 == 0 {
                return Err(PoolError::InsufficientLiquidity);
            }
            let (reserve0, reserve1) = (state.reserve0, state.reserve1);
            self.update(&mut state, balance0, balance1, reserve0, reserve1)
        })
    }

    /// Pay out accrued fee liabilities
    ///
    /// Protocol fees go to the fee recipient; creator fees go to each asset's
    /// originator, or to the fee recipient when the asset has none.
    pub fn collect_fees(&self) -> PoolResult<(u128, u128)> {
        let fee_to = self
            .settings
            .fee_to()
            .ok_or(PoolError::FeeRecipientNotSet)?;
        self.transact("collect_fees", || self.distribute_fees(fee_to))
    }

    pub fn transfer_shares(&self, from: Address, to: Address, amount: u128) -> PoolResult<()> {
        self.transact("transfer_shares", || {
            if to.is_zero() {
                return Err(PoolError::ZeroAddress);
            }
            self.state.lock().shares.transfer(from, to, amount)?;
            self.ledger.emit(Event::Transfer {
                pool: self.address,
                from,
                to,
                value: amount,
            });
            Ok(())
        })
    }

    pub fn approve(&self, owner: Address, spender: Address, amount: u128) -> PoolResult<()> {
        self.transact("approve", || {
            if spender.is_zero() {
                return Err(PoolError::ZeroAddress);
            }
            self.state.lock().shares.approve(owner, spender, amount);
            self.ledger.emit(Event::Approval {
                pool: self.address,
                owner,
                spender,
                value: amount,
            });
            Ok(())
        })
    }

    pub fn transfer_shares_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> PoolResult<()> {
        self.transact("transfer_shares_from", || {
            if to.is_zero() {
                return Err(PoolError::ZeroAddress);
            }
            {
                let mut state = self.state.lock();
                state.shares.spend_allowance(from, spender, amount)?;
                state.shares.transfer(from, to, amount)?;
            }
            self.ledger.emit(Event::Transfer {
                pool: self.address,
                from,
                to,
                value: amount,
            });
            Ok(())
        })
    }

    /// Run `body` as one all-or-nothing operation under the pool lock
    fn transact<T>(&self, operation: &'static str, body: impl FnOnce() -> PoolResult<T>) -> PoolResult<T> {
        let _guard = self.lock.acquire()?;
        let checkpoint = self.ledger.checkpoint();

        let snapshot = {
            let mut state = self.state.lock();
            state.shares.begin_journal();
            state.snapshot()
        };
        let share_edits: Arc<Mutex<Vec<ShareEdit>>> = Arc::default();
        {
            let state = Arc::clone(&self.state);
            let share_edits = Arc::clone(&share_edits);
            self.ledger.record_undo(Box::new(move || {
                let mut state = state.lock();
                state.shares.revert(std::mem::take(&mut *share_edits.lock()));
                state.restore(snapshot);
            }));
        }

        let result = body();
        let edits = self.state.lock().shares.take_journal();
        *share_edits.lock() = edits;

        match result {
            Ok(value) => {
                self.ledger.release(checkpoint);
                Ok(value)
            }
            Err(err) => {
                self.ledger.rollback(checkpoint);
                warn!(pool = %self.address, operation, error = %err, "operation rolled back");
                Err(err)
            }
        }
    }

    /// Balance held by the pool minus fees owed to others
    fn net_balance(&self, asset: Address, accrued: &AccruedFees) -> PoolResult<u128> {
        let balance = self.ledger.balance_of(asset, self.address);
        balance
            .checked_sub(accrued.total())
            .ok_or(PoolError::FeeStateInvalid {
                asset,
                balance,
                accrued: accrued.total(),
            })
    }

    /// Commit reserves, accumulating the pre-update price over elapsed time
    fn update(
        &self,
        state: &mut PoolState,
        balance0: u128,
        balance1: u128,
        reserve0: u128,
        reserve1: u128,
    ) -> PoolResult<()> {
        for balance in [balance0, balance1] {
            if balance > MAX_U112 {
                return Err(PoolError::ReserveOverflow { reserve: balance });
            }
        }

        let now = self.clock.now();
        let elapsed = now.wrapping_sub(state.block_timestamp_last);
        if elapsed > 0 && reserve0 != 0 && reserve1 != 0 {
            state.price0_cumulative_last = accumulate_price(
                state.price0_cumulative_last,
                Uq112x112::ratio(reserve1, reserve0)?,
                elapsed,
            );
            state.price1_cumulative_last = accumulate_price(
                state.price1_cumulative_last,
                Uq112x112::ratio(reserve0, reserve1)?,
                elapsed,
            );
        }

        state.reserve0 = balance0;
        state.reserve1 = balance1;
        state.block_timestamp_last = now;
        self.ledger.emit(Event::Sync {
            pool: self.address,
            reserve0: balance0,
            reserve1: balance1,
        });
        Ok(())
    }

    /// Dilute liquidity providers by the protocol's slice of sqrt(K) growth
    ///
    /// Returns whether the protocol fee is on.
    fn mint_fee(&self, state: &mut PoolState, reserve0: u128, reserve1: u128) -> PoolResult<bool> {
        match self.settings.fee_to() {
            Some(fee_to) => {
                let liquidity = fees::protocol_fee_liquidity(
                    state.shares.total_supply(),
                    reserve0,
                    reserve1,
                    state.k_last,
                    self.params.protocol_share_divisor,
                )?;
                if liquidity > 0 {
                    self.mint_shares(state, fee_to, liquidity)?;
                    debug!(pool = %self.address, %fee_to, liquidity, "protocol fee shares");
                }
                Ok(true)
            }
            None => {
                if !state.k_last.is_zero() {
                    state.k_last = U256::zero();
                }
                Ok(false)
            }
        }
    }

    fn mint_shares(&self, state: &mut PoolState, to: Address, amount: u128) -> PoolResult<()> {
        state.shares.mint(to, amount)?;
        self.ledger.emit(Event::Transfer {
            pool: self.address,
            from: Address::ZERO,
            to,
            value: amount,
        });
        Ok(())
    }

    fn distribute_fees(&self, fee_to: Address) -> PoolResult<(u128, u128)> {
        let (fees0, fees1) = {
            let mut state = self.state.lock();
            (
                std::mem::take(&mut state.fees0),
                std::mem::take(&mut state.fees1),
            )
        };

        for (asset, accrued) in [(self.asset0, fees0), (self.asset1, fees1)] {
            if accrued.protocol > 0 {
                self.pay_fee(asset, fee_to, accrued.protocol)?;
            }
            if accrued.creator > 0 {
                let originator = self.settings.originator_of(asset).unwrap_or(fee_to);
                self.pay_fee(asset, originator, accrued.creator)?;
            }
        }
        Ok((fees0.total(), fees1.total()))
    }

    fn pay_fee(&self, asset: Address, recipient: Address, amount: u128) -> PoolResult<()> {
        self.ledger
            .transfer(asset, self.address, recipient, amount)?;
        self.ledger.emit(Event::FeesCollected {
            pool: self.address,
            asset,
            recipient,
            amount,
        });
        info!(pool = %self.address, %asset, %recipient, amount, "fees collected");
        Ok(())
    }
}
