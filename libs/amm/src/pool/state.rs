//! Mutable pool state

use crate::fees::AccruedFees;
use crate::math::U256;
use crate::pool::shares::ShareLedger;
use serde::{Deserialize, Serialize};

/// Recorded reserves and the time they were last synchronized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reserves {
    pub reserve0: u128,
    pub reserve1: u128,
    pub block_timestamp_last: u32,
}

/// Everything an operation may change
#[derive(Debug, Clone, Default)]
pub(crate) struct PoolState {
    pub(crate) reserve0: u128,
    pub(crate) reserve1: u128,
    pub(crate) block_timestamp_last: u32,
    pub(crate) price0_cumulative_last: U256,
    pub(crate) price1_cumulative_last: U256,
    pub(crate) k_last: U256,
    pub(crate) fees0: AccruedFees,
    pub(crate) fees1: AccruedFees,
    pub(crate) shares: ShareLedger,
}

/// Fixed-size part of [`PoolState`]; the share ledger journals its own edits
#[derive(Debug, Clone, Copy)]
pub(crate) struct StateSnapshot {
    reserve0: u128,
    reserve1: u128,
    block_timestamp_last: u32,
    price0_cumulative_last: U256,
    price1_cumulative_last: U256,
    k_last: U256,
    fees0: AccruedFees,
    fees1: AccruedFees,
}

impl PoolState {
    pub(crate) fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            reserve0: self.reserve0,
            reserve1: self.reserve1,
            block_timestamp_last: self.block_timestamp_last,
            price0_cumulative_last: self.price0_cumulative_last,
            price1_cumulative_last: self.price1_cumulative_last,
            k_last: self.k_last,
            fees0: self.fees0,
            fees1: self.fees1,
        }
    }

    pub(crate) fn restore(&mut self, snapshot: StateSnapshot) {
        self.reserve0 = snapshot.reserve0;
        self.reserve1 = snapshot.reserve1;
        self.block_timestamp_last = snapshot.block_timestamp_last;
        self.price0_cumulative_last = snapshot.price0_cumulative_last;
        self.price1_cumulative_last = snapshot.price1_cumulative_last;
        self.k_last = snapshot.k_last;
        self.fees0 = snapshot.fees0;
        self.fees1 = snapshot.fees1;
    }

    pub(crate) fn reserves(&self) -> Reserves {
        Reserves {
            reserve0: self.reserve0,
            reserve1: self.reserve1,
            block_timestamp_last: self.block_timestamp_last,
        }
    }
}
