//! Event log surface for off-process observers
//!
//! Events are emitted through the host [`Ledger`](crate::host::Ledger) so that
//! a rolled-back operation leaves no trace in the log.

use crate::math::U256;
use crate::types::Address;
use serde::{Deserialize, Serialize};

/// Every record the engine can emit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    PairCreated {
        pool: Address,
        asset0: Address,
        asset1: Address,
    },
    Mint {
        pool: Address,
        sender: Address,
        amount0: u128,
        amount1: u128,
    },
    Burn {
        pool: Address,
        sender: Address,
        amount0: u128,
        amount1: u128,
        to: Address,
    },
    Swap {
        pool: Address,
        sender: Address,
        amount0_in: u128,
        amount1_in: u128,
        amount0_out: u128,
        amount1_out: u128,
        to: Address,
    },
    Sync {
        pool: Address,
        reserve0: u128,
        reserve1: u128,
    },
    Transfer {
        pool: Address,
        from: Address,
        to: Address,
        value: u128,
    },
    Approval {
        pool: Address,
        owner: Address,
        spender: Address,
        value: u128,
    },
    FeesCollected {
        pool: Address,
        asset: Address,
        recipient: Address,
        amount: u128,
    },
    PairInitialized {
        pool: Address,
        timestamp: u32,
    },
    OracleUpdated {
        pool: Address,
        price0_cumulative: U256,
        price1_cumulative: U256,
        timestamp: u32,
    },
}

impl Event {
    /// Pool (or pair) the event belongs to
    pub fn pool(&self) -> Address {
        match self {
            Event::PairCreated { pool, .. }
            | Event::Mint { pool, .. }
            | Event::Burn { pool, .. }
            | Event::Swap { pool, .. }
            | Event::Sync { pool, .. }
            | Event::Transfer { pool, .. }
            | Event::Approval { pool, .. }
            | Event::FeesCollected { pool, .. }
            | Event::PairInitialized { pool, .. }
            | Event::OracleUpdated { pool, .. } => *pool,
        }
    }
}

/// Render events as newline-delimited JSON
pub fn to_json_lines(events: &[Event]) -> serde_json::Result<String> {
    let mut out = String::new();
    for event in events {
        out.push_str(&serde_json::to_string(event)?);
        out.push('\n');
    }
    Ok(out)
}
