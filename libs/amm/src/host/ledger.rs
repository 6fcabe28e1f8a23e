//! Asset ledger with nested all-or-nothing checkpoints
//!
//! A checkpoint opens a journal scope. Until the outermost scope is released,
//! every balance change, emitted event and registered undo action is
//! journaled, so a rollback to any open checkpoint restores balances, replays
//! undo actions in reverse and discards the events, including those produced
//! by nested operations on other pools that already released their own
//! (inner) checkpoints.

use crate::error::LedgerError;
use crate::events::Event;
use crate::math::product;
use crate::math::U256;
use crate::types::Address;
use amm_config::BPS_DENOMINATOR;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// State restoration registered by a participant in the current operation
pub type UndoAction = Box<dyn FnOnce() + Send>;

/// Handle to an open journal scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    journal_len: usize,
    depth: usize,
}

impl Checkpoint {
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Host ledger primitives consumed by pools, the oracle and the router
pub trait Ledger: Send + Sync {
    fn balance_of(&self, asset: Address, holder: Address) -> u128;

    /// Move `amount` of `asset`. Fee-on-transfer assets may deliver less than
    /// `amount`; callers must measure what arrived by balance delta.
    fn transfer(
        &self,
        asset: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), LedgerError>;

    fn emit(&self, event: Event);

    fn checkpoint(&self) -> Checkpoint;

    /// Register an action that restores participant state on rollback
    fn record_undo(&self, undo: UndoAction);

    /// Close a scope, keeping its effects
    fn release(&self, checkpoint: Checkpoint);

    /// Close a scope, discarding every effect recorded since it opened
    fn rollback(&self, checkpoint: Checkpoint);
}

enum JournalEntry {
    Balance {
        asset: Address,
        holder: Address,
        previous: u128,
    },
    /// Position in the full event history, drained entries included
    Event { sequence: usize },
    Undo(UndoAction),
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<(Address, Address), u128>,
    transfer_fee_bps: HashMap<Address, u16>,
    rejecting: HashSet<Address>,
    events: Vec<Event>,
    /// Events already handed out by `take_events`
    drained: usize,
    journal: Vec<JournalEntry>,
    open_checkpoints: usize,
}

impl LedgerState {
    fn balance(&self, asset: Address, holder: Address) -> u128 {
        self.balances.get(&(asset, holder)).copied().unwrap_or(0)
    }

    fn set_balance(&mut self, asset: Address, holder: Address, value: u128) {
        let previous = self.balances.insert((asset, holder), value).unwrap_or(0);
        if self.open_checkpoints > 0 {
            self.journal.push(JournalEntry::Balance {
                asset,
                holder,
                previous,
            });
        }
    }

    fn credit(&mut self, asset: Address, holder: Address, amount: u128) -> Result<(), LedgerError> {
        let next = self
            .balance(asset, holder)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow { asset, holder })?;
        self.set_balance(asset, holder, next);
        Ok(())
    }
}

/// Journaled in-memory ledger
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` of `asset` out of thin air for `to`
    pub fn mint(&self, asset: Address, to: Address, amount: u128) -> Result<(), LedgerError> {
        self.state.lock().credit(asset, to, amount)
    }

    /// Make `asset` destroy `bps` of every transferred amount in flight
    pub fn set_transfer_fee(&self, asset: Address, bps: u16) {
        self.state.lock().transfer_fee_bps.insert(asset, bps);
    }

    /// Make every transfer of `asset` fail (or succeed again)
    pub fn set_rejecting(&self, asset: Address, rejecting: bool) {
        let mut state = self.state.lock();
        if rejecting {
            state.rejecting.insert(asset);
        } else {
            state.rejecting.remove(&asset);
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    /// Drain the event log
    pub fn take_events(&self) -> Vec<Event> {
        let mut state = self.state.lock();
        let events = std::mem::take(&mut state.events);
        state.drained += events.len();
        events
    }

    pub fn open_checkpoints(&self) -> usize {
        self.state.lock().open_checkpoints
    }
}

impl Ledger for InMemoryLedger {
    fn balance_of(&self, asset: Address, holder: Address) -> u128 {
        self.state.lock().balance(asset, holder)
    }

    fn transfer(
        &self,
        asset: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        if state.rejecting.contains(&asset) {
            return Err(LedgerError::TransferRejected { asset });
        }

        let available = state.balance(asset, from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                asset,
                holder: from,
                needed: amount,
                available,
            });
        }

        let fee_bps = state.transfer_fee_bps.get(&asset).copied().unwrap_or(0);
        let burned = (product(amount, u128::from(fee_bps)) / U256::from(BPS_DENOMINATOR)).low_u128();
        let delivered = amount - burned;

        if from != to && state.balance(asset, to).checked_add(delivered).is_none() {
            return Err(LedgerError::BalanceOverflow { asset, holder: to });
        }

        state.set_balance(asset, from, available - amount);
        state.credit(asset, to, delivered)?;
        trace!(%asset, %from, %to, amount, delivered, "transfer");
        Ok(())
    }

    fn emit(&self, event: Event) {
        let mut state = self.state.lock();
        let sequence = state.drained + state.events.len();
        state.events.push(event);
        if state.open_checkpoints > 0 {
            state.journal.push(JournalEntry::Event { sequence });
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        let mut state = self.state.lock();
        state.open_checkpoints += 1;
        Checkpoint {
            journal_len: state.journal.len(),
            depth: state.open_checkpoints,
        }
    }

    fn record_undo(&self, undo: UndoAction) {
        let mut state = self.state.lock();
        if state.open_checkpoints > 0 {
            state.journal.push(JournalEntry::Undo(undo));
        }
    }

    fn release(&self, checkpoint: Checkpoint) {
        let mut state = self.state.lock();
        debug_assert_eq!(checkpoint.depth, state.open_checkpoints);
        state.open_checkpoints = state.open_checkpoints.saturating_sub(1);
        if state.open_checkpoints == 0 {
            state.journal.clear();
        }
    }

    fn rollback(&self, checkpoint: Checkpoint) {
        let mut undos = Vec::new();
        {
            let mut state = self.state.lock();
            debug_assert_eq!(checkpoint.depth, state.open_checkpoints);
            let start = checkpoint.journal_len.min(state.journal.len());
            let entries: Vec<JournalEntry> = state.journal.drain(start..).collect();
            for entry in entries.into_iter().rev() {
                match entry {
                    JournalEntry::Balance {
                        asset,
                        holder,
                        previous,
                    } => {
                        state.balances.insert((asset, holder), previous);
                    }
                    JournalEntry::Event { sequence } => {
                        // Events already drained by a reader cannot be retracted
                        if let Some(position) = sequence.checked_sub(state.drained) {
                            state.events.truncate(position);
                        }
                    }
                    JournalEntry::Undo(undo) => undos.push(undo),
                }
            }
            state.open_checkpoints = state.open_checkpoints.saturating_sub(1);
            if state.open_checkpoints == 0 {
                state.journal.clear();
            }
            debug!(depth = checkpoint.depth, undone = undos.len(), "ledger rollback");
        }
        // Participant state is restored outside the ledger lock, newest first
        for undo in undos {
            undo();
        }
    }
}
