//! Host runtime primitives
//!
//! The engine does not own balances, time or the event log. It consumes them
//! from the host: a [`Ledger`] that moves assets, records events and provides
//! nested all-or-nothing checkpoints, and a coarse wraparound [`Clock`].

mod clock;
mod ledger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ledger::{Checkpoint, InMemoryLedger, Ledger, UndoAction};
