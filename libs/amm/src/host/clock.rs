//! Coarse wraparound clock
//!
//! Timestamps are seconds modulo 2^32. Consumers must only ever compare two
//! readings through `wrapping_sub`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    /// Current time in seconds, truncated to 32 bits
    fn now(&self) -> u32;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u32 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as u32)
            .unwrap_or(0)
    }
}

/// Explicitly driven clock for simulations and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    seconds: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            seconds: AtomicU64::new(start),
        }
    }

    pub fn set(&self, seconds: u64) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u64) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Untruncated seconds
    pub fn seconds(&self) -> u64 {
        self.seconds.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u32 {
        // Truncation is the wraparound
        self.seconds() as u32
    }
}
