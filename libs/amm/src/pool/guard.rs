//! Single-writer exclusion for pool entry points
//!
//! The lock blocks logical reentrancy (a callback re-entering the pool it was
//! called from); there is no physical contention to arbitrate. The guard
//! releases on drop, so every exit path unlocks, failures included.

use crate::error::PoolError;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub(crate) struct ReentrancyLock {
    locked: AtomicBool,
}

impl ReentrancyLock {
    pub(crate) fn acquire(&self) -> Result<LockGuard<'_>, PoolError> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| PoolError::Locked)?;
        Ok(LockGuard { lock: self })
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

pub(crate) struct LockGuard<'a> {
    lock: &'a ReentrancyLock,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}
