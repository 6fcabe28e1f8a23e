//! Fixed-cardinality observation ring

use crate::math::U256;
use serde::{Deserialize, Serialize};

/// Cumulative prices captured at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: u32,
    pub price0_cumulative: U256,
    pub price1_cumulative: U256,
}

/// Circular history of observations with a write cursor
///
/// Every slot is populated from the moment the ring is created, so lookups
/// never see an empty slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationRing {
    slots: Vec<Observation>,
    current: usize,
}

impl ObservationRing {
    /// Ring of `cardinality` copies of `first`, cursor at slot 0
    pub fn filled(first: Observation, cardinality: usize) -> Self {
        Self {
            slots: vec![first; cardinality.max(1)],
            current: 0,
        }
    }

    pub fn cardinality(&self) -> usize {
        self.slots.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn latest(&self) -> &Observation {
        &self.slots[self.current]
    }

    /// Oldest surviving observation: the slot the next write will overwrite
    pub fn oldest(&self) -> &Observation {
        &self.slots[(self.current + 1) % self.slots.len()]
    }

    /// Overwrite the next slot and advance the cursor
    pub fn push(&mut self, observation: Observation) {
        self.current = (self.current + 1) % self.slots.len();
        self.slots[self.current] = observation;
    }

    /// Most recent observation taken at least `period` seconds before `now`,
    /// else the oldest one held
    ///
    /// Ages are measured with wrapping subtraction so the search stays
    /// correct across the 32-bit timestamp rollover.
    pub fn observation_at_or_before(&self, now: u32, period: u32) -> &Observation {
        let len = self.slots.len();
        (0..len)
            .map(|back| &self.slots[(self.current + len - back) % len])
            .find(|obs| now.wrapping_sub(obs.timestamp) >= period)
            .unwrap_or_else(|| self.oldest())
    }

    /// Slots in storage order
    pub fn slots(&self) -> &[Observation] {
        &self.slots
    }
}
