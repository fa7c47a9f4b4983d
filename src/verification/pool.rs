use std::sync::{Condvar, Mutex, PoisonError};

use crate::errors::TriageError;

/// Counting slot pool: at most `capacity` guards are alive at once.
///
/// `acquire` blocks until a slot frees up; dropping the returned guard
/// releases the slot and wakes one waiter.
pub struct SlotPool {
    name: &'static str,
    capacity: usize,
    state: Mutex<SlotState>,
    available: Condvar,
}

/// Internal occupancy counters behind `SlotPool` locks.
#[derive(Default)]
struct SlotState {
    in_use: usize,
    peak_in_use: usize,
    acquisitions: u64,
}

impl SlotPool {
    /// Create a pool named `name` (used in errors) with `capacity` slots.
    pub fn new(name: &'static str, capacity: usize) -> Result<Self, TriageError> {
        if capacity == 0 {
            return Err(TriageError::Configuration(format!(
                "{name} pool needs at least one slot"
            )));
        }
        Ok(Self {
            name,
            capacity,
            state: Mutex::new(SlotState::default()),
            available: Condvar::new(),
        })
    }

    /// Block until a slot is free and take it.
    pub fn acquire(&self) -> SlotGuard<'_> {
        let mut state = self.state.lock().expect("slot pool poisoned");
        while state.in_use >= self.capacity {
            state = self.available.wait(state).expect("slot pool poisoned");
        }
        state.in_use += 1;
        state.peak_in_use = state.peak_in_use.max(state.in_use);
        state.acquisitions = state.acquisitions.saturating_add(1);
        SlotGuard { pool: self }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held.
    pub fn in_use(&self) -> usize {
        self.state.lock().expect("slot pool poisoned").in_use
    }

    /// Highest number of slots ever held at the same time.
    pub fn peak_in_use(&self) -> usize {
        self.state.lock().expect("slot pool poisoned").peak_in_use
    }

    /// Total successful acquisitions since creation.
    pub fn acquisitions(&self) -> u64 {
        self.state.lock().expect("slot pool poisoned").acquisitions
    }

    fn release(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.in_use = state.in_use.saturating_sub(1);
        drop(state);
        self.available.notify_one();
    }
}

/// Held slot; released on drop.
pub struct SlotGuard<'a> {
    pool: &'a SlotPool,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.pool.release();
    }
}

/// Slots bounding concurrent scrape calls.
pub struct ScrapePool(SlotPool);

impl ScrapePool {
    pub fn new(capacity: usize) -> Result<Self, TriageError> {
        SlotPool::new("scrape", capacity).map(Self)
    }

    pub fn slots(&self) -> &SlotPool {
        &self.0
    }
}

/// Slots bounding concurrent classifier calls.
pub struct VerifyPool(SlotPool);

impl VerifyPool {
    pub fn new(capacity: usize) -> Result<Self, TriageError> {
        SlotPool::new("verify", capacity).map(Self)
    }

    pub fn slots(&self) -> &SlotPool {
        &self.0
    }
}
