//! Store Statistics Module
//!
//! Tracks sweep activity and exposes a serialisable snapshot of the store.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Sweep Counters ==
/// Counters shared between a store and its expiry sweeper.
#[derive(Debug, Default)]
pub struct SweepCounters {
    cycles: AtomicU64,
    swept: AtomicU64,
}

impl SweepCounters {
    /// Creates counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Cycle ==
    /// Increments the cycle counter, wrapping to zero on overflow, and
    /// returns the new count.
    pub fn record_cycle(&self) -> u64 {
        self.cycles.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Adds `count` to the number of entries removed by sweeps.
    pub fn record_swept(&self, count: usize) {
        self.swept.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Number of sweep cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Number of entries removed by sweeps so far.
    pub fn swept(&self) -> u64 {
        self.swept.load(Ordering::Relaxed)
    }
}

// == Store Stats ==
/// Point-in-time snapshot of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Nodes currently in the tree, including expired ones not yet swept
    pub entries: usize,
    /// Sweep cycles started since construction
    pub sweep_cycles: u64,
    /// Entries removed by the sweeper since construction
    pub swept_entries: u64,
    /// When the store was constructed
    pub initialized_at: DateTime<Utc>,
}
