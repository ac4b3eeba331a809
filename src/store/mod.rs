//! Store Module
//!
//! Public facade over the AVL engine: key hashing, locking, expiry-aware
//! reads and the background sweeper.

mod entry;
mod stats;
mod ttl_store;

// Re-export public types
pub use entry::Entry;
pub use stats::{StoreStats, SweepCounters};
pub use ttl_store::TtlStore;
