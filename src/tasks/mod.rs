//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a store.
//!
//! # Tasks
//! - Expiry Sweep: Removes expired entries at a fixed interval

mod sweeper;

pub use sweeper::ExpirySweeper;
