//! TTL Tree - An embeddable ordered key-value store
//!
//! Stores values in a height-balanced (AVL) tree keyed by a hash of the
//! caller's identifier, and reclaims expired entries with a background sweep.

pub mod config;
pub mod error;
pub mod store;
pub mod tasks;
pub mod tree;

pub use config::StoreConfig;
pub use error::StoreError;
pub use store::{Entry, StoreStats, TtlStore};
pub use tasks::ExpirySweeper;
pub use tree::{fnv1a_64, AvlTree, Fnv1a, KeyHasher};
