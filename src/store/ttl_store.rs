//! TTL Store Module
//!
//! Main store type combining the AVL tree, key hashing and the expiry sweeper.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{info, trace, warn};

use crate::config::StoreConfig;
use crate::store::{Entry, StoreStats, SweepCounters};
use crate::tasks::ExpirySweeper;
use crate::tree::{AvlTree, Fnv1a, KeyHasher};

// == TTL Store ==
/// Ordered key-value store whose entries expire after a time-to-live.
///
/// Reads share the tree lock; inserts, removals and sweeps take it
/// exclusively. Entries past their expiry are invisible to reads even
/// before the sweeper reclaims them.
///
/// Identifiers are ordered by their hash. Two identifiers with the same hash
/// share one slot, so the second insert overwrites the first.
#[derive(Debug)]
pub struct TtlStore<H: KeyHasher = Fnv1a> {
    /// The tree, guarded by a reader-writer lock
    tree: Arc<RwLock<AvlTree>>,
    /// Sweep counters shared with the sweeper
    counters: Arc<SweepCounters>,
    hasher: H,
    initialized_at: DateTime<Utc>,
    sweeper: ExpirySweeper,
}

impl TtlStore<Fnv1a> {
    // == Constructor ==
    /// Creates an empty store with the default configuration and starts its
    /// sweeper.
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default())
    }

    /// Creates an empty store with the given configuration.
    pub fn with_config(config: &StoreConfig) -> Self {
        Self::with_hasher(config, Fnv1a)
    }
}

impl Default for TtlStore<Fnv1a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: KeyHasher> TtlStore<H> {
    /// Creates an empty store that orders identifiers with `hasher`.
    ///
    /// # Arguments
    /// * `config` - Store configuration
    /// * `hasher` - Maps identifiers to ordering keys
    pub fn with_hasher(config: &StoreConfig, hasher: H) -> Self {
        let tree = Arc::new(RwLock::new(AvlTree::new()));
        let counters = Arc::new(SweepCounters::new());
        let sweeper = ExpirySweeper::start(tree.clone(), counters.clone(), config.sweep_interval);
        let initialized_at = Utc::now();

        info!(%initialized_at, "TTL store initialized");

        Self {
            tree,
            counters,
            hasher,
            initialized_at,
            sweeper,
        }
    }

    // == Insert ==
    /// Stores `value` under `key` for `ttl`.
    ///
    /// Re-inserting a key replaces its value and restarts its TTL.
    ///
    /// # Returns
    /// The stored entry, or `None` if the key could not be hashed.
    pub async fn insert(&self, key: &str, value: impl Into<Bytes>, ttl: Duration) -> Option<Entry> {
        let ordering_key = self.ordering_key(key)?;

        let mut tree = self.tree.write().await;
        let created = tree.insert(ordering_key, key.to_string(), value.into(), ttl);
        trace!(key, created, "insert");
        tree.lookup(ordering_key).map(Entry::from)
    }

    // == Remove ==
    /// Removes `key`. Absent keys are a no-op.
    pub async fn remove(&self, key: &str) {
        let Some(ordering_key) = self.ordering_key(key) else {
            return;
        };

        let removed = self.tree.write().await.delete(ordering_key);
        trace!(key, removed = removed.is_some(), "remove");
    }

    // == Exists ==
    /// Returns true if `key` is stored and has not expired.
    pub async fn exists(&self, key: &str) -> bool {
        let Some(ordering_key) = self.ordering_key(key) else {
            return false;
        };

        let now = Utc::now();
        self.tree
            .read()
            .await
            .lookup(ordering_key)
            .is_some_and(|node| !node.is_expired_at(now))
    }

    // == Get ==
    /// Returns a copy of the entry stored under `key`.
    ///
    /// Returns `None` if the key is absent, has expired, or cannot be hashed.
    pub async fn get(&self, key: &str) -> Option<Entry> {
        let ordering_key = self.ordering_key(key)?;

        let now = Utc::now();
        self.tree
            .read()
            .await
            .lookup(ordering_key)
            .filter(|node| !node.is_expired_at(now))
            .map(Entry::from)
    }

    // == Min / Max ==
    /// Smallest ordering key in the store, or `u64::MAX` when empty.
    pub async fn min(&self) -> u64 {
        self.tree.read().await.min()
    }

    /// Largest ordering key in the store, or `0` when empty.
    pub async fn max(&self) -> u64 {
        self.tree.read().await.max()
    }

    /// Returns true if the underlying tree satisfies the AVL invariant.
    pub async fn is_balanced(&self) -> bool {
        self.tree.read().await.is_balanced()
    }

    // == Entries ==
    /// Returns every unexpired entry in ordering-key order.
    pub async fn entries(&self) -> Vec<Entry> {
        let now = Utc::now();
        let mut entries = Vec::new();
        self.tree.read().await.in_order(|node| {
            if !node.is_expired_at(now) {
                entries.push(Entry::from(node));
            }
        });
        entries
    }

    // == Length ==
    /// Number of stored entries, counting expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.tree.read().await.len()
    }

    /// Returns true if the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.tree.read().await.is_empty()
    }

    // == Stats ==
    /// Number of sweep cycles started since construction.
    pub fn sweep_cycle_count(&self) -> u64 {
        self.counters.cycles()
    }

    /// When the store was constructed.
    pub fn initialized_at(&self) -> DateTime<Utc> {
        self.initialized_at
    }

    /// Returns a snapshot of the store's statistics.
    pub async fn stats(&self) -> StoreStats {
        StoreStats {
            entries: self.len().await,
            sweep_cycles: self.counters.cycles(),
            swept_entries: self.counters.swept(),
            initialized_at: self.initialized_at,
        }
    }

    // == Sweeper Control ==
    /// Stops the background sweeper. Expired entries stay invisible to reads
    /// but are no longer reclaimed.
    pub fn stop_sweeper(&self) {
        self.sweeper.stop();
    }

    /// Returns true while the background sweeper is running.
    pub fn is_sweeper_running(&self) -> bool {
        self.sweeper.is_running()
    }

    /// Stops the sweeper, waits for it to finish and drops the store.
    pub async fn shutdown(self) {
        self.sweeper.shutdown().await;
    }

    fn ordering_key(&self, key: &str) -> Option<u64> {
        match self.hasher.hash_key(key) {
            Ok(ordering_key) => Some(ordering_key),
            Err(err) => {
                warn!(key, error = %err, "Failed to hash key");
                None
            }
        }
    }
}
