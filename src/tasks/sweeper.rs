//! Expiry Sweep Task
//!
//! Background task that periodically walks the whole tree and removes
//! entries whose TTL has elapsed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::store::SweepCounters;
use crate::tree::AvlTree;

/// Shortest interval the sweeper will run at.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

// == Expiry Sweeper ==
/// Handle to a running expiry sweep task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl ExpirySweeper {
    /// Spawns the sweep task on the current Tokio runtime.
    ///
    /// The first sweep runs immediately, then one every `interval`. Each
    /// cycle bumps the cycle counter before taking the write lock on the
    /// tree.
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    ///
    /// # Example
    /// ```ignore
    /// let tree = Arc::new(RwLock::new(AvlTree::new()));
    /// let sweeper = ExpirySweeper::start(tree, Arc::new(SweepCounters::new()), Duration::from_secs(10));
    /// // Later, during teardown:
    /// sweeper.shutdown().await;
    /// ```
    pub fn start(
        tree: Arc<RwLock<AvlTree>>,
        counters: Arc<SweepCounters>,
        interval: Duration,
    ) -> Self {
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(sweep_loop(tree, counters, interval, shutdown_rx));
        info!(
            interval_ms = interval.as_millis() as u64,
            "Expiry sweeper started"
        );

        Self {
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Signals the task to stop after its current cycle.
    pub fn stop(&self) {
        if !*self.shutdown_tx.borrow() {
            let _ = self.shutdown_tx.send(true);
            info!("Expiry sweeper stopped");
        }
    }

    /// Returns true until the task has finished.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the task and waits for it to finish.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweep_loop(
    tree: Arc<RwLock<AvlTree>>,
    counters: Arc<SweepCounters>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let cycle = counters.record_cycle();

        let removed = {
            let mut tree = tree.write().await;
            tree.remove_expired(Utc::now())
        };
        counters.record_swept(removed);

        if removed > 0 {
            info!(cycle, removed, "Expiry sweep removed expired entries");
        } else {
            debug!(cycle, "Expiry sweep found no expired entries");
        }
    }
}
