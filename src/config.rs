//! Configuration Module
//!
//! Handles loading and managing store configuration from environment variables.

use std::env;
use std::time::Duration;

/// Default interval between expiry sweeps, in milliseconds.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 10_000;

/// Store configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Interval between background expiry sweeps
    pub sweep_interval: Duration,
}

impl StoreConfig {
    /// Creates a new StoreConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SWEEP_INTERVAL_MS` - Sweep frequency in milliseconds (default: 10000)
    pub fn from_env() -> Self {
        let sweep_interval_ms = env::var("SWEEP_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_MS);

        Self {
            sweep_interval: Duration::from_millis(sweep_interval_ms),
        }
    }

    /// Returns a copy of this config with a different sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS),
        }
    }
}
