//! Entry Module
//!
//! The public, owned view of a stored node handed back to callers.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::tree::Node;

// == Entry ==
/// A copy of one stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// The identifier the entry was stored under
    pub key: String,
    /// The stored value
    pub value: Bytes,
    /// Absolute instant at which the entry expires
    pub expires_at: DateTime<Utc>,
}

impl Entry {
    // == Time To Live ==
    /// Returns the time left before expiry, or zero if already expired.
    pub fn ttl_remaining(&self) -> Duration {
        (self.expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }

    /// Checks if the entry has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

impl From<&Node> for Entry {
    fn from(node: &Node) -> Self {
        Self {
            key: node.id.clone(),
            value: node.value.clone(),
            expires_at: node.expires_at,
        }
    }
}
