//! Tree Node Module
//!
//! Defines the unit of storage: one identifier, its payload and its expiry.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Owned, optional child pointer.
pub type Link = Option<Box<Node>>;

// == Node ==
/// A single stored entry plus its position in the tree.
#[derive(Debug)]
pub struct Node {
    /// Identifier as supplied by the caller
    pub id: String,
    /// The stored payload
    pub value: Bytes,
    /// Time-to-live the entry was written with
    pub ttl: Duration,
    /// Absolute instant at which the entry expires
    pub expires_at: DateTime<Utc>,
    /// Ordering key, the hash of `id`
    pub(crate) key: u64,
    /// Cached subtree height; 0 for a leaf
    pub(crate) height: i32,
    pub(crate) left: Link,
    pub(crate) right: Link,
}

impl Node {
    // == Constructor ==
    /// Creates a detached leaf that expires `ttl` from now.
    pub fn new(key: u64, id: String, value: Bytes, ttl: Duration) -> Self {
        Self {
            id,
            value,
            ttl,
            expires_at: expiry_from_now(ttl),
            key,
            height: 0,
            left: None,
            right: None,
        }
    }

    /// Returns the ordering key.
    pub fn key(&self) -> u64 {
        self.key
    }

    /// Returns the cached subtree height.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Takes over the payload of `fresh`, including its expiry.
    ///
    /// Children and the ordering key are left untouched.
    pub(crate) fn overwrite(&mut self, fresh: Node) {
        self.id = fresh.id;
        self.value = fresh.value;
        self.ttl = fresh.ttl;
        self.expires_at = fresh.expires_at;
    }

    // == Is Expired ==
    /// Checks whether the entry has expired as of `now`.
    ///
    /// An entry is expired once `now` reaches its expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Recomputes the cached height from the children.
    pub(crate) fn update_height(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    /// `height(left) - height(right)`.
    pub(crate) fn balance_factor(&self) -> i32 {
        height(&self.left) - height(&self.right)
    }
}

/// Height of a possibly-absent subtree; an absent subtree has height -1.
pub fn height(link: &Link) -> i32 {
    link.as_ref().map_or(-1, |n| n.height)
}

/// Absolute expiry for a TTL starting now, saturating at the latest
/// representable instant.
fn expiry_from_now(ttl: Duration) -> DateTime<Utc> {
    let now = Utc::now();
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_is_leaf() {
        let node = Node::new(7, "seven".to_string(), Bytes::from("v"), Duration::from_secs(60));

        assert_eq!(node.key(), 7);
        assert_eq!(node.height(), 0);
        assert!(node.left.is_none());
        assert!(node.right.is_none());
        assert_eq!(node.balance_factor(), 0);
    }

    #[test]
    fn test_expiry_is_in_the_future() {
        let before = Utc::now();
        let node = Node::new(1, "k".to_string(), Bytes::new(), Duration::from_secs(600));

        assert!(node.expires_at > before);
        assert!(!node.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let node = Node::new(1, "k".to_string(), Bytes::new(), Duration::ZERO);

        // Expired exactly at the expiry instant
        assert!(node.is_expired_at(node.expires_at));
        assert!(!node.is_expired_at(node.expires_at - chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let node = Node::new(1, "k".to_string(), Bytes::new(), Duration::MAX);
        assert_eq!(node.expires_at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_overwrite_keeps_key_and_children() {
        let mut node = Node::new(5, "a".to_string(), Bytes::from("old"), Duration::ZERO);
        node.left = Some(Box::new(Node::new(2, "b".to_string(), Bytes::new(), Duration::ZERO)));
        node.update_height();

        node.overwrite(Node::new(5, "c".to_string(), Bytes::from("new"), Duration::from_secs(60)));

        assert_eq!(node.key(), 5);
        assert_eq!(node.id, "c");
        assert_eq!(node.value, Bytes::from("new"));
        assert!(node.left.is_some());
        assert_eq!(node.height(), 1);
        assert!(!node.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_absent_height_sentinel() {
        assert_eq!(height(&None), -1);
    }
}
