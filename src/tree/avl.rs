//! AVL Engine Module
//!
//! Height-balanced binary search tree ordered by the hashed key. Every
//! mutating operation restores the balance invariant before it returns.

use std::cmp::Ordering;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::tree::node::{height, Link, Node};

// == AVL Tree ==
/// Owning handle to the root of the tree.
#[derive(Debug, Default)]
pub struct AvlTree {
    root: Link,
    len: usize,
}

impl AvlTree {
    // == Constructor ==
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    // == Insert ==
    /// Stores `value` under `key`, expiring `ttl` from now.
    ///
    /// If a node with the same ordering key is already present its payload
    /// and expiry are replaced in place, whatever its `id` was.
    ///
    /// # Returns
    /// `true` if a new node was created, `false` if an existing one was
    /// overwritten.
    pub fn insert(&mut self, key: u64, id: String, value: Bytes, ttl: Duration) -> bool {
        let fresh = Box::new(Node::new(key, id, value, ttl));
        let mut created = false;
        self.root = Some(insert(self.root.take(), fresh, &mut created));
        if created {
            self.len += 1;
        }
        created
    }

    // == Delete ==
    /// Removes the node stored under `key`, returning it detached from the
    /// tree. Absent keys are a no-op.
    pub fn delete(&mut self, key: u64) -> Option<Box<Node>> {
        let mut removed = None;
        self.root = delete(self.root.take(), key, &mut removed);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Returns true if a node is stored under `key`.
    pub fn exists(&self, key: u64) -> bool {
        self.lookup(key).is_some()
    }

    // == Lookup ==
    /// Finds the node stored under `key`.
    pub fn lookup(&self, key: u64) -> Option<&Node> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            match key.cmp(&node.key) {
                Ordering::Equal => return Some(node),
                Ordering::Less => current = node.left.as_deref(),
                Ordering::Greater => current = node.right.as_deref(),
            }
        }
        None
    }

    // == Min / Max ==
    /// Smallest ordering key, or `u64::MAX` if the tree is empty.
    pub fn min(&self) -> u64 {
        let mut current = match self.root.as_deref() {
            Some(node) => node,
            None => return u64::MAX,
        };
        while let Some(left) = current.left.as_deref() {
            current = left;
        }
        current.key
    }

    /// Largest ordering key, or `0` if the tree is empty.
    pub fn max(&self) -> u64 {
        let mut current = match self.root.as_deref() {
            Some(node) => node,
            None => return 0,
        };
        while let Some(right) = current.right.as_deref() {
            current = right;
        }
        current.key
    }

    // == Is Balanced ==
    /// Returns true if every node's subtrees differ in height by at most one.
    ///
    /// Heights are measured, not read from the cache.
    pub fn is_balanced(&self) -> bool {
        measured_height(&self.root).is_some()
    }

    /// Number of nodes in the tree, expired or not.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the tree holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The root node, if any.
    pub fn root(&self) -> Option<&Node> {
        self.root.as_deref()
    }

    // == In-Order Traversal ==
    /// Visits every node in ascending key order.
    pub fn in_order<F>(&self, mut visit: F)
    where
        F: FnMut(&Node),
    {
        in_order(&self.root, &mut visit);
    }

    // == Remove Expired ==
    /// Deletes every node that has expired as of `now`.
    ///
    /// Expired keys are gathered in order first, then each one is deleted
    /// starting from the current root, so rotations caused by earlier
    /// deletions are respected.
    ///
    /// Returns the number of nodes removed.
    pub fn remove_expired(&mut self, now: DateTime<Utc>) -> usize {
        let mut expired = Vec::new();
        self.in_order(|node| {
            if node.is_expired_at(now) {
                expired.push(node.key);
            }
        });

        expired
            .into_iter()
            .filter(|key| self.delete(*key).is_some())
            .count()
    }

    /// Checks ordering, cached heights, balance and the node count.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> std::result::Result<(), String> {
        fn walk(
            link: &Link,
            lo: Option<u64>,
            hi: Option<u64>,
            count: &mut usize,
        ) -> std::result::Result<i32, String> {
            let Some(node) = link else {
                return Ok(-1);
            };
            *count += 1;
            if lo.is_some_and(|lo| node.key <= lo) || hi.is_some_and(|hi| node.key >= hi) {
                return Err(format!("key {} out of order", node.key));
            }
            let l = walk(&node.left, lo, Some(node.key), count)?;
            let r = walk(&node.right, Some(node.key), hi, count)?;
            if (l - r).abs() > 1 {
                return Err(format!("node {} unbalanced ({l} vs {r})", node.key));
            }
            let h = 1 + l.max(r);
            if h != node.height {
                return Err(format!("node {} caches height {} but is {h}", node.key, node.height));
            }
            Ok(h)
        }

        let mut count = 0;
        walk(&self.root, None, None, &mut count)?;
        if count != self.len {
            return Err(format!("len is {} but tree holds {count}", self.len));
        }
        Ok(())
    }
}

fn insert(link: Link, fresh: Box<Node>, created: &mut bool) -> Box<Node> {
    let mut node = match link {
        Some(node) => node,
        None => {
            *created = true;
            return fresh;
        }
    };

    match fresh.key.cmp(&node.key) {
        Ordering::Equal => {
            node.overwrite(*fresh);
            return node;
        }
        Ordering::Less => node.left = Some(insert(node.left.take(), fresh, created)),
        Ordering::Greater => node.right = Some(insert(node.right.take(), fresh, created)),
    }

    node.update_height();
    rebalance(node)
}

fn delete(link: Link, key: u64, removed: &mut Link) -> Link {
    let mut node = link?;

    match key.cmp(&node.key) {
        Ordering::Less => node.left = delete(node.left.take(), key, removed),
        Ordering::Greater => node.right = delete(node.right.take(), key, removed),
        Ordering::Equal => {
            let (left, right) = (node.left.take(), node.right.take());
            *removed = Some(node);
            return match (left, right) {
                (None, child) | (child, None) => child,
                (Some(left), Some(right)) => {
                    // The in-order successor takes the removed node's place
                    let (rest, mut successor) = remove_min(right);
                    successor.left = Some(left);
                    successor.right = rest;
                    successor.update_height();
                    Some(rebalance(successor))
                }
            };
        }
    }

    node.update_height();
    Some(rebalance(node))
}

/// Detaches the leftmost node of `node`'s subtree.
///
/// Returns the remaining subtree and the detached node, whose children are
/// both empty.
fn remove_min(mut node: Box<Node>) -> (Link, Box<Node>) {
    match node.left.take() {
        None => {
            let rest = node.right.take();
            (rest, node)
        }
        Some(left) => {
            let (rest, min) = remove_min(left);
            node.left = rest;
            node.update_height();
            (Some(rebalance(node)), min)
        }
    }
}

// == Rebalance ==
/// Restores the balance invariant at `node`, whose cached height must
/// already be current.
fn rebalance(mut node: Box<Node>) -> Box<Node> {
    let balance = node.balance_factor();

    if balance > 1 {
        // Left-right case
        if let Some(left) = node.left.take() {
            node.left = Some(if left.balance_factor() >= 0 {
                left
            } else {
                rotate_left(left)
            });
        }
        rotate_right(node)
    } else if balance < -1 {
        // Right-left case
        if let Some(right) = node.right.take() {
            node.right = Some(if right.balance_factor() <= 0 {
                right
            } else {
                rotate_right(right)
            });
        }
        rotate_left(node)
    } else {
        node
    }
}

fn rotate_right(mut node: Box<Node>) -> Box<Node> {
    let Some(mut pivot) = node.left.take() else {
        return node;
    };
    node.left = pivot.right.take();
    node.update_height();
    pivot.right = Some(node);
    pivot.update_height();
    pivot
}

fn rotate_left(mut node: Box<Node>) -> Box<Node> {
    let Some(mut pivot) = node.right.take() else {
        return node;
    };
    node.right = pivot.left.take();
    node.update_height();
    pivot.left = Some(node);
    pivot.update_height();
    pivot
}

/// Real height of the subtree, or `None` if any node in it is unbalanced.
fn measured_height(link: &Link) -> Option<i32> {
    match link {
        None => Some(-1),
        Some(node) => {
            let left = measured_height(&node.left)?;
            let right = measured_height(&node.right)?;
            if (left - right).abs() > 1 {
                None
            } else {
                Some(1 + left.max(right))
            }
        }
    }
}

fn in_order<F>(link: &Link, visit: &mut F)
where
    F: FnMut(&Node),
{
    if let Some(node) = link {
        in_order(&node.left, visit);
        visit(node);
        in_order(&node.right, visit);
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn tree_with(keys: &[u64]) -> AvlTree {
        let mut tree = AvlTree::new();
        for key in keys {
            tree.insert(*key, format!("id-{key}"), Bytes::from(format!("v{key}")), HOUR);
        }
        tree
    }

    fn keys_in_order(tree: &AvlTree) -> Vec<u64> {
        let mut keys = Vec::new();
        tree.in_order(|node| keys.push(node.key()));
        keys
    }

    #[test]
    fn test_empty_tree() {
        let tree = AvlTree::new();

        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert!(tree.is_balanced());
        assert!(!tree.exists(1));
        assert!(tree.lookup(1).is_none());
        assert_eq!(tree.min(), u64::MAX);
        assert_eq!(tree.max(), 0);
    }

    #[test]
    fn test_insert_and_lookup() {
        let tree = tree_with(&[50, 20, 80]);

        let node = tree.lookup(20).unwrap();
        assert_eq!(node.id, "id-20");
        assert_eq!(node.value, Bytes::from("v20"));
        assert!(tree.exists(80));
        assert!(!tree.exists(81));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_right_rotation_on_ascending_left_chain() {
        let tree = tree_with(&[30, 20, 10]);

        let root = tree.root().unwrap();
        assert_eq!(root.key(), 20);
        assert_eq!(root.height(), 1);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_left_rotation_on_ascending_right_chain() {
        let tree = tree_with(&[10, 20, 30]);

        assert_eq!(tree.root().unwrap().key(), 20);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_left_right_rotation() {
        let tree = tree_with(&[30, 10, 20]);

        assert_eq!(tree.root().unwrap().key(), 20);
        assert_eq!(keys_in_order(&tree), vec![10, 20, 30]);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_right_left_rotation() {
        let tree = tree_with(&[10, 30, 20]);

        assert_eq!(tree.root().unwrap().key(), 20);
        assert_eq!(keys_in_order(&tree), vec![10, 20, 30]);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_sequential_inserts_stay_logarithmic() {
        let keys: Vec<u64> = (0..1024).collect();
        let tree = tree_with(&keys);

        assert!(tree.is_balanced());
        // An AVL tree of 1024 nodes is at most ~1.44 log2(n) high
        assert!(tree.root().unwrap().height() <= 14);
        assert_eq!(tree.min(), 0);
        assert_eq!(tree.max(), 1023);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_overwrite_same_key_keeps_subtree() {
        let mut tree = tree_with(&[50, 20, 80, 10, 30]);

        let created = tree.insert(20, "other".to_string(), Bytes::from("new"), HOUR);

        assert!(!created);
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.lookup(20).unwrap().value, Bytes::from("new"));
        assert_eq!(tree.lookup(20).unwrap().id, "other");
        assert!(tree.exists(10));
        assert!(tree.exists(30));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_delete_leaf() {
        let mut tree = tree_with(&[50, 20, 80]);

        let removed = tree.delete(80).unwrap();

        assert_eq!(removed.key(), 80);
        assert!(!tree.exists(80));
        assert_eq!(tree.len(), 2);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_delete_node_with_one_child() {
        let mut tree = tree_with(&[50, 20, 80, 90]);

        tree.delete(80).unwrap();

        assert_eq!(keys_in_order(&tree), vec![20, 50, 90]);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_delete_node_with_two_children_moves_successor_payload() {
        let mut tree = tree_with(&[50, 20, 80, 70, 90]);

        let removed = tree.delete(50).unwrap();

        assert_eq!(removed.id, "id-50");
        assert_eq!(tree.root().unwrap().key(), 70);
        let successor = tree.lookup(70).unwrap();
        assert_eq!(successor.id, "id-70");
        assert_eq!(successor.value, Bytes::from("v70"));
        assert_eq!(keys_in_order(&tree), vec![20, 70, 80, 90]);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_delete_absent_key_is_noop() {
        let mut tree = tree_with(&[50, 20, 80]);

        assert!(tree.delete(51).is_none());
        assert_eq!(tree.len(), 3);

        let mut empty = AvlTree::new();
        assert!(empty.delete(1).is_none());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_delete_rebalances() {
        let mut tree = tree_with(&[50, 20, 80, 10, 30, 90, 5]);

        tree.delete(90).unwrap();
        tree.delete(80).unwrap();

        assert!(tree.is_balanced());
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_delete_everything() {
        let keys: Vec<u64> = (0..200).map(|i| i * 7919 % 1000).collect();
        let mut tree = tree_with(&keys);

        for key in &keys {
            tree.delete(*key);
            tree.check_invariants().unwrap();
        }

        assert!(tree.is_empty());
        assert_eq!(tree.min(), u64::MAX);
        assert_eq!(tree.max(), 0);
    }

    #[test]
    fn test_remove_expired() {
        let mut tree = AvlTree::new();
        for key in 0..20u64 {
            let ttl = if key % 2 == 0 { Duration::ZERO } else { HOUR };
            tree.insert(key, key.to_string(), Bytes::new(), ttl);
        }

        let removed = tree.remove_expired(Utc::now());

        assert_eq!(removed, 10);
        assert_eq!(tree.len(), 10);
        assert_eq!(keys_in_order(&tree), (0..20).filter(|k| k % 2 == 1).collect::<Vec<_>>());
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_remove_expired_keeps_live_entries() {
        let mut tree = tree_with(&[1, 2, 3]);

        assert_eq!(tree.remove_expired(Utc::now()), 0);
        assert_eq!(tree.len(), 3);
    }
}
