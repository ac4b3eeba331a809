//! Tree Module
//!
//! The AVL engine that backs the store, its node type and the key hasher.

mod avl;
mod hasher;
mod node;


// Re-export public types
pub use avl::AvlTree;
pub use hasher::{fnv1a_64, Fnv1a, KeyHasher};
pub use node::Node;
