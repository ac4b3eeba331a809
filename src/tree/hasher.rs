//! Key Hasher Module
//!
//! Maps caller identifiers to the fixed-width ordering keys used by the tree.

use crate::error::Result;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

// == Key Hasher ==
/// Turns an identifier into the ordering key the tree sorts by.
///
/// Implementations must be deterministic for the lifetime of a process.
/// Two identifiers that map to the same key share one slot in the tree.
pub trait KeyHasher: Send + Sync + 'static {
    /// Hashes `key` into an ordering key.
    fn hash_key(&self, key: &str) -> Result<u64>;
}

/// 64-bit FNV-1a, the default key hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fnv1a;

impl KeyHasher for Fnv1a {
    fn hash_key(&self, key: &str) -> Result<u64> {
        Ok(fnv1a_64(key))
    }
}

/// Computes the 64-bit FNV-1a hash of `s`.
pub fn fnv1a_64(s: &str) -> u64 {
    s.bytes()
        .fold(FNV_OFFSET, |h, b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}
