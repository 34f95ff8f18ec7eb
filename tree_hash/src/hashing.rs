//! SHA-256 helpers shared by merkleization and proof verification.

use lazy_static::lazy_static;
use sha2::{Digest, Sha256};

/// The maximum tree height for which a zero-subtree hash is pre-computed.
pub const ZERO_HASHES_MAX_INDEX: usize = 48;

lazy_static! {
    /// Cached roots of all-zero subtrees: `ZERO_HASHES[h]` is the root of a
    /// perfect binary tree of height `h` whose leaves are all zero chunks.
    pub static ref ZERO_HASHES: Vec<[u8; 32]> = {
        let mut hashes = vec![[0; 32]; ZERO_HASHES_MAX_INDEX + 1];
        for i in 0..ZERO_HASHES_MAX_INDEX {
            hashes[i + 1] = hash32_concat(&hashes[i], &hashes[i]);
        }
        hashes
    };
}

/// Returns the SHA-256 digest of `bytes`.
pub fn hash_fixed(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Returns `SHA-256(h1 || h2)`.
pub fn hash32_concat(h1: &[u8], h2: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(h1);
    hasher.update(h2);
    hasher.finalize().into()
}
