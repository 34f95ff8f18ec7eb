//! Merkle tree hashing primitives for SSZ values.
//!
//! Provides the chunk-level operations the reference codec builds
//! `hash_tree_root` from: SHA-256 helpers, zero-subtree caching, padded
//! merkleization with a leaf limit, the length / selector mix-ins used by
//! variable-length collections and unions, and multiproof verification over
//! generalized indices.

mod hashing;
mod merkleize;
mod multiproof;

pub use hashing::{hash32_concat, hash_fixed, ZERO_HASHES, ZERO_HASHES_MAX_INDEX};
pub use merkleize::{merkleize_padded, next_power_of_two};
pub use multiproof::{
    gindex_depth, parent_gindex, required_witness_gindices, sibling_gindex, verify_multiproof,
    MultiproofError,
};

pub const BYTES_PER_CHUNK: usize = 32;
pub const HASHSIZE: usize = 32;
/// The highest possible union selector value (higher values are reserved for
/// backwards compatible extensions).
pub const MAX_UNION_SELECTOR: u8 = 127;

pub type Hash256 = ethereum_types::H256;

/// Returns the node created by hashing `root` and `length`.
///
/// Used for inserting the length of a list above its content root.
pub fn mix_in_length(root: &Hash256, length: usize) -> Hash256 {
    let usize_len = std::mem::size_of::<usize>();

    let mut length_bytes = [0; BYTES_PER_CHUNK];
    length_bytes[0..usize_len].copy_from_slice(&length.to_le_bytes());

    Hash256::from_slice(&hash32_concat(root.as_bytes(), &length_bytes))
}

/// Returns `Some(root)` created by hashing `root` and `selector`, if
/// `selector <= MAX_UNION_SELECTOR`. Otherwise, returns `None`.
///
/// Used for the "union" type.
pub fn mix_in_selector(root: &Hash256, selector: u8) -> Option<Hash256> {
    if selector > MAX_UNION_SELECTOR {
        return None;
    }

    let mut chunk = [0; BYTES_PER_CHUNK];
    chunk[0] = selector;

    Some(Hash256::from_slice(&hash32_concat(root.as_bytes(), &chunk)))
}

/// Returns a cached padding node for a given height.
pub fn get_zero_hash(height: usize) -> &'static [u8] {
    if height <= ZERO_HASHES_MAX_INDEX {
        &ZERO_HASHES[height]
    } else {
        panic!("Tree exceeds MAX_TREE_DEPTH of {}", ZERO_HASHES_MAX_INDEX)
    }
}
