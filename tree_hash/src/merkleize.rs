//! Merkleization of packed chunk buffers with a fixed leaf limit.

use crate::{get_zero_hash, hash32_concat, Hash256, BYTES_PER_CHUNK};

/// Returns the Merkle root of `bytes`, padded with zero chunks up to the next
/// power of two greater than or equal to `limit`.
///
/// A `limit` of zero is treated as one: the merkleization of no chunks is the
/// zero chunk itself.
///
/// ## Panics
///
/// Panics in debug builds if `bytes` occupies more chunks than `limit`
/// permits. Callers are expected to have enforced their length bounds before
/// merkleizing.
pub fn merkleize_padded(bytes: &[u8], limit: usize) -> Hash256 {
    let chunk_count = (bytes.len() + BYTES_PER_CHUNK - 1) / BYTES_PER_CHUNK;
    let limit = std::cmp::max(limit, 1);
    debug_assert!(chunk_count <= limit, "chunk count exceeds limit");

    let height = next_power_of_two(limit).trailing_zeros() as usize;

    if chunk_count == 0 {
        return Hash256::from_slice(get_zero_hash(height));
    }

    let mut layer: Vec<[u8; 32]> = (0..chunk_count)
        .map(|i| {
            let mut chunk = [0; BYTES_PER_CHUNK];
            let start = i * BYTES_PER_CHUNK;
            let end = std::cmp::min(start + BYTES_PER_CHUNK, bytes.len());
            chunk[..end - start].copy_from_slice(&bytes[start..end]);
            chunk
        })
        .collect();

    for depth in 0..height {
        if layer.len() % 2 == 1 {
            let mut zero = [0; 32];
            zero.copy_from_slice(get_zero_hash(depth));
            layer.push(zero);
        }
        layer = layer
            .chunks(2)
            .map(|pair| hash32_concat(&pair[0], &pair[1]))
            .collect();
    }

    Hash256::from_slice(&layer[0])
}

/// Returns the next power of two greater than or equal to `n` (minimum 1).
pub fn next_power_of_two(n: usize) -> usize {
    if n <= 1 {
        1
    } else {
        n.next_power_of_two()
    }
}
