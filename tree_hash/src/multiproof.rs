//! Generalized-index arithmetic and Merkle multiproof verification.
//!
//! A node's generalized index (gindex) is `1` for the root and `2g` / `2g + 1`
//! for the left and right children of the node at `g`. The witness set for a
//! group of leaves is every sibling along their paths to the root, minus the
//! leaves themselves and minus any node the verifier can compute from them.

use crate::{hash32_concat, Hash256};
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

/// Returned when a multiproof cannot be verified.
#[derive(Debug, PartialEq, Clone)]
pub enum MultiproofError {
    /// No leaf indices were supplied.
    IndicesEmpty,
    /// The number of leaves does not match the number of indices.
    LeafCountMismatch { leaves: usize, indices: usize },
    /// A node required to reconstruct the root is neither a leaf, a witness,
    /// nor computable from them.
    MissingWitness { gindex: usize },
    /// The reconstructed root does not equal the claimed root.
    RootMismatch,
}

/// Returns the gindex of the parent of `gindex`.
pub fn parent_gindex(gindex: usize) -> usize {
    gindex >> 1
}

/// Returns the gindex of the sibling of `gindex`.
pub fn sibling_gindex(gindex: usize) -> usize {
    gindex ^ 1
}

/// Returns the depth of `gindex` below the root.
pub fn gindex_depth(gindex: usize) -> usize {
    (usize::BITS - 1 - gindex.leading_zeros()) as usize
}

/// Computes the witness gindices a verifier needs alongside `leaf_indices`,
/// in descending order.
///
/// The set is every sibling on the paths from the leaves to the root, with
/// the leaves themselves and all computable ancestors removed.
pub fn required_witness_gindices(leaf_indices: &[usize]) -> Vec<usize> {
    let mut required = BTreeSet::new();
    let mut computed = BTreeSet::new();
    let leaves: BTreeSet<usize> = leaf_indices.iter().copied().collect();

    for &leaf in leaf_indices {
        let mut cursor = leaf;
        while cursor > 1 {
            required.insert(sibling_gindex(cursor));
            computed.insert(parent_gindex(cursor));
            cursor = parent_gindex(cursor);
        }
    }

    required
        .into_iter()
        .filter(|g| !leaves.contains(g) && !computed.contains(g))
        .rev()
        .collect()
}

/// Verifies a multiproof against `root`.
///
/// `witnesses` must contain exactly the hashes of
/// `required_witness_gindices(indices)`, in that order. Returns `Ok(true)`
/// when the reconstructed root equals `root`, `Ok(false)` when reconstruction
/// succeeds but the roots differ.
pub fn verify_multiproof(
    root: Hash256,
    witnesses: &[Hash256],
    leaves: &[Hash256],
    indices: &[usize],
) -> Result<bool, MultiproofError> {
    if indices.is_empty() {
        return Err(MultiproofError::IndicesEmpty);
    }
    if leaves.len() != indices.len() {
        return Err(MultiproofError::LeafCountMismatch {
            leaves: leaves.len(),
            indices: indices.len(),
        });
    }

    let required = required_witness_gindices(indices);
    if required.len() != witnesses.len() {
        return Err(MultiproofError::MissingWitness {
            gindex: required
                .get(witnesses.len())
                .copied()
                .unwrap_or_default(),
        });
    }

    let mut db: BTreeMap<usize, Hash256> = BTreeMap::new();
    let mut pending: BinaryHeap<usize> = BinaryHeap::new();

    for (&gindex, &leaf) in indices.iter().zip(leaves) {
        db.insert(gindex, leaf);
        pending.push(gindex);
    }
    for (&gindex, &witness) in required.iter().zip(witnesses) {
        db.insert(gindex, witness);
        pending.push(gindex);
    }

    // Reconstruct parents deepest-first until the root is known.
    while let Some(gindex) = pending.pop() {
        if gindex == 1 {
            break;
        }
        let parent = parent_gindex(gindex);
        if db.contains_key(&parent) {
            continue;
        }
        let left = *db
            .get(&(gindex & !1))
            .ok_or(MultiproofError::MissingWitness { gindex: gindex & !1 })?;
        let right = *db
            .get(&(gindex | 1))
            .ok_or(MultiproofError::MissingWitness { gindex: gindex | 1 })?;
        db.insert(parent, Hash256::from_slice(&hash32_concat(left.as_bytes(), right.as_bytes())));
        pending.push(parent);
    }

    let computed = db
        .get(&1)
        .ok_or(MultiproofError::MissingWitness { gindex: 1 })?;
    Ok(*computed == root)
}
