//! Merkle proof trees over typed values.
//!
//! `proof_tree` materializes the same tree `hash_tree_root` folds up,
//! addressable by generalized index: the root is gindex 1, and node `g` has
//! children `2g` and `2g + 1`. Subtrees that exist only as zero padding are
//! represented by virtual zero nodes, so trees stay proportional to the
//! value rather than the declared limit.

use crate::encode::EncodeError;
use crate::hash::{basic_size, bitlist_content, chunk_count, pack_basic};
use crate::schema::Type;
use crate::value::Value;
use tree_hash::{
    get_zero_hash, gindex_depth, hash32_concat, mix_in_length, mix_in_selector,
    next_power_of_two, required_witness_gindices, verify_multiproof, Hash256, MultiproofError,
    BYTES_PER_CHUNK,
};

use std::sync::Arc;

/// A node of a materialized Merkle tree.
#[derive(Debug, Clone)]
pub enum ProofNode {
    /// A 32-byte chunk with nothing below it.
    Leaf(Hash256),
    /// An interior node.
    Branch {
        hash: Hash256,
        left: Arc<ProofNode>,
        right: Arc<ProofNode>,
    },
    /// A perfect all-zero subtree of the given height.
    Zero { depth: usize },
}

impl ProofNode {
    /// The hash of this node.
    pub fn hash(&self) -> Hash256 {
        match self {
            ProofNode::Leaf(hash) => *hash,
            ProofNode::Branch { hash, .. } => *hash,
            ProofNode::Zero { depth } => Hash256::from_slice(get_zero_hash(*depth)),
        }
    }
}

/// A Merkle tree rooted at gindex 1.
#[derive(Debug, Clone)]
pub struct ProofTree {
    root: Arc<ProofNode>,
}

/// A multiproof for a set of leaves, as produced by [`ProofTree::prove_multi`].
#[derive(Debug, Clone, PartialEq)]
pub struct Multiproof {
    pub indices: Vec<usize>,
    pub leaves: Vec<Hash256>,
    pub witnesses: Vec<Hash256>,
}

impl Multiproof {
    /// Verifies this proof against `root`.
    pub fn verify(&self, root: Hash256) -> Result<bool, MultiproofError> {
        verify_multiproof(root, &self.witnesses, &self.leaves, &self.indices)
    }
}

impl ProofTree {
    /// The root hash, i.e. the hash tree root of the underlying value.
    pub fn root(&self) -> Hash256 {
        self.root.hash()
    }

    /// Returns the hash at `gindex`, or `None` if the tree has no node there.
    pub fn get(&self, gindex: usize) -> Option<Hash256> {
        if gindex == 0 {
            return None;
        }
        let depth = gindex_depth(gindex);
        let mut node: &ProofNode = &self.root;
        for level in (0..depth).rev() {
            let go_right = (gindex >> level) & 1 == 1;
            node = match node {
                ProofNode::Branch { left, right, .. } => {
                    if go_right {
                        right.as_ref()
                    } else {
                        left.as_ref()
                    }
                }
                ProofNode::Zero { depth: d } => {
                    // Every descendant of a zero subtree is itself zero.
                    let remaining = level + 1;
                    return if *d >= remaining {
                        Some(Hash256::from_slice(get_zero_hash(d - remaining)))
                    } else {
                        None
                    };
                }
                ProofNode::Leaf(_) => return None,
            };
        }
        Some(node.hash())
    }

    /// Builds a multiproof for `indices`.
    pub fn prove_multi(&self, indices: &[usize]) -> Result<Multiproof, MultiproofError> {
        if indices.is_empty() {
            return Err(MultiproofError::IndicesEmpty);
        }
        let leaves = indices
            .iter()
            .map(|&g| self.get(g).ok_or(MultiproofError::MissingWitness { gindex: g }))
            .collect::<Result<Vec<_>, _>>()?;
        let witnesses = required_witness_gindices(indices)
            .into_iter()
            .map(|g| self.get(g).ok_or(MultiproofError::MissingWitness { gindex: g }))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Multiproof {
            indices: indices.to_vec(),
            leaves,
            witnesses,
        })
    }
}

/// Picks up to `max` provable gindices below the root, preferring shallow
/// nodes; falls back to the root itself for single-chunk trees.
pub fn select_proof_gindices(tree: &ProofTree, max: usize) -> Vec<usize> {
    let mut indices = Vec::with_capacity(max);
    for gindex in 2..64 {
        if indices.len() >= max {
            break;
        }
        if tree.get(gindex).is_some() {
            indices.push(gindex);
        }
    }
    if indices.is_empty() {
        indices.push(1);
    }
    indices
}

/// Materializes the Merkle tree of `value` against `ty`.
pub fn proof_tree(value: &Value, ty: &Type) -> Result<ProofTree, EncodeError> {
    Ok(ProofTree {
        root: build(value, ty)?,
    })
}

fn build(value: &Value, ty: &Type) -> Result<Arc<ProofNode>, EncodeError> {
    match (value, ty) {
        (Value::Null, _) => build(&Value::zero(ty), ty),
        (Value::Uint8(_), _)
        | (Value::Uint16(_), _)
        | (Value::Uint32(_), _)
        | (Value::Uint64(_), _)
        | (Value::Bool(_), _) => {
            let encoded = crate::encode::encode(value, ty)?;
            Ok(chunk_subtree(&to_chunks(&encoded), 0))
        }
        (Value::Bitvector(bytes), Type::Bitvector { bits }) => {
            let expected = (bits + 7) / 8;
            if bytes.len() != expected {
                return Err(EncodeError::VectorLengthMismatch {
                    len: bytes.len(),
                    expected,
                });
            }
            Ok(chunk_tree(bytes, chunk_count(expected)))
        }
        (Value::Bitlist(bytes), Type::Bitlist { max_bits }) => {
            let (content, bits) = bitlist_content(bytes).ok_or(EncodeError::BitlistEmpty)?;
            if bits > *max_bits {
                return Err(EncodeError::BitlistOverflow {
                    bits,
                    max: *max_bits,
                });
            }
            let content_tree = chunk_tree(&content, chunk_count((max_bits + 7) / 8));
            Ok(mix_length(content_tree, bits))
        }
        (Value::Vector(items), Type::Vector { elem, len }) => {
            if items.len() != *len {
                return Err(EncodeError::VectorLengthMismatch {
                    len: items.len(),
                    expected: *len,
                });
            }
            if let Some(size) = basic_size(elem) {
                let packed = pack_basic(items, elem)?;
                Ok(chunk_tree(&packed, chunk_count(len * size)))
            } else {
                let children = items
                    .iter()
                    .map(|item| build(item, elem))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(node_tree(&children, *len))
            }
        }
        (Value::List(items), Type::List { elem, max }) => {
            if items.len() > *max {
                return Err(EncodeError::LengthExceedsMax {
                    len: items.len(),
                    max: *max,
                });
            }
            let content = if let Some(size) = basic_size(elem) {
                let packed = pack_basic(items, elem)?;
                chunk_tree(&packed, chunk_count(max * size))
            } else {
                let children = items
                    .iter()
                    .map(|item| build(item, elem))
                    .collect::<Result<Vec<_>, _>>()?;
                node_tree(&children, *max)
            };
            Ok(mix_length(content, items.len()))
        }
        (Value::Container(values), Type::Container { fields, .. }) => {
            if values.len() != fields.len() {
                return Err(EncodeError::TypeMismatch);
            }
            let children = values
                .iter()
                .zip(fields)
                .map(|(value, field)| build(value, &field.ty))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(node_tree(&children, fields.len()))
        }
        (Value::Union { selector, value }, Type::Union { variants }) => {
            let variant = variants
                .get(*selector as usize)
                .ok_or(EncodeError::UnionInvalidSelector(*selector))?;
            let content = match (variant, value) {
                (None, None) => Arc::new(ProofNode::Zero { depth: 0 }),
                (Some(ty), Some(value)) => build(value, ty)?,
                _ => return Err(EncodeError::UnionInvalidSelector(*selector)),
            };
            let hash = mix_in_selector(&content.hash(), *selector)
                .ok_or(EncodeError::UnionInvalidSelector(*selector))?;
            let mut selector_chunk = [0; BYTES_PER_CHUNK];
            selector_chunk[0] = *selector;
            Ok(Arc::new(ProofNode::Branch {
                hash,
                left: content,
                right: Arc::new(ProofNode::Leaf(Hash256::from_slice(&selector_chunk))),
            }))
        }
        _ => Err(EncodeError::TypeMismatch),
    }
}

fn to_chunks(bytes: &[u8]) -> Vec<Hash256> {
    bytes
        .chunks(BYTES_PER_CHUNK)
        .map(|chunk| {
            let mut padded = [0; BYTES_PER_CHUNK];
            padded[..chunk.len()].copy_from_slice(chunk);
            Hash256::from_slice(&padded)
        })
        .collect()
}

fn chunk_tree(bytes: &[u8], limit: usize) -> Arc<ProofNode> {
    let chunks = to_chunks(bytes);
    let height = tree_height(limit);
    leaf_subtree(&chunks, height, &|chunk| {
        Arc::new(ProofNode::Leaf(*chunk))
    })
}

fn node_tree(children: &[Arc<ProofNode>], limit: usize) -> Arc<ProofNode> {
    let height = tree_height(limit);
    leaf_subtree(children, height, &|child| Arc::clone(child))
}

fn chunk_subtree(chunks: &[Hash256], height: usize) -> Arc<ProofNode> {
    leaf_subtree(chunks, height, &|chunk| Arc::new(ProofNode::Leaf(*chunk)))
}

fn tree_height(limit: usize) -> usize {
    next_power_of_two(std::cmp::max(limit, 1)).trailing_zeros() as usize
}

/// Builds a perfect subtree of the given height over `leaves`, padding the
/// right-hand side with virtual zero subtrees.
fn leaf_subtree<T>(
    leaves: &[T],
    depth: usize,
    make_leaf: &dyn Fn(&T) -> Arc<ProofNode>,
) -> Arc<ProofNode> {
    if leaves.is_empty() {
        return Arc::new(ProofNode::Zero { depth });
    }
    if depth == 0 {
        return make_leaf(&leaves[0]);
    }
    let half = 1 << (depth - 1);
    let (left_leaves, right_leaves) = leaves.split_at(std::cmp::min(half, leaves.len()));
    let left = leaf_subtree(left_leaves, depth - 1, make_leaf);
    let right = leaf_subtree(right_leaves, depth - 1, make_leaf);
    let hash = Hash256::from_slice(&hash32_concat(
        left.hash().as_bytes(),
        right.hash().as_bytes(),
    ));
    Arc::new(ProofNode::Branch { hash, left, right })
}

fn mix_length(content: Arc<ProofNode>, length: usize) -> Arc<ProofNode> {
    let hash = mix_in_length(&content.hash(), length);
    let mut length_chunk = [0; BYTES_PER_CHUNK];
    length_chunk[..std::mem::size_of::<usize>()].copy_from_slice(&length.to_le_bytes());
    Arc::new(ProofNode::Branch {
        hash,
        left: content,
        right: Arc::new(ProofNode::Leaf(Hash256::from_slice(&length_chunk))),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hash::hash_tree_root;
    use crate::schema::Field;

    fn sample_schemas() -> Vec<(Arc<Type>, Value)> {
        let checkpoint = Type::container(
            "Checkpoint",
            vec![
                Field::new("epoch", Type::uint64()),
                Field::new("root", Type::root()),
            ],
        );
        vec![
            (Type::uint64(), Value::Uint64(7)),
            (
                Type::bitvector(4),
                Value::Bitvector(vec![0x05]),
            ),
            (
                Type::bitlist(2048),
                Value::Bitlist(vec![0xAA, 0x01]),
            ),
            (
                Type::list(Type::uint64(), 8),
                Value::List(vec![Value::Uint64(1), Value::Uint64(2), Value::Uint64(3)]),
            ),
            (
                checkpoint.clone(),
                Value::Container(vec![
                    Value::Uint64(3),
                    crate::value::bytes_value(&[7; 32]),
                ]),
            ),
            (
                Type::list(checkpoint, 4),
                Value::List(vec![Value::Container(vec![
                    Value::Uint64(1),
                    crate::value::bytes_value(&[2; 32]),
                ])]),
            ),
            (
                Type::union(vec![None, Some(Type::uint64())]),
                Value::Union {
                    selector: 1,
                    value: Some(Box::new(Value::Uint64(11))),
                },
            ),
        ]
    }

    #[test]
    fn tree_root_matches_hash_tree_root() {
        for (ty, value) in sample_schemas() {
            let tree = proof_tree(&value, &ty).unwrap();
            assert_eq!(
                tree.root(),
                hash_tree_root(&value, &ty).unwrap(),
                "schema {}",
                ty.describe()
            );
        }
    }

    #[test]
    fn children_recombine_to_parent() {
        for (ty, value) in sample_schemas() {
            let tree = proof_tree(&value, &ty).unwrap();
            if let (Some(left), Some(right)) = (tree.get(2), tree.get(3)) {
                assert_eq!(
                    tree.root().as_bytes(),
                    &hash32_concat(left.as_bytes(), right.as_bytes())[..],
                    "schema {}",
                    ty.describe()
                );
            }
        }
    }

    #[test]
    fn multiproofs_verify_against_the_root() {
        for (ty, value) in sample_schemas() {
            let tree = proof_tree(&value, &ty).unwrap();
            let indices = select_proof_gindices(&tree, 2);
            let proof = tree.prove_multi(&indices).unwrap();
            assert_eq!(proof.verify(tree.root()), Ok(true), "schema {}", ty.describe());
        }
    }

    #[test]
    fn flipped_witness_bit_fails_verification() {
        let ty = Type::list(Type::uint64(), 8);
        let value = Value::List(vec![Value::Uint64(1), Value::Uint64(2)]);
        let tree = proof_tree(&value, &ty).unwrap();

        // Gindex 4 is the first content chunk; proving it alone forces its
        // sibling and the length chunk into the witness set.
        let mut proof = tree.prove_multi(&[4]).unwrap();
        assert_eq!(proof.witnesses.len(), 2);
        assert_eq!(proof.verify(tree.root()), Ok(true));

        for i in 0..proof.witnesses.len() {
            proof.witnesses[i].as_bytes_mut()[0] ^= 1;
            assert_eq!(proof.verify(tree.root()), Ok(false));
            proof.witnesses[i].as_bytes_mut()[0] ^= 1;
        }
        for i in 0..proof.leaves.len() {
            proof.leaves[i].as_bytes_mut()[0] ^= 1;
            assert_eq!(proof.verify(tree.root()), Ok(false));
            proof.leaves[i].as_bytes_mut()[0] ^= 1;
        }
        assert_eq!(proof.verify(tree.root()), Ok(true));
    }

    #[test]
    fn zero_subtree_nodes_are_addressable() {
        // A list with fewer elements than its limit pads with zero subtrees;
        // their gindices must still resolve for proofs over sparse content.
        let ty = Type::list(Type::uint64(), 8);
        let value = Value::List(vec![Value::Uint64(1)]);
        let tree = proof_tree(&value, &ty).unwrap();

        // Content root (gindex 2) and length chunk (gindex 3).
        let content = tree.get(2).unwrap();
        let length = tree.get(3).unwrap();
        assert_eq!(
            tree.root().as_bytes(),
            &hash32_concat(content.as_bytes(), length.as_bytes())[..]
        );

        // The right half of the content subtree holds no chunks but still
        // has a hash.
        assert!(tree.get(5).is_some());
    }
}
