//! Hash tree roots of typed values.
//!
//! Implements the SSZ Merkleization rules: basic values pack little-endian
//! into 32-byte chunks, collections merkleize under a chunk limit derived
//! from their declared bounds, lists and bitlists mix in their length, unions
//! mix in their selector, and containers merkleize their field roots with a
//! limit equal to the declared field count.

use crate::encode::{bitlist_len, encode, EncodeError};
use crate::schema::Type;
use crate::value::Value;
use tree_hash::{merkleize_padded, mix_in_length, mix_in_selector, Hash256, BYTES_PER_CHUNK};

/// Computes the hash tree root of `value` against `ty`.
///
/// The root is deterministic over canonical values: two values with equal
/// canonical encodings yield equal roots. Non-canonical raw bits (dirty
/// padding) flow into the root unchanged, which is what lets the oracle
/// observe semantic divergence after a lossy round-trip.
pub fn hash_tree_root(value: &Value, ty: &Type) -> Result<Hash256, EncodeError> {
    match (value, ty) {
        (Value::Null, _) => hash_tree_root(&Value::zero(ty), ty),
        (Value::Uint8(_), _)
        | (Value::Uint16(_), _)
        | (Value::Uint32(_), _)
        | (Value::Uint64(_), _)
        | (Value::Bool(_), _) => {
            let encoded = encode(value, ty)?;
            Ok(merkleize_padded(&encoded, 1))
        }
        (Value::Bitvector(bytes), Type::Bitvector { bits }) => {
            let expected = (bits + 7) / 8;
            if bytes.len() != expected {
                return Err(EncodeError::VectorLengthMismatch {
                    len: bytes.len(),
                    expected,
                });
            }
            Ok(merkleize_padded(bytes, chunk_count(expected)))
        }
        (Value::Bitlist(bytes), Type::Bitlist { max_bits }) => {
            let (content, bits) = bitlist_content(bytes).ok_or(EncodeError::BitlistEmpty)?;
            if bits > *max_bits {
                return Err(EncodeError::BitlistOverflow {
                    bits,
                    max: *max_bits,
                });
            }
            let limit = chunk_count((max_bits + 7) / 8);
            let root = merkleize_padded(&content, limit);
            Ok(mix_in_length(&root, bits))
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
                Ok(merkleize_padded(&packed, chunk_count(len * size)))
            } else {
                let roots = composite_roots(items, elem)?;
                Ok(merkleize_padded(&roots, *len))
            }
        }
        (Value::List(items), Type::List { elem, max }) => {
            if items.len() > *max {
                return Err(EncodeError::LengthExceedsMax {
                    len: items.len(),
                    max: *max,
                });
            }
            let root = if let Some(size) = basic_size(elem) {
                let packed = pack_basic(items, elem)?;
                merkleize_padded(&packed, chunk_count(max * size))
            } else {
                let roots = composite_roots(items, elem)?;
                merkleize_padded(&roots, *max)
            };
            Ok(mix_in_length(&root, items.len()))
        }
        (Value::Container(values), Type::Container { fields, .. }) => {
            if values.len() != fields.len() {
                return Err(EncodeError::TypeMismatch);
            }
            let mut roots = Vec::with_capacity(values.len() * BYTES_PER_CHUNK);
            for (value, field) in values.iter().zip(fields) {
                roots.extend_from_slice(hash_tree_root(value, &field.ty)?.as_bytes());
            }
            Ok(merkleize_padded(&roots, fields.len()))
        }
        (Value::Union { selector, value }, Type::Union { variants }) => {
            let variant = variants
                .get(*selector as usize)
                .ok_or(EncodeError::UnionInvalidSelector(*selector))?;
            let root = match (variant, value) {
                (None, None) => Hash256::zero(),
                (Some(ty), Some(value)) => hash_tree_root(value, ty)?,
                _ => return Err(EncodeError::UnionInvalidSelector(*selector)),
            };
            mix_in_selector(&root, *selector)
                .ok_or(EncodeError::UnionInvalidSelector(*selector))
        }
        _ => Err(EncodeError::TypeMismatch),
    }
}

/// The packed byte size of a basic (scalar or boolean) type.
pub(crate) fn basic_size(ty: &Type) -> Option<usize> {
    match ty {
        Type::Uint8 | Type::Bool => Some(1),
        Type::Uint16 => Some(2),
        Type::Uint32 => Some(4),
        Type::Uint64 => Some(8),
        _ => None,
    }
}

/// Serializes a sequence of basic values into one contiguous buffer.
pub(crate) fn pack_basic(items: &[Value], elem: &Type) -> Result<Vec<u8>, EncodeError> {
    let mut packed = Vec::new();
    for item in items {
        let encoded = encode(item, elem)?;
        packed.extend_from_slice(&encoded);
    }
    Ok(packed)
}

/// Hash-tree-roots each element of a composite sequence, concatenated.
pub(crate) fn composite_roots(items: &[Value], elem: &Type) -> Result<Vec<u8>, EncodeError> {
    let mut roots = Vec::with_capacity(items.len() * BYTES_PER_CHUNK);
    for item in items {
        roots.extend_from_slice(hash_tree_root(item, elem)?.as_bytes());
    }
    Ok(roots)
}

/// The number of chunks `byte_len` bytes occupy.
pub(crate) fn chunk_count(byte_len: usize) -> usize {
    (byte_len + BYTES_PER_CHUNK - 1) / BYTES_PER_CHUNK
}

/// Returns a bitlist's content bytes (sentinel removed, truncated to the
/// content width) and its bit-length, or `None` without a sentinel.
pub(crate) fn bitlist_content(bytes: &[u8]) -> Option<(Vec<u8>, usize)> {
    let bits = bitlist_len(bytes)?;
    let mut content = bytes.to_vec();
    let last = content.last_mut()?;
    *last &= !(1u8 << (bits % 8));
    content.truncate((bits + 7) / 8);
    Some((content, bits))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::Field;
    use tree_hash::hash32_concat;

    fn chunk(bytes: &[u8]) -> Hash256 {
        let mut padded = [0; 32];
        padded[..bytes.len()].copy_from_slice(bytes);
        Hash256::from_slice(&padded)
    }

    #[test]
    fn scalar_roots_are_padded_chunks() {
        assert_eq!(
            hash_tree_root(&Value::Uint64(1), &Type::Uint64).unwrap(),
            chunk(&[1])
        );
        assert_eq!(
            hash_tree_root(&Value::Bool(true), &Type::Bool).unwrap(),
            chunk(&[1])
        );
    }

    #[test]
    fn empty_list_mixes_in_zero_length() {
        let ty = Type::list(Type::uint8(), 4);
        let root = hash_tree_root(&Value::List(vec![]), &ty).unwrap();
        assert_eq!(root, mix_in_length(&Hash256::zero(), 0));
    }

    #[test]
    fn container_merkleizes_field_roots() {
        let ty = Type::container(
            "Pair",
            vec![
                Field::new("a", Type::uint64()),
                Field::new("b", Type::uint64()),
            ],
        );
        let value = Value::Container(vec![Value::Uint64(1), Value::Uint64(2)]);
        let expected = Hash256::from_slice(&hash32_concat(
            chunk(&[1]).as_bytes(),
            chunk(&[2]).as_bytes(),
        ));
        assert_eq!(hash_tree_root(&value, &ty).unwrap(), expected);
    }

    #[test]
    fn bitlist_root_strips_sentinel() {
        let ty = Type::Bitlist { max_bits: 8 };
        // Three content bits 0b101, sentinel at bit 3.
        let value = Value::Bitlist(vec![0b1101]);
        let root = hash_tree_root(&value, &ty).unwrap();
        assert_eq!(root, mix_in_length(&chunk(&[0b101]), 3));
    }

    #[test]
    fn empty_bitlist_root() {
        let ty = Type::Bitlist { max_bits: 2048 };
        let value = Value::Bitlist(vec![0x01]);
        let root = hash_tree_root(&value, &ty).unwrap();
        // 2048 bits is 8 chunks; empty content is the height-3 zero hash.
        let zero8 = merkleize_padded(&[], 8);
        assert_eq!(root, mix_in_length(&zero8, 0));
    }

    #[test]
    fn union_mixes_in_selector() {
        let ty = Type::union(vec![None, Some(Type::uint64())]);
        let none = Value::Union {
            selector: 0,
            value: None,
        };
        assert_eq!(
            hash_tree_root(&none, &ty).unwrap(),
            mix_in_selector(&Hash256::zero(), 0).unwrap()
        );

        let some = Value::Union {
            selector: 1,
            value: Some(Box::new(Value::Uint64(7))),
        };
        assert_eq!(
            hash_tree_root(&some, &ty).unwrap(),
            mix_in_selector(&chunk(&[7]), 1).unwrap()
        );
    }

    #[test]
    fn dirty_padding_changes_the_root() {
        let ty = Type::Bitvector { bits: 4 };
        let clean = hash_tree_root(&Value::Bitvector(vec![0x01]), &ty).unwrap();
        let dirty = hash_tree_root(&Value::Bitvector(vec![0xF1]), &ty).unwrap();
        assert_ne!(clean, dirty);
    }

    #[test]
    fn root_is_invariant_under_round_trip() {
        let ty = Type::container(
            "Mixed",
            vec![
                Field::new("n", Type::uint32()),
                Field::new("roots", Type::list(Type::root(), 4)),
            ],
        );
        let value = Value::Container(vec![
            Value::Uint32(5),
            Value::List(vec![crate::value::bytes_value(&[9; 32])]),
        ]);
        let bytes = encode(&value, &ty).unwrap();
        let decoded = crate::decode::decode(&bytes, &ty).unwrap();
        assert_eq!(
            hash_tree_root(&value, &ty).unwrap(),
            hash_tree_root(&decoded, &ty).unwrap()
        );
    }
}
