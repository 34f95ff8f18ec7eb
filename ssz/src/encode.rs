//! Canonical SSZ encoding of typed values.
//!
//! For any value that type-checks against its schema and satisfies the
//! canonical-form invariants, `encode` produces the unique canonical
//! serialization. Raw bitvector and bitlist bytes are emitted verbatim, so a
//! value carrying dirty padding bits serializes to its (non-canonical) byte
//! image; this is deliberate, it is how adversarial candidates reach a
//! decoder under test.

use crate::schema::Type;
use crate::value::Value;
use crate::BYTES_PER_LENGTH_OFFSET;

/// Returned when a value cannot be encoded.
#[derive(Debug, PartialEq, Clone)]
pub enum EncodeError {
    /// A list or bitlist holds more elements than its declared maximum.
    LengthExceedsMax { len: usize, max: usize },
    /// A vector or bitvector holds a different number of elements than its
    /// declared size.
    VectorLengthMismatch { len: usize, expected: usize },
    /// A bitlist has no bytes at all, or no sentinel bit to delimit it. The
    /// canonical empty bitlist is the single byte `0x01`.
    BitlistEmpty,
    /// A bitlist's content exceeds its declared bit bound.
    BitlistOverflow { bits: usize, max: usize },
    /// A union selector is outside the declared variant range, or disagrees
    /// with the presence of a payload.
    UnionInvalidSelector(u8),
    /// The value's shape does not match the schema.
    TypeMismatch,
}

/// Encodes `value` against `ty`, returning the serialized bytes.
pub fn encode(value: &Value, ty: &Type) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::with_capacity(encoded_len(value, ty));
    encode_into(value, ty, &mut buf)?;
    Ok(buf)
}

/// Writes a little-endian offset word.
pub fn encode_offset(buf: &mut Vec<u8>, offset: usize) {
    buf.extend_from_slice(&(offset as u32).to_le_bytes());
}

fn encode_into(value: &Value, ty: &Type, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    match (value, ty) {
        (Value::Null, _) => encode_into(&Value::zero(ty), ty, buf),
        (Value::Uint8(n), Type::Uint8) => {
            buf.push(*n);
            Ok(())
        }
        (Value::Uint16(n), Type::Uint16) => {
            buf.extend_from_slice(&n.to_le_bytes());
            Ok(())
        }
        (Value::Uint32(n), Type::Uint32) => {
            buf.extend_from_slice(&n.to_le_bytes());
            Ok(())
        }
        (Value::Uint64(n), Type::Uint64) => {
            buf.extend_from_slice(&n.to_le_bytes());
            Ok(())
        }
        (Value::Bool(b), Type::Bool) => {
            buf.push(*b as u8);
            Ok(())
        }
        (Value::Bitvector(bytes), Type::Bitvector { bits }) => {
            let expected = (bits + 7) / 8;
            if bytes.len() != expected {
                return Err(EncodeError::VectorLengthMismatch {
                    len: bytes.len(),
                    expected,
                });
            }
            buf.extend_from_slice(bytes);
            Ok(())
        }
        (Value::Bitlist(bytes), Type::Bitlist { max_bits }) => {
            let bits = bitlist_len(bytes).ok_or(EncodeError::BitlistEmpty)?;
            if bits > *max_bits {
                return Err(EncodeError::BitlistOverflow {
                    bits,
                    max: *max_bits,
                });
            }
            buf.extend_from_slice(bytes);
            Ok(())
        }
        (Value::Vector(items), Type::Vector { elem, len }) => {
            if items.len() != *len {
                return Err(EncodeError::VectorLengthMismatch {
                    len: items.len(),
                    expected: *len,
                });
            }
            encode_sequence(items, elem, buf)
        }
        (Value::List(items), Type::List { elem, max }) => {
            if items.len() > *max {
                return Err(EncodeError::LengthExceedsMax {
                    len: items.len(),
                    max: *max,
                });
            }
            encode_sequence(items, elem, buf)
        }
        (Value::Container(values), Type::Container { fields, .. }) => {
            if values.len() != fields.len() {
                return Err(EncodeError::TypeMismatch);
            }
            let fixed_len: usize = fields.iter().map(|f| f.ty.fixed_portion_len()).sum();

            let mut variable = Vec::new();
            let mut offset = fixed_len;
            for (value, field) in values.iter().zip(fields) {
                if field.ty.is_fixed_len() {
                    encode_into(value, &field.ty, buf)?;
                } else {
                    encode_offset(buf, offset);
                    let start = variable.len();
                    encode_into(value, &field.ty, &mut variable)?;
                    offset += variable.len() - start;
                }
            }
            buf.extend_from_slice(&variable);
            Ok(())
        }
        (Value::Union { selector, value }, Type::Union { variants }) => {
            let variant = variants
                .get(*selector as usize)
                .ok_or(EncodeError::UnionInvalidSelector(*selector))?;
            buf.push(*selector);
            match (variant, value) {
                (None, None) => Ok(()),
                (Some(ty), Some(value)) => encode_into(value, ty, buf),
                _ => Err(EncodeError::UnionInvalidSelector(*selector)),
            }
        }
        _ => Err(EncodeError::TypeMismatch),
    }
}

/// Encodes a homogeneous sequence: fixed-size elements inline, variable-size
/// elements behind an offset table (the same layout rule as a container whose
/// fields are all variable).
fn encode_sequence(items: &[Value], elem: &Type, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    if elem.is_fixed_len() {
        for item in items {
            encode_into(item, elem, buf)?;
        }
        Ok(())
    } else {
        let mut variable = Vec::new();
        let mut offset = items.len() * BYTES_PER_LENGTH_OFFSET;
        for item in items {
            encode_offset(buf, offset);
            let start = variable.len();
            encode_into(item, elem, &mut variable)?;
            offset += variable.len() - start;
        }
        buf.extend_from_slice(&variable);
        Ok(())
    }
}

/// Returns the serialized length of `value` without encoding it.
///
/// Length bounds are not enforced here; an over-long list reports the length
/// it would occupy if it were encodable.
pub fn encoded_len(value: &Value, ty: &Type) -> usize {
    match (value, ty) {
        (Value::Null, _) => encoded_len(&Value::zero(ty), ty),
        (Value::Uint8(_), _) | (Value::Bool(_), _) => 1,
        (Value::Uint16(_), _) => 2,
        (Value::Uint32(_), _) => 4,
        (Value::Uint64(_), _) => 8,
        (Value::Bitvector(bytes), _) | (Value::Bitlist(bytes), _) => bytes.len(),
        (Value::Vector(items), Type::Vector { elem, .. })
        | (Value::List(items), Type::List { elem, .. }) => {
            if elem.is_fixed_len() {
                items.iter().map(|i| encoded_len(i, elem)).sum()
            } else {
                items.len() * BYTES_PER_LENGTH_OFFSET
                    + items.iter().map(|i| encoded_len(i, elem)).sum::<usize>()
            }
        }
        (Value::Container(values), Type::Container { fields, .. }) => values
            .iter()
            .zip(fields)
            .map(|(v, f)| {
                if f.ty.is_fixed_len() {
                    encoded_len(v, &f.ty)
                } else {
                    BYTES_PER_LENGTH_OFFSET + encoded_len(v, &f.ty)
                }
            })
            .sum(),
        (Value::Union { selector, value }, Type::Union { variants }) => {
            1 + match (value, variants.get(*selector as usize)) {
                (Some(v), Some(Some(ty))) => encoded_len(v, ty),
                _ => 0,
            }
        }
        _ => 0,
    }
}

/// Returns the content bit-length of a bitlist encoding, or `None` when the
/// encoding has no sentinel (empty, or an all-zero last byte).
pub fn bitlist_len(bytes: &[u8]) -> Option<usize> {
    let last = *bytes.last()?;
    if last == 0 {
        return None;
    }
    let sentinel = 7 - last.leading_zeros() as usize;
    Some(8 * (bytes.len() - 1) + sentinel)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::Field;

    #[test]
    fn uints_are_little_endian() {
        assert_eq!(encode(&Value::Uint16(1), &Type::Uint16).unwrap(), vec![1, 0]);
        assert_eq!(
            encode(&Value::Uint32(1 << 16), &Type::Uint32).unwrap(),
            vec![0, 0, 1, 0]
        );
        assert_eq!(
            encode(&Value::Uint64(!0), &Type::Uint64).unwrap(),
            vec![255; 8]
        );
    }

    #[test]
    fn container_layout_offsets() {
        let ty = Type::container(
            "VariableLen",
            vec![
                Field::new("a", Type::uint16()),
                Field::new("b", Type::list(Type::uint16(), 8)),
                Field::new("c", Type::uint32()),
            ],
        );
        let value = Value::Container(vec![
            Value::Uint16(1),
            Value::List(vec![Value::Uint16(0), Value::Uint16(1), Value::Uint16(2)]),
            Value::Uint32(1),
        ]);
        assert_eq!(
            encode(&value, &ty).unwrap(),
            vec![1, 0, 10, 0, 0, 0, 1, 0, 0, 0, 0, 0, 1, 0, 2, 0]
        );
    }

    #[test]
    fn list_of_variable_elements_has_offset_table() {
        let ty = Type::list(Type::list(Type::uint8(), 8), 4);
        let value = Value::List(vec![
            Value::List(vec![Value::Uint8(0), Value::Uint8(1), Value::Uint8(2)]),
            Value::List(vec![Value::Uint8(11), Value::Uint8(22), Value::Uint8(33)]),
        ]);
        assert_eq!(
            encode(&value, &ty).unwrap(),
            vec![8, 0, 0, 0, 11, 0, 0, 0, 0, 1, 2, 11, 22, 33]
        );
    }

    #[test]
    fn empty_bitlist_is_lone_sentinel_byte() {
        let ty = Type::Bitlist { max_bits: 2048 };
        assert_eq!(encode(&Value::zero(&ty), &ty).unwrap(), vec![0x01]);
    }

    #[test]
    fn sentinel_free_bitlist_rejected() {
        let ty = Type::Bitlist { max_bits: 2048 };
        assert_eq!(
            encode(&Value::Bitlist(vec![0x00]), &ty),
            Err(EncodeError::BitlistEmpty)
        );
        assert_eq!(
            encode(&Value::Bitlist(vec![]), &ty),
            Err(EncodeError::BitlistEmpty)
        );
    }

    #[test]
    fn bitlist_over_max_rejected() {
        let ty = Type::Bitlist { max_bits: 4 };
        // Five content bits: 8 * 0 + sentinel at bit 5.
        assert_eq!(
            encode(&Value::Bitlist(vec![0x3F]), &ty),
            Err(EncodeError::BitlistOverflow { bits: 5, max: 4 })
        );
    }

    #[test]
    fn list_over_max_rejected() {
        let ty = Type::list(Type::uint8(), 4);
        let value = Value::List(vec![Value::Uint8(0); 5]);
        assert_eq!(
            encode(&value, &ty),
            Err(EncodeError::LengthExceedsMax { len: 5, max: 4 })
        );
    }

    #[test]
    fn union_selector_out_of_range_rejected() {
        let ty = Type::union(vec![None, Some(Type::uint64())]);
        assert_eq!(
            encode(
                &Value::Union {
                    selector: 2,
                    value: None
                },
                &ty
            ),
            Err(EncodeError::UnionInvalidSelector(2))
        );
    }

    #[test]
    fn union_encodings() {
        let ty = Type::union(vec![None, Some(Type::uint64())]);
        assert_eq!(
            encode(
                &Value::Union {
                    selector: 0,
                    value: None
                },
                &ty
            )
            .unwrap(),
            vec![0]
        );
        assert_eq!(
            encode(
                &Value::Union {
                    selector: 1,
                    value: Some(Box::new(Value::Uint64(2)))
                },
                &ty
            )
            .unwrap(),
            vec![1, 2, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn null_encodes_as_zero_value() {
        let elem = Type::container("Inner", vec![Field::new("x", Type::uint32())]);
        let ty = Type::list(elem, 4);
        let value = Value::List(vec![Value::Null]);
        assert_eq!(encode(&value, &ty).unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn encoded_len_matches_encoding() {
        let ty = Type::container(
            "Mixed",
            vec![
                Field::new("a", Type::uint64()),
                Field::new("b", Type::list(Type::uint8(), 64)),
                Field::new("c", Type::bitlist(64)),
            ],
        );
        let value = Value::Container(vec![
            Value::Uint64(9),
            Value::List(vec![Value::Uint8(1), Value::Uint8(2)]),
            Value::Bitlist(vec![0b1010, 0x01]),
        ]);
        let encoded = encode(&value, &ty).unwrap();
        assert_eq!(encoded_len(&value, &ty), encoded.len());
    }
}
