//! Strict SSZ decoding.
//!
//! Decoding rejects every input that is not the canonical encoding of some
//! value: non-canonical booleans, dirty bitvector padding, sentinel-free
//! bitlists, offsets that skip or revisit bytes, and buffers with trailing
//! content. `decode(encode(v)) == v` for canonical values, and
//! `encode(decode(b)) == b` for every accepted `b`.

use crate::encode::bitlist_len;
use crate::schema::{Field, Type};
use crate::value::{padding_bits_set, Value};
use crate::BYTES_PER_LENGTH_OFFSET;
use smallvec::SmallVec;

type SmallVec8<T> = SmallVec<[T; 8]>;

/// Returned when SSZ decoding fails.
#[derive(Debug, PartialEq, Clone)]
pub enum DecodeError {
    /// The bytes were too short to hold the type.
    ShortBuffer { len: usize, expected: usize },
    /// An offset references byte indices that do not exist in the buffer.
    OffsetOutOfRange(usize),
    /// An offset points to bytes prior to the previous offset.
    OffsetNonMonotonic(usize),
    /// The first offset does not point to the byte immediately following the
    /// fixed section.
    FirstOffsetMismatch(usize),
    /// Bytes remain past the natural end of the value.
    TrailingBytes { len: usize, expected: usize },
    /// A bitlist's last byte is zero, so no sentinel bit delimits it.
    BitlistMissingSentinel,
    /// A bitlist's content bit-length exceeds its declared bound.
    BitlistExceedsMax { bits: usize, max: usize },
    /// A bitvector has non-zero bits beyond its declared width.
    BitvectorDirtyPadding,
    /// A boolean byte other than `0x00` or `0x01`.
    BoolNonCanonical(u8),
    /// A vector's encoding holds a different element count than declared.
    VectorLengthMismatch { len: usize, expected: usize },
    /// A union selector outside the declared variant range.
    UnionInvalidSelector(u8),
    /// Bytes follow a union variant's natural end.
    UnionTrailing { extra: usize },
}

/// Decodes `bytes` as a value of `ty`.
///
/// The supplied bytes must be the exact encoding; excess bytes are an error.
pub fn decode(bytes: &[u8], ty: &Type) -> Result<Value, DecodeError> {
    match ty {
        Type::Uint8 => Ok(Value::Uint8(exact::<1>(bytes)?[0])),
        Type::Uint16 => Ok(Value::Uint16(u16::from_le_bytes(exact::<2>(bytes)?))),
        Type::Uint32 => Ok(Value::Uint32(u32::from_le_bytes(exact::<4>(bytes)?))),
        Type::Uint64 => Ok(Value::Uint64(u64::from_le_bytes(exact::<8>(bytes)?))),
        Type::Bool => match exact::<1>(bytes)?[0] {
            0 => Ok(Value::Bool(false)),
            1 => Ok(Value::Bool(true)),
            other => Err(DecodeError::BoolNonCanonical(other)),
        },
        Type::Bitvector { bits } => decode_bitvector(bytes, *bits),
        Type::Bitlist { max_bits } => decode_bitlist(bytes, *max_bits),
        Type::Vector { elem, len } => decode_vector(bytes, elem, *len),
        Type::List { elem, max } => decode_list(bytes, elem, *max),
        Type::Container { fields, .. } => decode_container(bytes, fields),
        Type::Union { variants } => decode_union(bytes, variants),
    }
}

/// Reads a `BYTES_PER_LENGTH_OFFSET`-byte little-endian offset word.
pub fn read_offset(bytes: &[u8]) -> Result<usize, DecodeError> {
    let word = bytes
        .get(0..BYTES_PER_LENGTH_OFFSET)
        .ok_or(DecodeError::ShortBuffer {
            len: bytes.len(),
            expected: BYTES_PER_LENGTH_OFFSET,
        })?;
    let mut array = [0; BYTES_PER_LENGTH_OFFSET];
    array.copy_from_slice(word);
    Ok(u32::from_le_bytes(array) as usize)
}

/// Performs checks on `offset` based upon the other parameters provided.
///
/// - `previous_offset`: the previously-read offset, unless this is the first
///   offset of the object. Offsets must not decrease.
/// - `num_bytes`: the total number of bytes in the object; offsets may not
///   point past the end.
/// - `num_fixed_bytes`: the fixed-section size, when known. The first offset
///   must point to the byte immediately following the fixed section, which
///   also means an offset of `0` is accepted exactly when the fixed section
///   is empty.
pub fn sanitize_offset(
    offset: usize,
    previous_offset: Option<usize>,
    num_bytes: usize,
    num_fixed_bytes: Option<usize>,
) -> Result<usize, DecodeError> {
    if previous_offset.is_none()
        && num_fixed_bytes.map_or(false, |fixed_bytes| offset != fixed_bytes)
    {
        Err(DecodeError::FirstOffsetMismatch(offset))
    } else if offset > num_bytes {
        Err(DecodeError::OffsetOutOfRange(offset))
    } else if previous_offset.map_or(false, |prev| prev > offset) {
        Err(DecodeError::OffsetNonMonotonic(offset))
    } else {
        Ok(offset)
    }
}

fn exact<const N: usize>(bytes: &[u8]) -> Result<[u8; N], DecodeError> {
    if bytes.len() < N {
        return Err(DecodeError::ShortBuffer {
            len: bytes.len(),
            expected: N,
        });
    }
    if bytes.len() > N {
        return Err(DecodeError::TrailingBytes {
            len: bytes.len(),
            expected: N,
        });
    }
    let mut array = [0; N];
    array.copy_from_slice(bytes);
    Ok(array)
}

fn decode_bitvector(bytes: &[u8], bits: usize) -> Result<Value, DecodeError> {
    let expected = (bits + 7) / 8;
    if bytes.len() < expected {
        return Err(DecodeError::ShortBuffer {
            len: bytes.len(),
            expected,
        });
    }
    if bytes.len() > expected {
        return Err(DecodeError::TrailingBytes {
            len: bytes.len(),
            expected,
        });
    }
    if padding_bits_set(bytes, bits) {
        return Err(DecodeError::BitvectorDirtyPadding);
    }
    Ok(Value::Bitvector(bytes.to_vec()))
}

fn decode_bitlist(bytes: &[u8], max_bits: usize) -> Result<Value, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::ShortBuffer {
            len: 0,
            expected: 1,
        });
    }
    let bits = bitlist_len(bytes).ok_or(DecodeError::BitlistMissingSentinel)?;
    if bits > max_bits {
        return Err(DecodeError::BitlistExceedsMax {
            bits,
            max: max_bits,
        });
    }
    Ok(Value::Bitlist(bytes.to_vec()))
}

fn decode_vector(bytes: &[u8], elem: &Type, len: usize) -> Result<Value, DecodeError> {
    if let Some(elem_len) = elem.fixed_len() {
        let expected = elem_len * len;
        if bytes.len() != expected {
            return Err(DecodeError::VectorLengthMismatch {
                len: bytes.len(),
                expected,
            });
        }
        let items = bytes
            .chunks(elem_len)
            .map(|chunk| decode(chunk, elem))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Vector(items))
    } else {
        let items = decode_variable_sequence(bytes, elem, None)?;
        if items.len() != len {
            return Err(DecodeError::VectorLengthMismatch {
                len: items.len(),
                expected: len,
            });
        }
        Ok(Value::Vector(items))
    }
}

fn decode_list(bytes: &[u8], elem: &Type, max: usize) -> Result<Value, DecodeError> {
    if bytes.is_empty() {
        return Ok(Value::List(vec![]));
    }
    if let Some(elem_len) = elem.fixed_len() {
        if bytes.len() % elem_len != 0 {
            return Err(DecodeError::ShortBuffer {
                len: bytes.len(),
                expected: (bytes.len() / elem_len + 1) * elem_len,
            });
        }
        let count = bytes.len() / elem_len;
        if count > max {
            return Err(DecodeError::TrailingBytes {
                len: bytes.len(),
                expected: max * elem_len,
            });
        }
        let items = bytes
            .chunks(elem_len)
            .map(|chunk| decode(chunk, elem))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::List(items))
    } else {
        let items = decode_variable_sequence(bytes, elem, Some(max))?;
        Ok(Value::List(items))
    }
}

/// Decodes a non-empty sequence of variable-size elements: an offset table
/// whose first entry fixes the element count, followed by the payloads.
fn decode_variable_sequence(
    bytes: &[u8],
    elem: &Type,
    max: Option<usize>,
) -> Result<Vec<Value>, DecodeError> {
    let first_offset = read_offset(bytes)?;
    if first_offset % BYTES_PER_LENGTH_OFFSET != 0 || first_offset == 0 {
        return Err(DecodeError::FirstOffsetMismatch(first_offset));
    }
    let count = first_offset / BYTES_PER_LENGTH_OFFSET;
    if let Some(max) = max {
        if count > max {
            return Err(DecodeError::TrailingBytes {
                len: bytes.len(),
                expected: max * BYTES_PER_LENGTH_OFFSET,
            });
        }
    }

    let mut offsets: SmallVec8<usize> = SmallVec8::new();
    for i in 0..count {
        let offset = read_offset(&bytes[i * BYTES_PER_LENGTH_OFFSET..])?;
        let sanitized = sanitize_offset(
            offset,
            offsets.last().copied(),
            bytes.len(),
            if i == 0 { Some(first_offset) } else { None },
        )?;
        offsets.push(sanitized);
    }

    let mut items = Vec::with_capacity(count);
    for (i, &start) in offsets.iter().enumerate() {
        let end = offsets.get(i + 1).copied().unwrap_or(bytes.len());
        items.push(decode(&bytes[start..end], elem)?);
    }
    Ok(items)
}

fn decode_container(bytes: &[u8], fields: &[Field]) -> Result<Value, DecodeError> {
    #[derive(Copy, Clone)]
    struct Offset {
        position: usize,
        offset: usize,
    }

    let num_fixed_bytes: usize = fields.iter().map(|f| f.ty.fixed_portion_len()).sum();

    // First pass: slice out fixed fields and sanitize the offset words.
    let mut items: SmallVec8<&[u8]> = SmallVec8::new();
    let mut offsets: SmallVec8<Offset> = SmallVec8::new();
    let mut items_index = 0;

    for field in fields {
        if let Some(fixed_len) = field.ty.fixed_len() {
            let slice = bytes.get(items_index..items_index + fixed_len).ok_or(
                DecodeError::ShortBuffer {
                    len: bytes.len(),
                    expected: items_index + fixed_len,
                },
            )?;
            items.push(slice);
            items_index += fixed_len;
        } else {
            let offset = sanitize_offset(
                read_offset(&bytes[items_index.min(bytes.len())..])?,
                offsets.last().map(|o| o.offset),
                bytes.len(),
                Some(num_fixed_bytes),
            )?;
            offsets.push(Offset {
                position: items.len(),
                offset,
            });
            // Placeholder, replaced once the next offset is known.
            items.push(&[]);
            items_index += BYTES_PER_LENGTH_OFFSET;
        }
    }

    // Second pass: each variable payload spans to the next offset, the last
    // one through to the end of the buffer.
    if offsets.is_empty() {
        if bytes.len() < items_index {
            return Err(DecodeError::ShortBuffer {
                len: bytes.len(),
                expected: items_index,
            });
        }
        if bytes.len() > items_index {
            return Err(DecodeError::TrailingBytes {
                len: bytes.len(),
                expected: items_index,
            });
        }
    } else {
        for pair in offsets.windows(2) {
            items[pair[0].position] = &bytes[pair[0].offset..pair[1].offset];
        }
        let last = offsets.last().expect("at least one offset");
        items[last.position] = &bytes[last.offset..];
    }

    let values = items
        .iter()
        .zip(fields)
        .map(|(slice, field)| decode(slice, &field.ty))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Container(values))
}

fn decode_union(
    bytes: &[u8],
    variants: &[Option<std::sync::Arc<Type>>],
) -> Result<Value, DecodeError> {
    let selector = *bytes.first().ok_or(DecodeError::ShortBuffer {
        len: 0,
        expected: 1,
    })?;
    let body = &bytes[1..];
    let variant = variants
        .get(selector as usize)
        .ok_or(DecodeError::UnionInvalidSelector(selector))?;
    match variant {
        None => {
            if !body.is_empty() {
                return Err(DecodeError::UnionTrailing { extra: body.len() });
            }
            Ok(Value::Union {
                selector,
                value: None,
            })
        }
        Some(ty) => Ok(Value::Union {
            selector,
            value: Some(Box::new(decode(body, ty)?)),
        }),
    }
}
