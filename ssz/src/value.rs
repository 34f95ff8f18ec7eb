//! Typed values: the in-memory tree a schema describes.
//!
//! Values are short-lived. They are sampled, encoded, compared and discarded;
//! nothing in this module mutates a schema. `Bitvector` and `Bitlist` carry
//! their raw packed bytes so that non-canonical states (dirty padding bits, a
//! missing sentinel) are representable and can be driven into a decoder.

use crate::schema::Type;
use std::sync::Arc;

/// A typed SSZ value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Bool(bool),
    Vector(Vec<Value>),
    List(Vec<Value>),
    /// Raw packed bits, `⌈bits / 8⌉` bytes. High bits of the last byte beyond
    /// the declared width may be dirty; the codec never cleans them silently.
    Bitvector(Vec<u8>),
    /// Raw packed bits including the sentinel byte. The last byte may be zero
    /// (a sentinel fault) when produced by the mutator.
    Bitlist(Vec<u8>),
    Container(Vec<Value>),
    Union { selector: u8, value: Option<Box<Value>> },
    /// An absent element inside a list of containers. The reference codec
    /// substitutes the element type's zero value wherever this appears.
    Null,
}

impl Value {
    /// Constructs the zero value of `ty`.
    pub fn zero(ty: &Type) -> Value {
        match ty {
            Type::Uint8 => Value::Uint8(0),
            Type::Uint16 => Value::Uint16(0),
            Type::Uint32 => Value::Uint32(0),
            Type::Uint64 => Value::Uint64(0),
            Type::Bool => Value::Bool(false),
            Type::Vector { elem, len } => {
                Value::Vector((0..*len).map(|_| Value::zero(elem)).collect())
            }
            Type::List { .. } => Value::List(vec![]),
            Type::Bitvector { bits } => Value::Bitvector(vec![0; (bits + 7) / 8]),
            // The empty bitlist is a lone sentinel bit.
            Type::Bitlist { .. } => Value::Bitlist(vec![0x01]),
            Type::Container { fields, .. } => {
                Value::Container(fields.iter().map(|f| Value::zero(&f.ty)).collect())
            }
            Type::Union { .. } => Value::Union {
                selector: 0,
                value: None,
            },
        }
    }

    /// Returns `true` if this value is structurally admissible for `ty`.
    ///
    /// Length bounds (list maxima, bitlist bit counts) are *not* enforced
    /// here; they are encode-time checks. This answers only "does the shape
    /// of the tree match the schema".
    pub fn type_check(&self, ty: &Type) -> bool {
        match (self, ty) {
            (Value::Uint8(_), Type::Uint8)
            | (Value::Uint16(_), Type::Uint16)
            | (Value::Uint32(_), Type::Uint32)
            | (Value::Uint64(_), Type::Uint64)
            | (Value::Bool(_), Type::Bool) => true,
            (Value::Vector(items), Type::Vector { elem, len }) => {
                items.len() == *len && items.iter().all(|i| i.type_check(elem))
            }
            (Value::List(items), Type::List { elem, .. }) => {
                items.iter().all(|i| i.type_check(elem) || matches!(i, Value::Null))
            }
            (Value::Bitvector(bytes), Type::Bitvector { bits }) => bytes.len() == (bits + 7) / 8,
            (Value::Bitlist(bytes), Type::Bitlist { .. }) => !bytes.is_empty(),
            (Value::Container(values), Type::Container { fields, .. }) => {
                values.len() == fields.len()
                    && values
                        .iter()
                        .zip(fields)
                        .all(|(v, f)| v.type_check(&f.ty) || matches!(v, Value::Null))
            }
            (Value::Union { selector, value }, Type::Union { variants }) => {
                match variants.get(*selector as usize) {
                    Some(None) => value.is_none(),
                    Some(Some(variant)) => {
                        value.as_ref().map_or(false, |v| v.type_check(variant))
                    }
                    None => false,
                }
            }
            (Value::Null, _) => true,
            _ => false,
        }
    }

    /// Returns the canonical form of this value.
    ///
    /// Canonicalisation is a schema-local rewrite: bitvector padding bits are
    /// cleared and bitlists without a sentinel collapse to the canonical empty
    /// encoding. It is the identity on already-canonical values.
    pub fn canonicalize(&self, ty: &Type) -> Value {
        match (self, ty) {
            (Value::Bitvector(bytes), Type::Bitvector { bits }) => {
                let mut cleaned = bytes.clone();
                clear_padding_bits(&mut cleaned, *bits);
                Value::Bitvector(cleaned)
            }
            (Value::Bitlist(bytes), Type::Bitlist { .. }) => {
                if bytes.is_empty() || *bytes.last().expect("non-empty") == 0 {
                    Value::Bitlist(vec![0x01])
                } else {
                    Value::Bitlist(bytes.clone())
                }
            }
            (Value::Vector(items), Type::Vector { elem, .. }) => {
                Value::Vector(items.iter().map(|i| i.canonicalize(elem)).collect())
            }
            (Value::List(items), Type::List { elem, .. }) => {
                Value::List(items.iter().map(|i| i.canonicalize(elem)).collect())
            }
            (Value::Container(values), Type::Container { fields, .. }) => Value::Container(
                values
                    .iter()
                    .zip(fields)
                    .map(|(v, f)| v.canonicalize(&f.ty))
                    .collect(),
            ),
            (Value::Union { selector, value }, Type::Union { variants }) => Value::Union {
                selector: *selector,
                value: value.as_ref().and_then(|v| {
                    variants
                        .get(*selector as usize)
                        .and_then(|variant| variant.as_ref())
                        .map(|variant| Box::new(v.canonicalize(variant)))
                }),
            },
            (other, _) => other.clone(),
        }
    }

    /// Returns `true` if any bitvector in this value has non-zero bits beyond
    /// its declared width.
    ///
    /// Only bits strictly past `Bitvector(N)`'s width count as padding; byte
    /// content elsewhere is never flagged, however high its bits.
    pub fn has_dirty_padding(&self, ty: &Type) -> bool {
        match (self, ty) {
            (Value::Bitvector(bytes), Type::Bitvector { bits }) => {
                padding_bits_set(bytes, *bits)
            }
            (Value::Vector(items), Type::Vector { elem, .. })
            | (Value::List(items), Type::List { elem, .. }) => {
                items.iter().any(|i| i.has_dirty_padding(elem))
            }
            (Value::Container(values), Type::Container { fields, .. }) => values
                .iter()
                .zip(fields)
                .any(|(v, f)| v.has_dirty_padding(&f.ty)),
            (Value::Union { selector, value }, Type::Union { variants }) => {
                match (value, variants.get(*selector as usize)) {
                    (Some(v), Some(Some(variant))) => v.has_dirty_padding(variant),
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// Returns `true` if any bitlist in this value lacks its sentinel bit.
    pub fn has_null_bitlist(&self, ty: &Type) -> bool {
        match (self, ty) {
            (Value::Bitlist(bytes), Type::Bitlist { .. }) => {
                bytes.last().map_or(true, |last| *last == 0)
            }
            (Value::Vector(items), Type::Vector { elem, .. })
            | (Value::List(items), Type::List { elem, .. }) => {
                items.iter().any(|i| i.has_null_bitlist(elem))
            }
            (Value::Container(values), Type::Container { fields, .. }) => values
                .iter()
                .zip(fields)
                .any(|(v, f)| v.has_null_bitlist(&f.ty)),
            (Value::Union { selector, value }, Type::Union { variants }) => {
                match (value, variants.get(*selector as usize)) {
                    (Some(v), Some(Some(variant))) => v.has_null_bitlist(variant),
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// Returns `true` if this value contains a union resting on its `None`
    /// (selector zero) variant.
    pub fn has_none_union(&self, ty: &Type) -> bool {
        match (self, ty) {
            (Value::Union { selector, value }, Type::Union { variants }) => {
                *selector == 0
                    || match (value, variants.get(*selector as usize)) {
                        (Some(v), Some(Some(variant))) => v.has_none_union(variant),
                        _ => false,
                    }
            }
            (Value::Vector(items), Type::Vector { elem, .. })
            | (Value::List(items), Type::List { elem, .. }) => {
                items.iter().any(|i| i.has_none_union(elem))
            }
            (Value::Container(values), Type::Container { fields, .. }) => values
                .iter()
                .zip(fields)
                .any(|(v, f)| v.has_none_union(&f.ty)),
            _ => false,
        }
    }

    /// Fetches the field value at `path` (dotted field names) inside nested
    /// containers.
    pub fn field(&self, ty: &Type, path: &str) -> Option<(Value, Arc<Type>)> {
        let mut value = self.clone();
        let mut current: Arc<Type> = Arc::new(ty.clone());
        for segment in path.split('.') {
            let (values, fields) = match (&value, current.as_ref()) {
                (Value::Container(values), Type::Container { fields, .. }) => {
                    (values.clone(), fields.clone())
                }
                _ => return None,
            };
            let idx = fields.iter().position(|f| f.name == segment)?;
            value = values.into_iter().nth(idx)?;
            current = fields[idx].ty.clone();
        }
        Some((value, current))
    }
}

/// Zeroes the bits of `bytes` beyond `bits`.
pub fn clear_padding_bits(bytes: &mut [u8], bits: usize) {
    if bits % 8 != 0 {
        if let Some(last) = bytes.last_mut() {
            *last &= (1u8 << (bits % 8)) - 1;
        }
    }
}

/// Returns `true` if any bit of `bytes` beyond `bits` is set.
pub fn padding_bits_set(bytes: &[u8], bits: usize) -> bool {
    if bits % 8 == 0 {
        return false;
    }
    bytes
        .last()
        .map_or(false, |last| last & !((1u8 << (bits % 8)) - 1) != 0)
}

/// Convenience constructor for a byte-vector value (e.g. a 32-byte root).
pub fn bytes_value(bytes: &[u8]) -> Value {
    Value::Vector(bytes.iter().map(|b| Value::Uint8(*b)).collect())
}
