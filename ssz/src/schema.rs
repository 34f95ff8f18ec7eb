//! Structural description of SSZ types.
//!
//! A schema is an immutable tree of `Type` nodes built once at startup and
//! shared freely afterwards. Nested types are held through `Arc`, so schemas
//! form a DAG by construction. All structural questions the codec asks
//! (fixed vs variable size, element bounds, union arity) are answered from
//! the schema alone.

use crate::BYTES_PER_LENGTH_OFFSET;
use std::sync::Arc;

/// A named container field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Arc<Type>,
}

impl Field {
    pub fn new<N: Into<String>>(name: N, ty: Arc<Type>) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// The structural type of an SSZ value.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Bool,
    /// Fixed-length sequence of exactly `len` elements.
    Vector { elem: Arc<Type>, len: usize },
    /// Variable-length sequence of at most `max` elements.
    List { elem: Arc<Type>, max: usize },
    /// `bits` bits packed little-endian; the unused high bits of the final
    /// byte are padding and must be zero.
    Bitvector { bits: usize },
    /// Variable-length bit sequence delimited by a sentinel bit; at most
    /// `max_bits` content bits.
    Bitlist { max_bits: usize },
    /// Ordered named fields.
    Container { name: String, fields: Vec<Field> },
    /// Selector byte followed by the selected variant's encoding. Variant 0
    /// may be `None`, which carries no payload.
    Union { variants: Vec<Option<Arc<Type>>> },
}

impl Type {
    pub fn uint8() -> Arc<Type> {
        Arc::new(Type::Uint8)
    }

    pub fn uint16() -> Arc<Type> {
        Arc::new(Type::Uint16)
    }

    pub fn uint32() -> Arc<Type> {
        Arc::new(Type::Uint32)
    }

    pub fn uint64() -> Arc<Type> {
        Arc::new(Type::Uint64)
    }

    pub fn boolean() -> Arc<Type> {
        Arc::new(Type::Bool)
    }

    pub fn vector(elem: Arc<Type>, len: usize) -> Arc<Type> {
        Arc::new(Type::Vector { elem, len })
    }

    pub fn list(elem: Arc<Type>, max: usize) -> Arc<Type> {
        Arc::new(Type::List { elem, max })
    }

    pub fn bitvector(bits: usize) -> Arc<Type> {
        Arc::new(Type::Bitvector { bits })
    }

    pub fn bitlist(max_bits: usize) -> Arc<Type> {
        Arc::new(Type::Bitlist { max_bits })
    }

    pub fn container<N: Into<String>>(name: N, fields: Vec<Field>) -> Arc<Type> {
        Arc::new(Type::Container {
            name: name.into(),
            fields,
        })
    }

    pub fn union(variants: Vec<Option<Arc<Type>>>) -> Arc<Type> {
        Arc::new(Type::Union { variants })
    }

    /// A 32-byte root, modelled as a byte vector.
    pub fn root() -> Arc<Type> {
        Self::vector(Self::uint8(), 32)
    }

    /// Returns `true` if every component of this type is fixed-size.
    pub fn is_fixed_len(&self) -> bool {
        match self {
            Type::Uint8 | Type::Uint16 | Type::Uint32 | Type::Uint64 | Type::Bool => true,
            Type::Bitvector { .. } => true,
            Type::Vector { elem, .. } => elem.is_fixed_len(),
            Type::List { .. } | Type::Bitlist { .. } | Type::Union { .. } => false,
            Type::Container { fields, .. } => fields.iter().all(|f| f.ty.is_fixed_len()),
        }
    }

    /// The exact encoded length of a fixed-size type, or `None` for
    /// variable-size types.
    pub fn fixed_len(&self) -> Option<usize> {
        match self {
            Type::Uint8 | Type::Bool => Some(1),
            Type::Uint16 => Some(2),
            Type::Uint32 => Some(4),
            Type::Uint64 => Some(8),
            Type::Bitvector { bits } => Some((bits + 7) / 8),
            Type::Vector { elem, len } => elem.fixed_len().map(|e| e * len),
            Type::Container { fields, .. } => fields
                .iter()
                .map(|f| f.ty.fixed_len())
                .sum::<Option<usize>>(),
            Type::List { .. } | Type::Bitlist { .. } | Type::Union { .. } => None,
        }
    }

    /// The number of bytes this type occupies in the fixed-length portion of
    /// its parent: its own length if fixed, otherwise one offset word.
    pub fn fixed_portion_len(&self) -> usize {
        self.fixed_len().unwrap_or(BYTES_PER_LENGTH_OFFSET)
    }

    /// The size of the fixed section of a container or, for other types,
    /// their own fixed-portion footprint.
    pub fn fixed_section_len(&self) -> usize {
        match self {
            Type::Container { fields, .. } => {
                fields.iter().map(|f| f.ty.fixed_portion_len()).sum()
            }
            other => other.fixed_portion_len(),
        }
    }

    /// An upper bound on the encoded length of any value of this type.
    ///
    /// Used to size the offset-gap sampling domain; saturates instead of
    /// overflowing for pathological bounds.
    pub fn max_encoded_len(&self) -> usize {
        match self {
            Type::Uint8 | Type::Bool => 1,
            Type::Uint16 => 2,
            Type::Uint32 => 4,
            Type::Uint64 => 8,
            Type::Bitvector { bits } => (bits + 7) / 8,
            Type::Bitlist { max_bits } => max_bits / 8 + 1,
            Type::Vector { elem, len } => {
                let per_elem = if elem.is_fixed_len() {
                    elem.max_encoded_len()
                } else {
                    elem.max_encoded_len().saturating_add(BYTES_PER_LENGTH_OFFSET)
                };
                per_elem.saturating_mul(*len)
            }
            Type::List { elem, max } => {
                let per_elem = if elem.is_fixed_len() {
                    elem.max_encoded_len()
                } else {
                    elem.max_encoded_len().saturating_add(BYTES_PER_LENGTH_OFFSET)
                };
                per_elem.saturating_mul(*max)
            }
            Type::Container { fields, .. } => fields
                .iter()
                .map(|f| {
                    if f.ty.is_fixed_len() {
                        f.ty.max_encoded_len()
                    } else {
                        f.ty.max_encoded_len().saturating_add(BYTES_PER_LENGTH_OFFSET)
                    }
                })
                .fold(0usize, usize::saturating_add),
            Type::Union { variants } => variants
                .iter()
                .map(|v| v.as_ref().map_or(0, |ty| ty.max_encoded_len()))
                .max()
                .unwrap_or(0)
                .saturating_add(1),
        }
    }

    /// A short human-readable description used in logs and bucket advisories.
    pub fn describe(&self) -> String {
        match self {
            Type::Uint8 => "uint8".into(),
            Type::Uint16 => "uint16".into(),
            Type::Uint32 => "uint32".into(),
            Type::Uint64 => "uint64".into(),
            Type::Bool => "bool".into(),
            Type::Vector { elem, len } => format!("Vector[{}, {}]", elem.describe(), len),
            Type::List { elem, max } => format!("List[{}, {}]", elem.describe(), max),
            Type::Bitvector { bits } => format!("Bitvector[{}]", bits),
            Type::Bitlist { max_bits } => format!("Bitlist[{}]", max_bits),
            Type::Container { name, .. } => name.clone(),
            Type::Union { variants } => format!("Union[{}]", variants.len()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn checkpoint() -> Arc<Type> {
        Type::container(
            "Checkpoint",
            vec![
                Field::new("epoch", Type::uint64()),
                Field::new("root", Type::root()),
            ],
        )
    }

    #[test]
    fn scalar_sizes() {
        assert_eq!(Type::Uint8.fixed_len(), Some(1));
        assert_eq!(Type::Uint16.fixed_len(), Some(2));
        assert_eq!(Type::Uint32.fixed_len(), Some(4));
        assert_eq!(Type::Uint64.fixed_len(), Some(8));
        assert_eq!(Type::Bool.fixed_len(), Some(1));
    }

    #[test]
    fn bitvector_rounds_up_to_bytes() {
        assert_eq!(Type::Bitvector { bits: 4 }.fixed_len(), Some(1));
        assert_eq!(Type::Bitvector { bits: 8 }.fixed_len(), Some(1));
        assert_eq!(Type::Bitvector { bits: 9 }.fixed_len(), Some(2));
    }

    #[test]
    fn container_of_fixed_fields_is_fixed() {
        let ty = checkpoint();
        assert!(ty.is_fixed_len());
        assert_eq!(ty.fixed_len(), Some(40));
    }

    #[test]
    fn variable_field_makes_container_variable() {
        let ty = Type::container(
            "WithList",
            vec![
                Field::new("a", Type::uint32()),
                Field::new("b", Type::list(Type::uint8(), 16)),
            ],
        );
        assert!(!ty.is_fixed_len());
        assert_eq!(ty.fixed_len(), None);
        // u32 inline plus one offset word.
        assert_eq!(ty.fixed_section_len(), 8);
    }

    #[test]
    fn max_encoded_len_of_variable_list() {
        let ty = Type::list(Type::list(Type::uint8(), 4), 2);
        // Two offset words plus two payloads of at most 4 bytes.
        assert_eq!(ty.max_encoded_len(), 16);
    }

    #[test]
    fn union_max_len_is_largest_variant_plus_selector() {
        let ty = Type::union(vec![None, Some(Type::uint64())]);
        assert_eq!(ty.max_encoded_len(), 9);
        assert!(!ty.is_fixed_len());
    }
}
