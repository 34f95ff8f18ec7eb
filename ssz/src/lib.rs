//! A schema-driven reference implementation of the SimpleSerialize (SSZ)
//! encoding.
//!
//! Unlike codecs that derive their structure from native types, everything
//! here dispatches on a runtime [`Type`] tree: the schema is the single
//! source of structural truth. On top of the schema sit the four operations a
//! differential oracle needs a trustworthy answer for:
//!
//! - [`encode`]: the unique canonical serialization of a typed value;
//! - [`decode`]: strict decoding that rejects every non-canonical input;
//! - [`hash_tree_root`]: Merkleization per the SSZ hashing rules;
//! - [`proof_tree`] / [`Multiproof`]: Merkle multiproof construction over
//!   generalized indices.
//!
//! ## Example
//!
//! ```rust
//! use ssz::{decode, encode, Field, Type, Value};
//!
//! let schema = Type::container(
//!     "Foo",
//!     vec![
//!         Field::new("a", Type::uint64()),
//!         Field::new("b", Type::list(Type::uint16(), 16)),
//!     ],
//! );
//!
//! let foo = Value::Container(vec![
//!     Value::Uint64(42),
//!     Value::List(vec![Value::Uint16(1), Value::Uint16(3)]),
//! ]);
//!
//! let bytes = encode(&foo, &schema).unwrap();
//! assert_eq!(decode(&bytes, &schema).unwrap(), foo);
//! ```

mod decode;
mod encode;
mod hash;
mod proof;
mod schema;
mod value;

pub use decode::{decode, read_offset, sanitize_offset, DecodeError};
pub use encode::{bitlist_len, encode, encode_offset, encoded_len, EncodeError};
pub use hash::hash_tree_root;
pub use proof::{proof_tree, select_proof_gindices, Multiproof, ProofNode, ProofTree};
pub use schema::{Field, Type};
pub use value::{bytes_value, clear_padding_bits, padding_bits_set, Value};

pub use tree_hash::{verify_multiproof, Hash256, MultiproofError};

/// The number of bytes used to represent an offset.
pub const BYTES_PER_LENGTH_OFFSET: usize = 4;

/// The maximum value that can be represented using `BYTES_PER_LENGTH_OFFSET`.
pub const MAX_LENGTH_VALUE: usize = (u32::MAX as usize) >> (8 * (4 - BYTES_PER_LENGTH_OFFSET));

/// The number of bytes used to indicate the variant of a union.
pub const BYTES_PER_UNION_SELECTOR: usize = 1;
