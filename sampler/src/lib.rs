//! Structured input sampling.
//!
//! [`concretize`] walks a schema under a bucket [`SelectionMatrix`] and
//! produces a typed value together with a [`MutationPlan`]: the post-encoding
//! byte surgery (offset gaps, appended tails, zeroed sentinels, dirty scalar
//! bytes) that the chosen buckets call for but no canonical encoder can
//! produce. [`mutate`] then carries the plan out on the serialized bytes.

mod concretize;
mod mutate;

pub use concretize::{concretize, SampleError};
pub use mutate::{fixed_offset_of, mutate};

use ssz::{Type, Value};

/// A single post-encoding byte mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert `size` random bytes immediately before the first variable
    /// payload and rewrite every top-level offset word by `+size`.
    Gap { size: usize },
    /// Append `len` random bytes to the end of the buffer.
    Tail { len: usize },
    /// Zero the last byte of the named bitlist field's payload.
    NullSentinel { field: String },
    /// Replace the named fixed-size field's first byte. Carries the dirty
    /// scalar bytes that value buckets select but typed values cannot hold.
    OverwriteFixed { field: String, byte: u8 },
}

/// The ordered mutations one sample requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationPlan {
    pub mutations: Vec<Mutation>,
}

impl MutationPlan {
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }
}

/// Returns `true` when a sample will serialize to a canonical encoding: no
/// pending byte mutations and no dirty padding carried in the value itself.
pub fn is_canonical(value: &Value, schema: &Type, plan: &MutationPlan) -> bool {
    plan.is_empty() && !value.has_dirty_padding(schema) && !value.has_null_bitlist(schema)
}
