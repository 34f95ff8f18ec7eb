//! The boundary to a system under test.
//!
//! A SUT is any SSZ implementation that can be driven through decode,
//! encode, hash and proof construction against a runtime schema. Every call
//! into a SUT is wrapped in a panic guard: a panicking SUT is a finding, not
//! a crash of the fuzzer.

use ssz::{
    proof_tree, DecodeError, EncodeError, Hash256, MultiproofError, ProofTree, Type, Value,
};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// The operations a system under test exposes to the oracle.
pub trait TargetCodec {
    fn decode(&self, bytes: &[u8], schema: &Type) -> Result<Value, DecodeError>;

    fn encode(&self, value: &Value, schema: &Type) -> Result<Vec<u8>, EncodeError>;

    fn encoded_len(&self, value: &Value, schema: &Type) -> usize;

    fn hash_tree_root(&self, value: &Value, schema: &Type) -> Result<Hash256, EncodeError>;

    fn proof_tree(&self, value: &Value, schema: &Type) -> Result<ProofTree, EncodeError>;

    fn verify_multiproof(
        &self,
        root: Hash256,
        witnesses: &[Hash256],
        leaves: &[Hash256],
        indices: &[usize],
    ) -> Result<bool, MultiproofError>;
}

/// The reference codec, exposed through the SUT boundary. Differencing the
/// reference against itself reports no findings; it also serves as the
/// honest half of injected-bug test doubles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceCodec;

impl TargetCodec for ReferenceCodec {
    fn decode(&self, bytes: &[u8], schema: &Type) -> Result<Value, DecodeError> {
        ssz::decode(bytes, schema)
    }

    fn encode(&self, value: &Value, schema: &Type) -> Result<Vec<u8>, EncodeError> {
        ssz::encode(value, schema)
    }

    fn encoded_len(&self, value: &Value, schema: &Type) -> usize {
        ssz::encoded_len(value, schema)
    }

    fn hash_tree_root(&self, value: &Value, schema: &Type) -> Result<Hash256, EncodeError> {
        ssz::hash_tree_root(value, schema)
    }

    fn proof_tree(&self, value: &Value, schema: &Type) -> Result<ProofTree, EncodeError> {
        proof_tree(value, schema)
    }

    fn verify_multiproof(
        &self,
        root: Hash256,
        witnesses: &[Hash256],
        leaves: &[Hash256],
        indices: &[usize],
    ) -> Result<bool, MultiproofError> {
        ssz::verify_multiproof(root, witnesses, leaves, indices)
    }
}

/// Runs `f`, converting a panic into `None`. The guard releases on every
/// exit path; a poisoned SUT never takes the worker down with it.
pub fn guard<T>(f: impl FnOnce() -> T) -> Option<T> {
    catch_unwind(AssertUnwindSafe(f)).ok()
}
