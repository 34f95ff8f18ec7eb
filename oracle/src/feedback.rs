//! The compact signature an oracle invocation reports back to its driver.

use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a system under test violated a canonical-form invariant. A closed
/// set; drivers and tests assert on these tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BugKind {
    /// The SUT's decoder panicked on raw input.
    Panic,
    /// The SUT's encoder panicked.
    MarshalPanic,
    /// The SUT's hasher panicked.
    HashTreeRootPanic,
    /// The SUT's proof machinery panicked.
    ProofPanic,
    /// The SUT's size computation panicked.
    SizeSszPanic,
    /// The SUT rejected input the reference accepts, or round-tripped input
    /// the reference rejects.
    ReferenceDecodeError,
    /// The SUT failed to encode a value the reference encodes.
    ReferenceMarshalError,
    /// The SUT's encoding differs from the reference encoding.
    ReferenceMarshalMismatch,
    /// The SUT failed to hash a value the reference hashes.
    ReferenceHtrError,
    /// The SUT's hash tree root differs from the reference root.
    ReferenceHtrMismatch,
    /// A lossy round-trip traced to dirty bitvector padding.
    BitvectorDirtyPadding,
    /// A lossy round-trip traced to a sentinel-free bitlist.
    NullBitlist,
    /// The SUT accepted trailing bytes past the natural end of the value.
    TrailingBytes,
    /// Trailing bytes accepted after a union's `None` variant.
    UnionTrailing,
    /// Decode-encode round trip changed the bytes for another reason.
    RoundTripMismatch,
    /// Accepted non-canonical input hashed differently after normalising.
    SemanticMismatch,
    /// The SUT's proof tree root disagrees with the reference root.
    ProofTreeMismatch,
    /// The SUT failed to build a proof tree for a hashable value.
    ProofTreeError,
    /// The SUT failed to extract a multiproof from its own tree.
    MultiproofError,
    /// A SUT-built multiproof fails reference verification.
    MultiproofInvalid,
    /// SUT and reference verifiers disagree on a proof's validity.
    MultiproofVerifyMismatch,
    /// The SUT encoded a list past its declared maximum.
    MaxLenBypass,
    /// The SUT rejected a value within its declared maximum.
    MaxLenReject,
    /// The external oracle rejected bytes the reference produced.
    ExternalDecodeError,
    /// The external oracle's canonical form differs from the input.
    ExternalRoundTripMismatch,
    /// The external oracle's root differs from the reference root.
    ExternalHtrMismatch,
}

/// A compact representation of one oracle invocation's outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeSignature {
    /// Inputs that decoded, re-encoded and hashed without any finding.
    pub roundtrip_success_count: u64,
    /// Inputs both the SUT and the reference reject; not bugs.
    pub non_bug_error_count: u64,
    /// Inputs that triggered a bug classification.
    pub bug_found_count: u64,
    /// Observations per bug kind.
    pub bug_kinds: BTreeMap<BugKind, u64>,
}

impl RuntimeSignature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one observation of `kind`.
    pub fn record_bug(&mut self, kind: BugKind) {
        self.bug_found_count += 1;
        *self.bug_kinds.entry(kind).or_insert(0) += 1;
    }

    pub fn has_bug(&self) -> bool {
        self.bug_found_count > 0
    }

    /// Folds another signature into this one.
    pub fn merge(&mut self, other: &RuntimeSignature) {
        self.roundtrip_success_count += other.roundtrip_success_count;
        self.non_bug_error_count += other.non_bug_error_count;
        self.bug_found_count += other.bug_found_count;
        for (kind, count) in &other.bug_kinds {
            *self.bug_kinds.entry(*kind).or_insert(0) += count;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn record_updates_both_count_and_kind() {
        let mut sig = RuntimeSignature::new();
        sig.record_bug(BugKind::TrailingBytes);
        sig.record_bug(BugKind::TrailingBytes);
        sig.record_bug(BugKind::Panic);

        assert_eq!(sig.bug_found_count, 3);
        assert_eq!(sig.bug_kinds[&BugKind::TrailingBytes], 2);
        assert_eq!(sig.bug_kinds[&BugKind::Panic], 1);
        assert!(sig.has_bug());
    }

    #[test]
    fn merge_accumulates() {
        let mut a = RuntimeSignature::new();
        a.roundtrip_success_count = 2;
        a.record_bug(BugKind::SemanticMismatch);

        let mut b = RuntimeSignature::new();
        b.non_bug_error_count = 1;
        b.record_bug(BugKind::SemanticMismatch);

        a.merge(&b);
        assert_eq!(a.roundtrip_success_count, 2);
        assert_eq!(a.non_bug_error_count, 1);
        assert_eq!(a.bug_kinds[&BugKind::SemanticMismatch], 2);
    }
}
