//! The differential pipeline: drive the SUT, compare against the reference,
//! classify.

use crate::bridge::ExternalOracle;
use crate::feedback::{BugKind, RuntimeSignature};
use crate::sut::{guard, TargetCodec};
use slog::{debug, info, Logger};
use ssz::{select_proof_gindices, DecodeError, Type, Value};

/// A differential oracle for one system under test.
///
/// Holds no mutable state of its own; each [`Oracle::execute`] call is an
/// independent experiment, so one oracle can serve a whole campaign.
pub struct Oracle<T: TargetCodec> {
    sut: T,
    external: Option<Box<dyn ExternalOracle>>,
    external_schema: String,
    log: Logger,
}

impl<T: TargetCodec> Oracle<T> {
    pub fn new(sut: T, log: Logger) -> Self {
        Self {
            sut,
            external: None,
            external_schema: String::new(),
            log,
        }
    }

    /// Attaches a cross-language oracle consulted on every structured
    /// execution. `schema_id` is the schema name the external side knows.
    pub fn with_external(mut self, external: Box<dyn ExternalOracle>, schema_id: &str) -> Self {
        self.external = Some(external);
        self.external_schema = schema_id.to_string();
        self
    }

    pub fn sut(&self) -> &T {
        &self.sut
    }

    /// Runs the decode → re-encode → re-hash pipeline on raw bytes.
    ///
    /// Classification short-circuits on the first finding. Inputs both the
    /// SUT and the reference reject are counted as non-bugs; any decode
    /// disagreement between the two is classified immediately, before the
    /// SUT's re-encode can disguise what was accepted.
    pub fn execute(&self, bytes: &[u8], schema: &Type) -> RuntimeSignature {
        let mut sig = RuntimeSignature::new();

        // SUT decode, under the panic guard.
        let decoded = match guard(|| self.sut.decode(bytes, schema)) {
            None => {
                self.report(&mut sig, BugKind::Panic, bytes.len());
                return sig;
            }
            Some(result) => result,
        };
        let reference = ssz::decode(bytes, schema);

        let value = match (decoded, &reference) {
            // Both reject: malformed input, not a bug.
            (Err(_), Err(_)) => {
                sig.non_bug_error_count += 1;
                return sig;
            }
            // The SUT rejects canonical input.
            (Err(sut_err), Ok(_)) => {
                debug!(self.log, "SUT rejected canonical input"; "error" => ?sut_err);
                self.report(&mut sig, BugKind::ReferenceDecodeError, bytes.len());
                return sig;
            }
            (Ok(value), _) => value,
        };

        // The SUT accepted input the reference rejects: a decode
        // disagreement, classified by what the reference saw and regardless
        // of how the re-encode would compare.
        if let Err(ref_err) = &reference {
            let kind = self.classify_reference_rejection(ref_err);
            self.report(&mut sig, kind, bytes.len());
            return sig;
        }

        // Re-encode and compare bytes.
        let reencoded = match guard(|| self.sut.encode(&value, schema)) {
            None => {
                self.report(&mut sig, BugKind::MarshalPanic, bytes.len());
                return sig;
            }
            Some(Err(_)) => {
                sig.non_bug_error_count += 1;
                return sig;
            }
            Some(Ok(bytes)) => bytes,
        };

        if reencoded != bytes {
            let kind = self.classify_roundtrip(bytes, &reencoded, &value, schema);
            self.report(&mut sig, kind, bytes.len());
            return sig;
        }

        // Re-decode the (identical) encoding and compare its root against
        // the canonicalised original.
        let redecoded = match guard(|| self.sut.decode(&reencoded, schema)) {
            None => {
                self.report(&mut sig, BugKind::Panic, bytes.len());
                return sig;
            }
            Some(Err(_)) => {
                sig.non_bug_error_count += 1;
                return sig;
            }
            Some(Ok(value)) => value,
        };
        let reencoded_root = match guard(|| self.sut.hash_tree_root(&redecoded, schema)) {
            None => {
                self.report(&mut sig, BugKind::HashTreeRootPanic, bytes.len());
                return sig;
            }
            Some(Err(_)) => {
                sig.non_bug_error_count += 1;
                return sig;
            }
            Some(Ok(root)) => root,
        };
        let canonical = value.canonicalize(schema);
        let canonical_root = match ssz::hash_tree_root(&canonical, schema) {
            Ok(root) => root,
            Err(_) => {
                sig.non_bug_error_count += 1;
                return sig;
            }
        };
        if canonical_root != reencoded_root {
            self.report(&mut sig, BugKind::SemanticMismatch, bytes.len());
            return sig;
        }

        // Cross-check encode, hash and proofs against the reference.
        if self.check_object(&value, schema, &mut sig) {
            return sig;
        }

        sig.roundtrip_success_count += 1;
        sig
    }

    /// Runs [`Oracle::execute`] plus the object-level reference checks on
    /// the structured value that produced `bytes` before mutation, and the
    /// external oracle when one is attached.
    pub fn execute_with_value(
        &self,
        bytes: &[u8],
        schema: &Type,
        original: Option<&Value>,
    ) -> RuntimeSignature {
        let mut sig = self.execute(bytes, schema);
        let original = match original {
            Some(value) => value,
            None => return sig,
        };

        self.check_object(original, schema, &mut sig);
        self.check_external(bytes, original, schema, &mut sig);
        sig
    }

    /// Classifies the reference's rejection of SUT-accepted input. The
    /// canonical-form violations with their own tags keep them; everything
    /// else is a plain decode disagreement.
    fn classify_reference_rejection(&self, err: &DecodeError) -> BugKind {
        match err {
            DecodeError::BitvectorDirtyPadding => BugKind::BitvectorDirtyPadding,
            DecodeError::BitlistMissingSentinel => BugKind::NullBitlist,
            DecodeError::UnionTrailing { .. } => BugKind::UnionTrailing,
            DecodeError::TrailingBytes { .. } => BugKind::TrailingBytes,
            _ => BugKind::ReferenceDecodeError,
        }
    }

    /// Classifies a byte-level round-trip mismatch, most specific rule
    /// first.
    fn classify_roundtrip(
        &self,
        bytes: &[u8],
        reencoded: &[u8],
        value: &Value,
        schema: &Type,
    ) -> BugKind {
        if value.has_dirty_padding(schema) {
            BugKind::BitvectorDirtyPadding
        } else if value.has_null_bitlist(schema) {
            BugKind::NullBitlist
        } else if bytes.len() > reencoded.len() && bytes.starts_with(reencoded) {
            if value.has_none_union(schema) {
                BugKind::UnionTrailing
            } else {
                BugKind::TrailingBytes
            }
        } else {
            BugKind::RoundTripMismatch
        }
    }

    /// Object-level cross-checks: size, encode, hash tree root and
    /// multiproofs, each compared against the reference codec. Returns
    /// `true` when a bug was recorded.
    pub fn check_object(&self, value: &Value, schema: &Type, sig: &mut RuntimeSignature) -> bool {
        let mut bug = false;

        if guard(|| self.sut.encoded_len(value, schema)).is_none() {
            sig.record_bug(BugKind::SizeSszPanic);
            bug = true;
        }

        let ref_bytes = ssz::encode(value, schema);
        match guard(|| self.sut.encode(value, schema)) {
            None => {
                sig.record_bug(BugKind::MarshalPanic);
                bug = true;
            }
            Some(sut_bytes) => match (&ref_bytes, sut_bytes) {
                (Ok(_), Err(_)) => {
                    sig.record_bug(BugKind::ReferenceMarshalError);
                    bug = true;
                }
                (Ok(reference), Ok(sut)) if *reference != sut => {
                    sig.record_bug(BugKind::ReferenceMarshalMismatch);
                    bug = true;
                }
                (Err(_), Ok(_)) => sig.non_bug_error_count += 1,
                _ => {}
            },
        }

        let ref_root = ssz::hash_tree_root(value, schema);
        match guard(|| self.sut.hash_tree_root(value, schema)) {
            None => {
                sig.record_bug(BugKind::HashTreeRootPanic);
                bug = true;
            }
            Some(sut_root) => match (&ref_root, sut_root) {
                (Ok(_), Err(_)) => {
                    sig.record_bug(BugKind::ReferenceHtrError);
                    bug = true;
                }
                (Ok(reference), Ok(sut)) if *reference != sut => {
                    sig.record_bug(BugKind::ReferenceHtrMismatch);
                    bug = true;
                }
                (Err(_), Ok(_)) => sig.non_bug_error_count += 1,
                _ => {}
            },
        }

        let ref_root = match ref_root {
            Ok(root) => root,
            Err(_) => return bug,
        };

        if self.check_proofs(value, schema, ref_root, sig) {
            bug = true;
        }

        bug
    }

    fn check_proofs(
        &self,
        value: &Value,
        schema: &Type,
        ref_root: ssz::Hash256,
        sig: &mut RuntimeSignature,
    ) -> bool {
        let tree = match guard(|| self.sut.proof_tree(value, schema)) {
            None => {
                sig.record_bug(BugKind::ProofPanic);
                return true;
            }
            Some(Err(_)) => {
                // Hashable but unprovable is a finding only when the
                // reference disagrees.
                if ssz::proof_tree(value, schema).is_ok() {
                    sig.record_bug(BugKind::ProofTreeError);
                    return true;
                }
                return false;
            }
            Some(Ok(tree)) => tree,
        };

        if tree.root() != ref_root {
            sig.record_bug(BugKind::ProofTreeMismatch);
            return true;
        }

        let indices = select_proof_gindices(&tree, 2);
        let proof = match tree.prove_multi(&indices) {
            Ok(proof) => proof,
            Err(_) => {
                sig.record_bug(BugKind::MultiproofError);
                return true;
            }
        };

        match ssz::verify_multiproof(ref_root, &proof.witnesses, &proof.leaves, &proof.indices) {
            Err(_) => {
                sig.non_bug_error_count += 1;
                false
            }
            Ok(false) => {
                sig.record_bug(BugKind::MultiproofInvalid);
                true
            }
            Ok(true) => {
                let sut_verdict = guard(|| {
                    self.sut.verify_multiproof(
                        ref_root,
                        &proof.witnesses,
                        &proof.leaves,
                        &proof.indices,
                    )
                });
                match sut_verdict {
                    None => {
                        sig.record_bug(BugKind::ProofPanic);
                        true
                    }
                    Some(Ok(true)) => false,
                    Some(_) => {
                        sig.record_bug(BugKind::MultiproofVerifyMismatch);
                        true
                    }
                }
            }
        }
    }

    fn check_external(
        &self,
        bytes: &[u8],
        original: &Value,
        schema: &Type,
        sig: &mut RuntimeSignature,
    ) {
        let external = match &self.external {
            Some(external) => external,
            None => return,
        };
        let ref_bytes = match ssz::encode(original, schema) {
            Ok(bytes) => bytes,
            Err(_) => return,
        };
        let ref_root = ssz::hash_tree_root(original, schema);

        match external.decode(&self.external_schema, bytes) {
            Err(err) => {
                if bytes == ref_bytes.as_slice() {
                    debug!(self.log, "external oracle rejected canonical bytes"; "error" => %err);
                    sig.record_bug(BugKind::ExternalDecodeError);
                }
            }
            Ok(result) => {
                if result.canonical != bytes {
                    sig.record_bug(BugKind::ExternalRoundTripMismatch);
                }
                if let Ok(ref_root) = ref_root {
                    if bytes == ref_bytes.as_slice() && result.root != ref_root {
                        sig.record_bug(BugKind::ExternalHtrMismatch);
                    }
                }
            }
        }
    }

    fn report(&self, sig: &mut RuntimeSignature, kind: BugKind, input_len: usize) {
        sig.record_bug(kind);
        info!(self.log, "Bug classified"; "kind" => ?kind, "input_len" => input_len);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sut::ReferenceCodec;
    use slog::o;
    use ssz::{encode, Field};

    fn oracle() -> Oracle<ReferenceCodec> {
        Oracle::new(ReferenceCodec, Logger::root(slog::Discard, o!()))
    }

    fn gap_schema() -> std::sync::Arc<Type> {
        Type::container(
            "GapStruct",
            vec![Field::new("data", Type::list(Type::uint8(), 1024))],
        )
    }

    #[test]
    fn canonical_input_is_a_clean_roundtrip() {
        let schema = gap_schema();
        let value = Value::Container(vec![Value::List(vec![Value::Uint8(7); 3])]);
        let bytes = encode(&value, &schema).unwrap();

        let sig = oracle().execute_with_value(&bytes, &schema, Some(&value));
        assert_eq!(sig.roundtrip_success_count, 1);
        assert_eq!(sig.bug_found_count, 0);
        assert_eq!(sig.non_bug_error_count, 0);
    }

    #[test]
    fn rejected_input_is_not_a_bug() {
        let schema = gap_schema();
        // First offset skips a byte.
        let bytes = [5, 0, 0, 0, 0, 0, 0, 0];

        let sig = oracle().execute(&bytes, &schema);
        assert_eq!(sig.non_bug_error_count, 1);
        assert_eq!(sig.bug_found_count, 0);
    }

    #[test]
    fn reference_against_itself_never_disagrees() {
        let schema = gap_schema();
        let value = Value::Container(vec![Value::List(vec![])]);
        let mut sig = RuntimeSignature::new();
        assert!(!oracle().check_object(&value, &schema, &mut sig));
        assert_eq!(sig.bug_found_count, 0);
    }
}
