//! Deterministic adversarial objects checked before any random search.
//!
//! Four constructions exercise the classic SSZ edge cases: the zero value,
//! a minimal non-zero value, a value with one list grown past its maximum,
//! and a list of containers holding an absent element. If any of them trips
//! a finding, the campaign reports a bug at step zero without sampling at
//! all.

use crate::differential::Oracle;
use crate::feedback::{BugKind, RuntimeSignature};
use crate::sut::{guard, TargetCodec};
use ssz::{Type, Value};

/// Lists longer than this are not worth materialising to prove a
/// max-violation.
const MAX_LEN_CAP: usize = 2048;

/// Runs the fixed preflight objects. Returns the accumulated signature and
/// whether any object tripped a bug.
pub fn preflight<T: TargetCodec>(oracle: &Oracle<T>, schema: &Type) -> (RuntimeSignature, bool) {
    let mut sig = RuntimeSignature::new();

    if oracle.check_object(&Value::zero(schema), schema, &mut sig) {
        return (sig, true);
    }

    if let Some(value) = nil_element_value(schema) {
        if oracle.check_object(&value, schema, &mut sig) {
            return (sig, true);
        }
    }

    if oracle.check_object(&min_value(schema), schema, &mut sig) {
        return (sig, true);
    }

    if let Some(value) = max_violation_value(schema) {
        if check_max_violation(oracle, &value, schema, &mut sig) {
            return (sig, true);
        }
    }

    (sig, false)
}

/// The minimal non-zero value: every scalar one, every collection one
/// element long, recursively.
pub fn min_value(ty: &Type) -> Value {
    match ty {
        Type::Uint8 => Value::Uint8(1),
        Type::Uint16 => Value::Uint16(1),
        Type::Uint32 => Value::Uint32(1),
        Type::Uint64 => Value::Uint64(1),
        Type::Bool => Value::Bool(true),
        Type::Vector { elem, len } => {
            Value::Vector((0..*len).map(|_| min_value(elem)).collect())
        }
        Type::List { elem, max } => {
            if *max == 0 {
                Value::List(vec![])
            } else {
                Value::List(vec![min_value(elem)])
            }
        }
        Type::Bitvector { bits } => {
            let mut bytes = vec![0; (bits + 7) / 8];
            if *bits > 0 {
                bytes[0] = 1;
            }
            Value::Bitvector(bytes)
        }
        Type::Bitlist { max_bits } => {
            if *max_bits == 0 {
                Value::Bitlist(vec![0x01])
            } else {
                // One set content bit plus the sentinel.
                Value::Bitlist(vec![0b11])
            }
        }
        Type::Container { fields, .. } => {
            Value::Container(fields.iter().map(|f| min_value(&f.ty)).collect())
        }
        Type::Union { variants } => {
            if variants.len() > 1 {
                Value::Union {
                    selector: 1,
                    value: variants[1].as_ref().map(|v| Box::new(min_value(v))),
                }
            } else {
                Value::Union {
                    selector: 0,
                    value: None,
                }
            }
        }
    }
}

/// Grows the first boundable list to `max + 1` elements, leaving every
/// other field at zero. Returns `None` when the schema has no list small
/// enough to violate.
pub fn max_violation_value(ty: &Type) -> Option<Value> {
    match ty {
        Type::List { elem, max } if *max <= MAX_LEN_CAP => Some(Value::List(
            (0..*max + 1).map(|_| Value::zero(elem)).collect(),
        )),
        Type::Bitlist { max_bits } if *max_bits <= MAX_LEN_CAP => {
            // max + 1 content bits, sentinel one past them.
            let bits = max_bits + 1;
            let mut bytes = vec![0; bits / 8 + 1];
            *bytes.last_mut().expect("sentinel byte") = 1 << (bits % 8);
            Some(Value::Bitlist(bytes))
        }
        Type::Container { fields, .. } => {
            for (i, field) in fields.iter().enumerate() {
                if let Some(violation) = max_violation_value(&field.ty) {
                    let mut values: Vec<Value> =
                        fields.iter().map(|f| Value::zero(&f.ty)).collect();
                    values[i] = violation;
                    return Some(Value::Container(values));
                }
            }
            None
        }
        _ => None,
    }
}

/// Builds a value whose first list-of-containers holds a single absent
/// element. Decoders that reach through the element without checking for
/// its presence panic here.
pub fn nil_element_value(ty: &Type) -> Option<Value> {
    match ty {
        Type::List { elem, .. } if matches!(elem.as_ref(), Type::Container { .. }) => {
            Some(Value::List(vec![Value::Null]))
        }
        Type::Container { fields, .. } => {
            for (i, field) in fields.iter().enumerate() {
                if let Some(nil) = nil_element_value(&field.ty) {
                    let mut values: Vec<Value> =
                        fields.iter().map(|f| Value::zero(&f.ty)).collect();
                    values[i] = nil;
                    return Some(Value::Container(values));
                }
            }
            None
        }
        _ => None,
    }
}

/// The max-violation object is judged by the encode boundary alone: the
/// reference must reject it, and the SUT must agree.
fn check_max_violation<T: TargetCodec>(
    oracle: &Oracle<T>,
    value: &Value,
    schema: &Type,
    sig: &mut RuntimeSignature,
) -> bool {
    let ref_bytes = ssz::encode(value, schema);
    let sut_bytes = match guard(|| oracle.sut().encode(value, schema)) {
        None => {
            sig.record_bug(BugKind::MarshalPanic);
            return true;
        }
        Some(bytes) => bytes,
    };

    match (ref_bytes, sut_bytes) {
        (Err(_), Ok(_)) => {
            sig.record_bug(BugKind::MaxLenBypass);
            true
        }
        (Ok(_), Err(_)) => {
            sig.record_bug(BugKind::MaxLenReject);
            true
        }
        (Ok(reference), Ok(sut)) if reference != sut => {
            sig.record_bug(BugKind::ReferenceMarshalMismatch);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sut::ReferenceCodec;
    use slog::{o, Logger};
    use ssz::Field;

    fn oracle() -> Oracle<ReferenceCodec> {
        Oracle::new(ReferenceCodec, Logger::root(slog::Discard, o!()))
    }

    fn state_schema() -> std::sync::Arc<Type> {
        let checkpoint = Type::container(
            "Checkpoint",
            vec![
                Field::new("epoch", Type::uint64()),
                Field::new("root", Type::root()),
            ],
        );
        Type::container(
            "MiniState",
            vec![
                Field::new("slot", Type::uint64()),
                Field::new("checkpoints", Type::list(checkpoint, 4)),
                Field::new("bits", Type::bitlist(16)),
            ],
        )
    }

    #[test]
    fn reference_passes_its_own_preflight() {
        let schema = state_schema();
        let (sig, bug) = preflight(&oracle(), &schema);
        assert!(!bug, "unexpected findings: {:?}", sig.bug_kinds);
    }

    #[test]
    fn min_value_sets_every_scalar() {
        let schema = state_schema();
        let value = min_value(&schema);
        match value {
            Value::Container(fields) => {
                assert_eq!(fields[0], Value::Uint64(1));
                match &fields[1] {
                    Value::List(items) => assert_eq!(items.len(), 1),
                    other => panic!("unexpected {:?}", other),
                }
                assert_eq!(fields[2], Value::Bitlist(vec![0b11]));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn min_value_encodes_and_round_trips() {
        let schema = state_schema();
        let value = min_value(&schema);
        let bytes = ssz::encode(&value, &schema).unwrap();
        assert_eq!(ssz::decode(&bytes, &schema).unwrap(), value);
    }

    #[test]
    fn max_violation_is_rejected_by_the_reference() {
        let schema = state_schema();
        let value = max_violation_value(&schema).unwrap();
        assert!(matches!(
            ssz::encode(&value, &schema),
            Err(ssz::EncodeError::LengthExceedsMax { len: 5, max: 4 })
        ));
    }

    #[test]
    fn nil_element_lands_in_the_container_list() {
        let schema = state_schema();
        let value = nil_element_value(&schema).unwrap();
        match value {
            Value::Container(ref fields) => {
                assert_eq!(fields[1], Value::List(vec![Value::Null]));
            }
            ref other => panic!("unexpected {:?}", other),
        }
        // The reference substitutes a zero element instead of failing.
        let bytes = ssz::encode(&value, &schema).unwrap();
        assert!(ssz::decode(&bytes, &schema).is_ok());
    }

    #[test]
    fn schemas_without_lists_have_no_violation_object() {
        let schema = Type::container(
            "Fixed",
            vec![Field::new("a", Type::uint64())],
        );
        assert!(max_violation_value(&schema).is_none());
        assert!(nil_element_value(&schema).is_none());
    }
}
