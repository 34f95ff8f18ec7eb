//! Byte-level mutations that no canonical encoder can produce.
//!
//! The mutator edits serialized bytes directly and never touches the typed
//! value: offsets are rewritten in place, payload bytes are zeroed where
//! they lie, and tails are appended verbatim.

use crate::{Mutation, MutationPlan};
use rand::Rng;
use ssz::{read_offset, Type, BYTES_PER_LENGTH_OFFSET};

/// Applies `plan` to canonical `bytes` of `schema`.
///
/// At most one gap is inserted per encoding; any further gap entries in the
/// plan are ignored. Mutations that cannot be located in this schema (a
/// sentinel fault naming a fixed field, an overwrite of a variable field)
/// are skipped rather than guessed at.
pub fn mutate<R: Rng>(
    bytes: &[u8],
    plan: &MutationPlan,
    schema: &Type,
    rng: &mut R,
) -> Vec<u8> {
    let mut mutated = bytes.to_vec();
    let mut gap_applied = false;

    for mutation in &plan.mutations {
        match mutation {
            Mutation::OverwriteFixed { field, byte } => {
                if let Some(offset) = fixed_offset_of(schema, field) {
                    if offset < mutated.len() {
                        mutated[offset] = *byte;
                    }
                }
            }
            Mutation::NullSentinel { field } => {
                if let Some((_, end)) = variable_payload_span(schema, field, &mutated) {
                    if end > 0 && end <= mutated.len() {
                        mutated[end - 1] = 0;
                    }
                }
            }
            Mutation::Gap { size } => {
                if gap_applied {
                    continue;
                }
                if let Some(first) = first_variable_payload_offset(schema, &mutated) {
                    insert_gap(&mut mutated, schema, first, *size, rng);
                    gap_applied = true;
                }
            }
            Mutation::Tail { len } => {
                let mut tail = vec![0u8; *len];
                rng.fill(tail.as_mut_slice());
                mutated.extend_from_slice(&tail);
            }
        }
    }

    mutated
}

/// Positions of one container's fields in its fixed section.
struct FieldSlot {
    name: String,
    fixed_offset: usize,
    variable: bool,
}

fn field_slots(fields: &[ssz::Field]) -> Vec<FieldSlot> {
    let mut slots = Vec::with_capacity(fields.len());
    let mut offset = 0;
    for field in fields {
        slots.push(FieldSlot {
            name: field.name.clone(),
            fixed_offset: offset,
            variable: !field.ty.is_fixed_len(),
        });
        offset += field.ty.fixed_portion_len();
    }
    slots
}

fn container_fields(ty: &Type) -> Option<&[ssz::Field]> {
    match ty {
        Type::Container { fields, .. } => Some(fields),
        _ => None,
    }
}

/// The byte offset of a (possibly nested) fixed-size field inside the fixed
/// section, or `None` when the path crosses a variable-size boundary.
pub fn fixed_offset_of(schema: &Type, path: &str) -> Option<usize> {
    let mut ty = schema;
    let mut base = 0;
    for segment in path.split('.') {
        let fields = match ty {
            Type::Container { fields, .. } => fields,
            _ => return None,
        };
        let mut offset = 0;
        let mut found = None;
        for field in fields {
            if field.name == segment {
                found = Some(field);
                break;
            }
            offset += field.ty.fixed_portion_len();
        }
        let field = found?;
        if !field.ty.is_fixed_len() {
            return None;
        }
        base += offset;
        ty = &field.ty;
    }
    Some(base)
}

/// The payload span `[start, end)` of a (possibly nested) variable field,
/// derived from the encoded offset tables. Offset words are relative to the
/// start of their own container, so each path segment rebases the span
/// before descending; paths ending on a fixed-size field resolve to `None`.
fn variable_payload_span(schema: &Type, path: &str, bytes: &[u8]) -> Option<(usize, usize)> {
    let mut ty = schema;
    let mut start = 0;
    let mut end = bytes.len();

    for segment in path.split('.') {
        let fields = container_fields(ty)?;
        let slots = field_slots(fields);
        let target = slots.iter().position(|s| s.name == segment)?;
        let container = bytes.get(start..end)?;

        if let Some(len) = fields[target].ty.fixed_len() {
            let field_start = slots[target].fixed_offset;
            if field_start + len > container.len() {
                return None;
            }
            end = start + field_start + len;
            start += field_start;
        } else {
            let field_start = read_offset(container.get(slots[target].fixed_offset..)?).ok()?;
            let field_end = slots
                .iter()
                .skip(target + 1)
                .find(|s| s.variable)
                .and_then(|s| read_offset(container.get(s.fixed_offset..)?).ok())
                .unwrap_or(container.len());
            if field_start > field_end || field_end > container.len() {
                return None;
            }
            end = start + field_end;
            start += field_start;
        }
        ty = &fields[target].ty;
    }

    (!ty.is_fixed_len()).then_some((start, end))
}

/// The encoded offset of the first top-level variable payload, read from
/// the buffer.
fn first_variable_payload_offset(schema: &Type, bytes: &[u8]) -> Option<usize> {
    let slots = field_slots(container_fields(schema)?);
    let first = slots.iter().find(|s| s.variable)?;
    let offset = read_offset(bytes.get(first.fixed_offset..)?).ok()?;
    (offset <= bytes.len()).then_some(offset)
}

/// Inserts `size` random bytes at `position` and shifts every top-level
/// offset word by `size`.
fn insert_gap<R: Rng>(bytes: &mut Vec<u8>, schema: &Type, position: usize, size: usize, rng: &mut R) {
    let fields = match container_fields(schema) {
        Some(fields) => fields,
        None => return,
    };
    let mut gap = vec![0u8; size];
    rng.fill(gap.as_mut_slice());
    bytes.splice(position..position, gap);

    for slot in field_slots(fields) {
        if !slot.variable {
            continue;
        }
        let word = slot.fixed_offset;
        if word + BYTES_PER_LENGTH_OFFSET > bytes.len() {
            continue;
        }
        if let Ok(old) = read_offset(&bytes[word..]) {
            let new = (old + size) as u32;
            bytes[word..word + BYTES_PER_LENGTH_OFFSET].copy_from_slice(&new.to_le_bytes());
        }
    }
}
