//! Turning a bucket selection into a concrete typed value.

use crate::{Mutation, MutationPlan};
use domains::{Aspect, Bucket, Domain, Range, SelectionMatrix, Tag};
use rand::Rng;
use ssz::{Type, Value};
use std::collections::BTreeMap;

/// Returned when a selection cannot be concretized.
#[derive(Debug, PartialEq, Clone)]
pub enum SampleError {
    /// The matrix names a bucket the field's aspect does not have.
    InvalidBucket {
        field: String,
        aspect: Aspect,
        bucket: String,
    },
    /// The matrix or domain list does not belong to this schema.
    SchemaMismatch(String),
}

/// Samples a typed value of `schema` according to `matrix`.
///
/// Aspects the matrix leaves unselected draw a uniform random bucket, and
/// every bucket is sampled uniformly within its range. Non-canonical offset,
/// tail and sentinel buckets leave the value untouched and instead record
/// their byte surgery in the returned plan.
pub fn concretize<R: Rng>(
    schema: &Type,
    domains: &[Domain],
    matrix: &SelectionMatrix,
    rng: &mut R,
) -> Result<(Value, MutationPlan), SampleError> {
    let mut cx = Concretizer {
        domains: domains.iter().map(|d| (d.field_path.as_str(), d)).collect(),
        matrix,
        rng,
        plan: MutationPlan::default(),
    };

    let value = match schema {
        Type::Container { fields, .. } => {
            let mut values = Vec::with_capacity(fields.len());
            for field in fields {
                values.push(cx.sample_field(&field.name, &field.ty)?);
            }
            Value::Container(values)
        }
        other => cx.sample_field("value", other)?,
    };

    Ok((value, cx.plan))
}

struct Concretizer<'a, R: Rng> {
    domains: BTreeMap<&'a str, &'a Domain>,
    matrix: &'a SelectionMatrix,
    rng: &'a mut R,
    plan: MutationPlan,
}

impl<'a, R: Rng> Concretizer<'a, R> {
    fn sample_field(&mut self, path: &str, ty: &Type) -> Result<Value, SampleError> {
        // Nested containers have no domain of their own; their fields do.
        if let Type::Container { fields, .. } = ty {
            let mut values = Vec::with_capacity(fields.len());
            for field in fields {
                let nested = format!("{}.{}", path, field.name);
                values.push(self.sample_field(&nested, &field.ty)?);
            }
            return Ok(Value::Container(values));
        }

        let domain = match self.domains.get(path) {
            Some(domain) => *domain,
            // Fields the analyzer skipped fall back to recursive defaults.
            None => return Ok(self.default_value(ty)),
        };

        let value = match ty {
            Type::Uint8 => Value::Uint8(self.sample_value_bucket(path, domain)? as u8),
            Type::Uint16 => Value::Uint16(self.sample_value_bucket(path, domain)? as u16),
            Type::Uint32 => Value::Uint32(self.sample_value_bucket(path, domain)? as u32),
            Type::Uint64 => Value::Uint64(self.sample_value_bucket(path, domain)?),
            Type::Bool => {
                let bucket = self.pick(path, Aspect::Value, domain)?;
                let byte = self.sample_range(bucket.range) as u8;
                if byte > 1 {
                    // The dirty byte is applied to the encoding, not the value.
                    self.plan.push(Mutation::OverwriteFixed {
                        field: path.to_string(),
                        byte,
                    });
                    Value::Bool(false)
                } else {
                    Value::Bool(byte == 1)
                }
            }
            Type::Bitvector { bits } => {
                let bucket = self.pick(path, Aspect::ElementValue, domain)?;
                let range = bucket.range;
                let bytes = (0..(bits + 7) / 8)
                    .map(|_| self.sample_range(range) as u8)
                    .collect();
                Value::Bitvector(bytes)
            }
            Type::Vector { elem, len } => match elem.as_ref() {
                Type::Uint8 => {
                    let bucket = self.pick(path, Aspect::ElementValue, domain)?;
                    let range = bucket.range;
                    Value::Vector(
                        (0..*len)
                            .map(|_| Value::Uint8(self.sample_range(range) as u8))
                            .collect(),
                    )
                }
                _ => Value::Vector((0..*len).map(|_| self.default_value(elem)).collect()),
            },
            Type::List { elem, max } => {
                let bucket = self.pick(path, Aspect::Length, domain)?;
                let len = (self.sample_range(bucket.range) as usize).min(*max);
                self.sample_offset(path, domain)?;
                match elem.as_ref() {
                    Type::Uint8 => {
                        let bucket = self.pick(path, Aspect::ElementValue, domain)?;
                        let range = bucket.range;
                        Value::List(
                            (0..len)
                                .map(|_| Value::Uint8(self.sample_range(range) as u8))
                                .collect(),
                        )
                    }
                    _ => Value::List((0..len).map(|_| self.default_value(elem)).collect()),
                }
            }
            Type::Bitlist { max_bits } => {
                let bucket = self.pick(path, Aspect::Length, domain)?;
                let max_bytes = (max_bits + 7) / 8;
                let len = (self.sample_range(bucket.range) as usize).min(max_bytes);
                self.sample_offset(path, domain)?;
                let value = if len == 0 {
                    Value::Bitlist(vec![0x01])
                } else {
                    let content = self.pick(path, Aspect::ElementValue, domain)?;
                    let range = content.range;
                    let mut bytes: Vec<u8> = (0..len)
                        .map(|_| self.sample_range(range) as u8)
                        .collect();
                    let cap = (*max_bits - 8 * (len - 1)).min(7) as u32;
                    let sentinel = self.rng.gen_range(0..=cap) as u8;
                    let last = bytes.last_mut().expect("len is non-zero");
                    *last &= (1u8 << sentinel).wrapping_sub(1);
                    *last |= 1 << sentinel;
                    Value::Bitlist(bytes)
                };
                let sentinel = self.pick(path, Aspect::Sentinel, domain)?;
                if sentinel.tag == Tag::NullSentinel {
                    self.plan.push(Mutation::NullSentinel {
                        field: path.to_string(),
                    });
                }
                value
            }
            Type::Container { .. } => unreachable!("containers recurse before domain lookup"),
            Type::Union { variants } => self.default_union(variants),
        };

        if let Some(tail) = domain.aspect(Aspect::Tail) {
            let bucket = self.pick_from(path, Aspect::Tail, &tail.buckets)?;
            let len = self.sample_range(bucket.range) as usize;
            if len > 0 {
                self.plan.push(Mutation::Tail { len });
            }
        }

        Ok(value)
    }

    fn sample_value_bucket(&mut self, path: &str, domain: &Domain) -> Result<u64, SampleError> {
        let bucket = self.pick(path, Aspect::Value, domain)?;
        Ok(self.sample_range(bucket.range))
    }

    fn sample_offset(&mut self, path: &str, domain: &Domain) -> Result<(), SampleError> {
        if domain.aspect(Aspect::Offset).is_none() {
            return Ok(());
        }
        let bucket = self.pick(path, Aspect::Offset, domain)?;
        if bucket.tag == Tag::OffsetGap {
            let size = self.sample_range(bucket.range) as usize;
            if size > 0 {
                self.plan.push(Mutation::Gap { size });
            }
        }
        Ok(())
    }

    fn pick<'d>(
        &mut self,
        path: &str,
        aspect: Aspect,
        domain: &'d Domain,
    ) -> Result<&'d Bucket, SampleError> {
        let field_aspect = domain
            .aspect(aspect)
            .ok_or_else(|| SampleError::SchemaMismatch(path.to_string()))?;
        self.pick_from(path, aspect, &field_aspect.buckets)
    }

    fn pick_from<'d>(
        &mut self,
        path: &str,
        aspect: Aspect,
        buckets: &'d [Bucket],
    ) -> Result<&'d Bucket, SampleError> {
        if let Some(id) = self.matrix.get(path, aspect) {
            buckets
                .iter()
                .find(|b| b.id == id)
                .ok_or_else(|| SampleError::InvalidBucket {
                    field: path.to_string(),
                    aspect,
                    bucket: id.to_string(),
                })
        } else {
            Ok(&buckets[self.rng.gen_range(0..buckets.len())])
        }
    }

    fn sample_range(&mut self, range: Range) -> u64 {
        if range.min == range.max {
            range.min
        } else {
            self.rng.gen_range(range.min..=range.max)
        }
    }

    /// Populates composite elements the matrix has no entries for: small
    /// random lengths, full-range bytes, canonical bitfields.
    fn default_value(&mut self, ty: &Type) -> Value {
        match ty {
            Type::Uint8 => Value::Uint8(self.rng.gen_range(0..=100)),
            Type::Uint16 => Value::Uint16(self.rng.gen_range(0..=100)),
            Type::Uint32 => Value::Uint32(self.rng.gen_range(0..=100)),
            Type::Uint64 => Value::Uint64(self.rng.gen_range(0..=100)),
            Type::Bool => Value::Bool(self.rng.gen()),
            Type::Vector { elem, len } => {
                Value::Vector((0..*len).map(|_| self.default_elem(elem)).collect())
            }
            Type::List { elem, max } => {
                let len = self.rng.gen_range(0..=4.min(*max));
                Value::List((0..len).map(|_| self.default_elem(elem)).collect())
            }
            Type::Bitvector { bits } => {
                let mut bytes: Vec<u8> = (0..(bits + 7) / 8).map(|_| self.rng.gen()).collect();
                ssz::clear_padding_bits(&mut bytes, *bits);
                Value::Bitvector(bytes)
            }
            Type::Bitlist { max_bits } => {
                let bits = self.rng.gen_range(0..=(*max_bits).min(16));
                let mut bytes = vec![0u8; bits / 8 + 1];
                for byte in bytes.iter_mut() {
                    *byte = self.rng.gen();
                }
                let last = bytes.last_mut().expect("at least the sentinel byte");
                *last &= (1u8 << (bits % 8)).wrapping_sub(1);
                *last |= 1 << (bits % 8);
                Value::Bitlist(bytes)
            }
            Type::Container { fields, .. } => {
                Value::Container(fields.iter().map(|f| self.default_value(&f.ty)).collect())
            }
            Type::Union { variants } => self.default_union(variants),
        }
    }

    fn default_elem(&mut self, elem: &Type) -> Value {
        match elem {
            Type::Uint8 => Value::Uint8(self.rng.gen()),
            other => self.default_value(other),
        }
    }

    fn default_union(&mut self, variants: &[Option<std::sync::Arc<Type>>]) -> Value {
        let selector = self.rng.gen_range(0..variants.len()) as u8;
        let value = variants[selector as usize]
            .as_ref()
            .map(|ty| Box::new(self.default_value(ty)));
        Value::Union { selector, value }
    }
}
