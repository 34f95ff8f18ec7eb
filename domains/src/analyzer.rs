//! Schema analysis: turning a `Type` tree into per-field input domains.
//!
//! Each field of the schema yields one [`Domain`] keyed by its dotted field
//! path. Fixed-size fields carry only a value aspect; variable-size fields
//! additionally carry length and offset aspects; bitlists carry a sentinel
//! aspect; the last top-level field carries the tail aspect for the whole
//! encoding.

use crate::partitions::{
    bool_buckets, byte_content_buckets, length_buckets, offset_buckets, sentinel_buckets,
    tail_buckets, uint_buckets,
};
use crate::{Aspect, Bucket, Range, Tag};
use serde_derive::{Deserialize, Serialize};
use ssz::Type;

/// The buckets of one aspect of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAspect {
    pub aspect: Aspect,
    pub description: String,
    pub buckets: Vec<Bucket>,
}

/// All configurable aspects of a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub field_path: String,
    pub type_desc: String,
    pub aspects: Vec<FieldAspect>,
}

impl Domain {
    pub fn aspect(&self, aspect: Aspect) -> Option<&FieldAspect> {
        self.aspects.iter().find(|a| a.aspect == aspect)
    }
}

/// Analyzes `schema`, returning one domain per field path.
///
/// The offset-gap bound for every variable field is derived from the whole
/// schema: its fixed-section size plus the total maximum variable payload
/// size, capped to keep gap sampling tractable.
pub fn analyze(schema: &Type) -> Vec<Domain> {
    const OMAX_CAP: usize = 4096;

    let omax = schema
        .max_encoded_len()
        .min(OMAX_CAP)
        .max(1) as u64;

    let mut domains = Vec::new();
    match schema {
        Type::Container { fields, .. } => {
            for field in fields {
                analyze_field(&field.name, &field.ty, omax, &mut domains);
            }
        }
        other => analyze_field("value", other, omax, &mut domains),
    }

    if let Some(last) = domains.last_mut() {
        last.aspects.push(FieldAspect {
            aspect: Aspect::Tail,
            description: "Trailing bytes after the final payload".into(),
            buckets: tail_buckets(),
        });
    }

    domains
}

fn analyze_field(path: &str, ty: &Type, omax: u64, domains: &mut Vec<Domain>) {
    let mut aspects = Vec::new();

    match ty {
        Type::Uint8 => aspects.push(value_aspect(uint_buckets(8))),
        Type::Uint16 => aspects.push(value_aspect(uint_buckets(16))),
        Type::Uint32 => aspects.push(value_aspect(uint_buckets(32))),
        Type::Uint64 => aspects.push(value_aspect(uint_buckets(64))),
        Type::Bool => aspects.push(value_aspect(bool_buckets())),
        Type::Bitvector { .. } => aspects.push(element_aspect()),
        Type::Vector { elem, .. } => match elem.as_ref() {
            Type::Uint8 => aspects.push(element_aspect()),
            _ => aspects.push(default_aspect()),
        },
        Type::List { elem, max } => {
            aspects.push(length_aspect(*max as u64));
            aspects.push(offset_aspect(omax));
            match elem.as_ref() {
                Type::Uint8 => aspects.push(element_aspect()),
                _ => aspects.push(default_aspect()),
            }
        }
        Type::Bitlist { max_bits } => {
            // The length domain of a bitlist is its byte length.
            aspects.push(length_aspect(((max_bits + 7) / 8) as u64));
            aspects.push(offset_aspect(omax));
            aspects.push(element_aspect());
            aspects.push(FieldAspect {
                aspect: Aspect::Sentinel,
                description: "Sentinel bit handling".into(),
                buckets: sentinel_buckets(),
            });
        }
        Type::Container { fields, .. } => {
            for field in fields {
                let nested = format!("{}.{}", path, field.name);
                analyze_field(&nested, &field.ty, omax, domains);
            }
            return;
        }
        Type::Union { .. } => aspects.push(default_aspect()),
    }

    domains.push(Domain {
        field_path: path.to_string(),
        type_desc: ty.describe(),
        aspects,
    });
}

fn value_aspect(buckets: Vec<Bucket>) -> FieldAspect {
    FieldAspect {
        aspect: Aspect::Value,
        description: "Scalar value".into(),
        buckets,
    }
}

fn element_aspect() -> FieldAspect {
    FieldAspect {
        aspect: Aspect::ElementValue,
        description: "Content byte distribution".into(),
        buckets: byte_content_buckets(),
    }
}

fn length_aspect(max: u64) -> FieldAspect {
    FieldAspect {
        aspect: Aspect::Length,
        description: "Element count".into(),
        buckets: length_buckets(max),
    }
}

fn offset_aspect(omax: u64) -> FieldAspect {
    FieldAspect {
        aspect: Aspect::Offset,
        description: "Offset word contiguity".into(),
        buckets: offset_buckets(omax),
    }
}

fn default_aspect() -> FieldAspect {
    FieldAspect {
        aspect: Aspect::Default,
        description: "Recursive default".into(),
        buckets: vec![Bucket::new(
            "Default",
            "Recursive default",
            Range::point(0),
            Tag::Default,
        )],
    }
}
