//! Bucketed input domains.
//!
//! Every field of a schema is partitioned, per *aspect* (its value, its
//! length, its offset word, trailing bytes, its bitlist sentinel), into
//! disjoint buckets covering the field's legal and deliberately illegal
//! value space. A sampler draws one bucket per `(field, aspect)` and then
//! samples uniformly within it, so rare canonical-form violations keep a
//! bounded probability of being exercised.

mod analyzer;
mod matrix;
mod partitions;
mod prior;

pub use analyzer::{analyze, Domain, FieldAspect};
pub use matrix::SelectionMatrix;
pub use partitions::{
    bool_buckets, byte_content_buckets, length_buckets, offset_buckets, sentinel_buckets,
    tail_buckets, uint_buckets,
};
pub use prior::{bucket_advisories, prior_weight, BucketAdvice};

use serde_derive::{Deserialize, Serialize};

/// Inclusive numeric bounds of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub min: u64,
    pub max: u64,
}

impl Range {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn point(value: u64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    pub fn contains(&self, value: u64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// What a bucket represents, used by samplers and the advisory prior to
/// recognise adversarial buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tag {
    /// A boundary point such as zero or one.
    Boundary,
    /// An ordinary interior slice of the value space.
    Content,
    /// The top of the value space; injects dirty padding into bitfields.
    High,
    /// A non-canonical scalar byte.
    Dirty,
    /// A slice of a collection's length space.
    Length,
    /// The canonical, untouched choice for an aspect.
    Canonical,
    /// A gap inserted before a variable payload.
    OffsetGap,
    /// Bytes appended past the end of the encoding.
    Tail,
    /// A bitlist with its sentinel byte forced to zero.
    NullSentinel,
    /// Recursive default sampling for composite elements.
    Default,
}

/// A disjoint subset of a field aspect's value space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub id: String,
    pub description: String,
    pub range: Range,
    pub tag: Tag,
}

impl Bucket {
    pub fn new<I: Into<String>, D: Into<String>>(id: I, description: D, range: Range, tag: Tag) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            range,
            tag,
        }
    }
}

/// A property of a field that can be bucketed independently of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Aspect {
    /// A scalar's value.
    Value,
    /// The content byte distribution of a byte-shaped field.
    ElementValue,
    /// The element count of a list or bitlist.
    Length,
    /// The contiguity of this field's offset word.
    Offset,
    /// Bytes appended after the final field's payload.
    Tail,
    /// Presence of a bitlist's sentinel bit.
    Sentinel,
    /// Recursive default for composite elements.
    Default,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn range_contains_is_inclusive() {
        let range = Range::new(2, 5);
        assert!(!range.contains(1));
        assert!(range.contains(2));
        assert!(range.contains(5));
        assert!(!range.contains(6));
    }

    #[test]
    fn buckets_serialize() {
        let bucket = Bucket::new("Zero", "Value is 0", Range::point(0), Tag::Boundary);
        let json = serde_json::to_string(&bucket).unwrap();
        let back: Bucket = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bucket);
    }
}
