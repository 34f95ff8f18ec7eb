//! Advisory prior weights over buckets.
//!
//! The external bucket selector may seed its exploration with these weights;
//! the oracle's correctness never depends on them. Buckets that can only be
//! reached through a canonical-form violation weigh the most.

use crate::{Aspect, Bucket, Domain, Tag};
use serde_derive::{Deserialize, Serialize};

/// One row of the bucket advisory list handed to the host sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketAdvice {
    pub field_path: String,
    pub aspect: Aspect,
    pub bucket_id: String,
    pub tag: Tag,
    pub prior_weight: f64,
}

/// The advisory weight of a single bucket.
pub fn prior_weight(aspect: Aspect, bucket: &Bucket) -> f64 {
    let mut weight = match bucket.tag {
        Tag::NullSentinel => 5.0,
        Tag::Dirty => 4.0,
        Tag::OffsetGap => 3.5,
        Tag::Tail => 3.0,
        Tag::High => 2.5,
        Tag::Boundary => 2.0,
        _ => 1.0,
    };
    // Empty collections reach the degenerate encodings most codecs get wrong.
    if aspect == Aspect::Length && bucket.range.max == 0 {
        weight += 1.0;
    }
    weight
}

/// Flattens `domains` into the ordered advisory list.
pub fn bucket_advisories(domains: &[Domain]) -> Vec<BucketAdvice> {
    let mut advisories = Vec::new();
    for domain in domains {
        for aspect in &domain.aspects {
            for bucket in &aspect.buckets {
                advisories.push(BucketAdvice {
                    field_path: domain.field_path.clone(),
                    aspect: aspect.aspect,
                    bucket_id: bucket.id.clone(),
                    tag: bucket.tag,
                    prior_weight: prior_weight(aspect.aspect, bucket),
                });
            }
        }
    }
    advisories
}
