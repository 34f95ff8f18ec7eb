//! Partition constructors: the fixed bucket families every field aspect
//! draws from.
//!
//! All partitions are disjoint and cover their stated interval. Boundary
//! arithmetic runs in `u128` so a full `u64` value space slices without
//! overflow.

use crate::{Bucket, Range, Tag};

/// Buckets for an unsigned integer of `bit_size` bits: `{0}`, `{1}`, then
/// eight equal-width slices of `[2, MAX]`.
pub fn uint_buckets(bit_size: u32) -> Vec<Bucket> {
    let max: u64 = if bit_size >= 64 {
        u64::MAX
    } else {
        (1u64 << bit_size) - 1
    };

    let mut buckets = vec![
        Bucket::new("Zero", "Value is 0", Range::point(0), Tag::Boundary),
        Bucket::new("One", "Value is 1", Range::point(1), Tag::Boundary),
    ];
    buckets.extend(slices(2, max, 8, Tag::Content));
    if let Some(top) = buckets.last_mut() {
        top.tag = Tag::High;
    }
    buckets
}

/// Buckets for a boolean byte: the two canonical values and the dirty range.
pub fn bool_buckets() -> Vec<Bucket> {
    vec![
        Bucket::new("False", "Boolean false (0x00)", Range::point(0), Tag::Boundary),
        Bucket::new("True", "Boolean true (0x01)", Range::point(1), Tag::Boundary),
        Bucket::new(
            "Dirty",
            "Non-canonical boolean byte (0x02-0xff)",
            Range::new(2, 255),
            Tag::Dirty,
        ),
    ]
}

/// Buckets for byte content: twelve near-equal slices of `[0x00, 0xff]`.
///
/// The two highest slices are tagged `High`; sampled into the final byte of
/// a bitvector they set bits beyond most declared widths.
pub fn byte_content_buckets() -> Vec<Bucket> {
    let mut buckets = slices(0, 255, 12, Tag::Content);
    let len = buckets.len();
    for bucket in buckets.iter_mut().skip(len.saturating_sub(2)) {
        bucket.tag = Tag::High;
    }
    buckets
}

/// Buckets for the length of a list or bitlist bounded by `max`: `{0}`,
/// `{1}`, then four equal slices of `[2, max]`.
pub fn length_buckets(max: u64) -> Vec<Bucket> {
    let mut buckets = vec![Bucket::new(
        "Empty",
        "Length 0",
        Range::point(0),
        Tag::Length,
    )];
    if max >= 1 {
        buckets.push(Bucket::new("MinLen", "Length 1", Range::point(1), Tag::Length));
    }
    buckets.extend(slices(2, max, 4, Tag::Length));
    buckets
}

/// Buckets for a variable field's offset word: the canonical offset plus
/// three equal slices of gap sizes in `[1, omax]`.
pub fn offset_buckets(omax: u64) -> Vec<Bucket> {
    let mut buckets = vec![Bucket::new(
        "Canonical",
        "Contiguous offset",
        Range::point(0),
        Tag::Canonical,
    )];
    let gap_names = ["SmallGap", "MediumGap", "LargeGap"];
    for (name, mut bucket) in gap_names.iter().zip(slices(1, omax, 3, Tag::OffsetGap)) {
        bucket.id = (*name).into();
        bucket.description = format!("Gap of {}..={} bytes", bucket.range.min, bucket.range.max);
        buckets.push(bucket);
    }
    buckets
}

/// Buckets for trailing bytes appended after the last payload.
pub fn tail_buckets() -> Vec<Bucket> {
    vec![
        Bucket::new("NoTail", "No trailing bytes", Range::point(0), Tag::Canonical),
        Bucket::new("OneByte", "One trailing byte", Range::point(1), Tag::Tail),
        Bucket::new("SmallTail", "2-8 trailing bytes", Range::new(2, 8), Tag::Tail),
        Bucket::new("MediumTail", "9-64 trailing bytes", Range::new(9, 64), Tag::Tail),
        Bucket::new("LargeTail", "65-256 trailing bytes", Range::new(65, 256), Tag::Tail),
        Bucket::new(
            "SaturatingTail",
            "257-4096 trailing bytes",
            Range::new(257, 4096),
            Tag::Tail,
        ),
    ]
}

/// Buckets for a bitlist's sentinel bit.
pub fn sentinel_buckets() -> Vec<Bucket> {
    vec![
        Bucket::new(
            "Canonical",
            "Keep the canonical sentinel bit",
            Range::point(0),
            Tag::Canonical,
        ),
        Bucket::new(
            "NullSentinel",
            "Force the last byte to zero",
            Range::point(0),
            Tag::NullSentinel,
        ),
    ]
}

/// Splits `[lo, hi]` into up to `parts` equal-width buckets, dropping empty
/// ones when the interval is narrower than the requested part count.
fn slices(lo: u64, hi: u64, parts: u32, tag: Tag) -> Vec<Bucket> {
    if lo > hi {
        return vec![];
    }
    let total = (hi as u128) - (lo as u128) + 1;
    let mut buckets = Vec::with_capacity(parts as usize);
    for i in 0..parts as u128 {
        let min = lo as u128 + i * total / parts as u128;
        let max = lo as u128 + (i + 1) * total / parts as u128 - 1;
        if min > max {
            continue;
        }
        buckets.push(Bucket::new(
            format!("{}..{}", min, max),
            format!("Range {} to {}", min, max),
            Range::new(min as u64, max as u64),
            tag,
        ));
    }
    buckets
}
