//! A process-wide trace ring for coverage collectors.
//!
//! The ring has a fixed power-of-two capacity and a monotonically increasing
//! write index. Writers never block; readers take a snapshot by loading the
//! index and reading up to `min(index, capacity)` entries. Entries are
//! stored relaxed; the ring trades perfect consistency for a hot path with
//! no synchronisation beyond one atomic add.

use lazy_static::lazy_static;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// A single observation: a context id and the value seen there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry {
    pub cid: u64,
    pub value: i64,
}

/// A fixed-capacity ring of trace entries.
pub struct TraceRing {
    cids: Vec<AtomicU64>,
    values: Vec<AtomicI64>,
    index: AtomicU64,
    mask: usize,
}

impl TraceRing {
    /// Creates a ring with the given power-of-two capacity.
    ///
    /// ## Panics
    ///
    /// Panics if `capacity` is not a power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "ring capacity must be a power of two");
        Self {
            cids: (0..capacity).map(|_| AtomicU64::new(0)).collect(),
            values: (0..capacity).map(|_| AtomicI64::new(0)).collect(),
            index: AtomicU64::new(0),
            mask: capacity - 1,
        }
    }

    /// Records a single observation.
    pub fn record(&self, cid: u64, value: i64) {
        let idx = self.index.fetch_add(1, Ordering::Relaxed);
        let slot = (idx as usize) & self.mask;
        self.cids[slot].store(cid, Ordering::Relaxed);
        self.values[slot].store(value, Ordering::Relaxed);
    }

    /// Clears the write index.
    pub fn reset(&self) {
        self.index.store(0, Ordering::Relaxed);
    }

    /// Returns the currently valid entries, oldest slot first.
    pub fn snapshot(&self) -> Vec<TraceEntry> {
        let index = self.index.load(Ordering::Relaxed) as usize;
        let len = index.min(self.mask + 1);
        (0..len)
            .map(|slot| TraceEntry {
                cid: self.cids[slot].load(Ordering::Relaxed),
                value: self.values[slot].load(Ordering::Relaxed),
            })
            .collect()
    }
}

/// Capacity of the process-wide ring.
pub const BUFFER_SIZE: usize = 1 << 16;

lazy_static! {
    static ref RING: TraceRing = TraceRing::with_capacity(BUFFER_SIZE);
}

/// Records into the process-wide ring.
pub fn record(cid: u64, value: i64) {
    RING.record(cid, value);
}

/// Resets the process-wide ring.
pub fn reset() {
    RING.reset();
}

/// Snapshots the process-wide ring.
pub fn snapshot() -> Vec<TraceEntry> {
    RING.snapshot()
}

/// FNV-1a over `bytes`, for deriving stable context ids from field paths.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn snapshot_is_bounded_by_the_write_index() {
        let ring = TraceRing::with_capacity(8);
        assert!(ring.snapshot().is_empty());

        ring.record(1, 10);
        ring.record(2, 20);
        let entries = ring.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], TraceEntry { cid: 1, value: 10 });
        assert_eq!(entries[1], TraceEntry { cid: 2, value: 20 });
    }

    #[test]
    fn ring_wraps_at_capacity() {
        let ring = TraceRing::with_capacity(4);
        for i in 0..10 {
            ring.record(i, i as i64);
        }
        // Saturated: snapshot returns every slot.
        assert_eq!(ring.snapshot().len(), 4);
    }

    #[test]
    fn reset_clears_the_index() {
        let ring = TraceRing::with_capacity(4);
        ring.record(1, 1);
        ring.reset();
        assert!(ring.snapshot().is_empty());
    }

    #[test]
    fn fnv_distinguishes_paths() {
        assert_ne!(fnv1a(b"balances/Length/Empty"), fnv1a(b"balances/Length/MinLen"));
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
    }
}
