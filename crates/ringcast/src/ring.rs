use crate::invariants::debug_assert_monotonic;
use crate::{Config, Metrics, MetricsSnapshot, Reader};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{fence, AtomicU64, Ordering};
use std::sync::Arc;

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// One writer, any number of readers, and the writer never waits for anyone.
// That rules out the classic SPSC head/tail handshake: there is no shared
// head to hold the writer back. Instead the ring is a broadcast journal:
//
// ## Sequence Numbers
//
// `tail` is an unbounded u64 sequence number counting every element ever
// written. The slot index is computed as `seq & mask` only at access time,
// so cursor comparisons never suffer ABA across wrap-arounds.
//
// ## Per-Slot Stamps
//
// Each slot carries an atomic `stamp` holding the sequence number of the
// value it currently stores. The stamp is what lets a reader detect that the
// writer lapped it mid-read, without any reader-side state visible to the
// writer.
//
// **Writer (per element):**
// 1. Store `stamp = seq` with Relaxed — claims the slot, invalidating it for
//    readers still expecting `seq - capacity`
// 2. Release fence — orders the claim before the data write
// 3. Write the value (volatile, the slot may be under concurrent read)
// 4. After the batch: store `tail = last seq + 1` with Release — publishes
//    both the values and the stamps
//
// **Reader (per element at cursor `seq`, after an Acquire load of `tail`):**
// 1. Load `stamp` with Acquire; `stamp != seq` means the writer already
//    claimed this slot for a newer element — the element is lost
// 2. Copy the value out (volatile)
// 3. Acquire fence, then re-load `stamp`; a change means the copy may be
//    torn — discard it and count the element as lost
//
// A torn copy is never observed by callers: elements are only handed out
// after the second stamp check passes, and `T: Copy` makes the discarded
// bytes free to drop. This is the standard seqlock validation scheme, done
// per slot.
//
// =============================================================================

/// Stamp value of a slot that has never been written.
const EMPTY: u64 = u64::MAX;

pub(crate) struct Slot<T> {
    pub(crate) stamp: AtomicU64,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    #[inline]
    pub(crate) fn value_ptr(&self) -> *mut MaybeUninit<T> {
        self.value.get()
    }
}

struct RingInner<T> {
    /// Write cursor: sequence number of the next element to write.
    tail: CachePadded<AtomicU64>,
    /// Fixed-size slot storage; index = `seq & mask`.
    slots: Box<[Slot<T>]>,
    /// Thread-safe counters (no-ops unless `config.enable_metrics`).
    metrics: Metrics,
    config: Config,
}

// SAFETY: slot access is governed by the stamp protocol above; a reader
// either observes a fully published value or discards its copy. T: Copy
// (enforced on the methods) keeps discarded copies free of side effects.
unsafe impl<T: Send> Send for RingInner<T> {}
unsafe impl<T: Send> Sync for RingInner<T> {}

/// Broadcast ring buffer - the transport between pipeline stages.
///
/// Exactly one writer at a time; readers are created with [`Ring::subscribe`]
/// and progress independently. The writer overwrites the oldest data when it
/// wraps, so a slow reader loses elements instead of blocking the writer.
///
/// `Ring` is a cheap handle over shared storage; clones refer to the same
/// buffer. The single-writer discipline is a contract, not a compile-time
/// guarantee: the owning stage decides which one thread produces into it.
pub struct Ring<T> {
    inner: Arc<RingInner<T>>,
}

impl<T> Clone for Ring<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Copy> Ring<T> {
    /// Creates a new ring with the given configuration.
    pub fn new(config: Config) -> Self {
        let capacity = config.capacity();

        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Slot {
            stamp: AtomicU64::new(EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        });

        Self {
            inner: Arc::new(RingInner {
                tail: CachePadded::new(AtomicU64::new(0)),
                slots: slots.into_boxed_slice(),
                metrics: Metrics::new(),
                config,
            }),
        }
    }

    /// Returns the ring capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.config.capacity()
    }

    #[inline]
    fn mask(&self) -> usize {
        self.inner.config.mask()
    }

    /// Sequence number of the next element to be written.
    #[inline]
    pub fn tail_seq(&self) -> u64 {
        self.inner.tail.load(Ordering::Acquire)
    }

    /// Copies `items` into the ring, advancing the write cursor.
    ///
    /// Never blocks and never fails: elements a lagging reader has not yet
    /// consumed are overwritten once the ring wraps, and surface as loss on
    /// that reader, not as an error here.
    ///
    /// Contract: at most one thread may write to a given ring at a time.
    pub fn write(&self, items: &[T]) {
        if items.is_empty() {
            return;
        }

        let start = self.inner.tail.load(Ordering::Relaxed);
        let mask = self.mask();
        let mut seq = start;

        for item in items {
            let slot = &self.inner.slots[(seq as usize) & mask];

            // Claim before write: readers expecting the previous occupant of
            // this slot must see the stamp change before the bytes do.
            slot.stamp.store(seq, Ordering::Relaxed);
            fence(Ordering::Release);

            // SAFETY: the single-writer contract means no other thread writes
            // this slot. Concurrent readers racing this write discard their
            // copy when the stamp re-check fails; volatile keeps the compiler
            // from eliding or splitting the store.
            unsafe {
                ptr::write_volatile((*slot.value_ptr()).as_mut_ptr(), *item);
            }

            seq += 1;
        }

        debug_assert_monotonic!("tail", start, seq);

        // Publishes the batch: stamps and values above are ordered before
        // this store, and readers load `tail` with Acquire.
        self.inner.tail.store(seq, Ordering::Release);

        if self.inner.config.enable_metrics {
            self.inner.metrics.add_written(items.len() as u64);
            self.inner.metrics.add_write_batch();
        }
    }

    /// Creates a reader positioned at the current write cursor.
    ///
    /// The reader observes only elements written after this call.
    pub fn subscribe(&self) -> Reader<T> {
        Reader::new(self.clone(), self.tail_seq())
    }

    /// Point-in-time metrics (all zero unless enabled in the config).
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    #[inline]
    pub(crate) fn slot(&self, seq: u64) -> &Slot<T> {
        &self.inner.slots[(seq as usize) & self.mask()]
    }

    #[inline]
    pub(crate) fn count_read(&self, n: u64) {
        if self.inner.config.enable_metrics {
            self.inner.metrics.add_read(n);
        }
    }

    #[inline]
    pub(crate) fn count_dropped(&self, n: u64) {
        if self.inner.config.enable_metrics {
            self.inner.metrics.add_dropped(n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(bits: u8) -> Ring<u64> {
        Ring::new(Config::new(bits, true))
    }

    #[test]
    fn test_write_then_read_in_order() {
        let ring = ring(4);
        let mut reader = ring.subscribe();

        ring.write(&[10, 20, 30]);

        let mut out = Vec::new();
        assert_eq!(reader.read_into(&mut out, 16), 3);
        assert_eq!(out, vec![10, 20, 30]);

        // Nothing new on a second read.
        out.clear();
        assert_eq!(reader.read_into(&mut out, 16), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_subscribe_starts_at_now() {
        let ring = ring(4);
        ring.write(&[1, 2, 3]);

        let mut reader = ring.subscribe();
        let mut out = Vec::new();
        assert_eq!(reader.read_into(&mut out, 16), 0);

        ring.write(&[4]);
        assert_eq!(reader.read_into(&mut out, 16), 1);
        assert_eq!(out, vec![4]);
    }

    #[test]
    fn test_wrap_preserves_order() {
        let ring = ring(3); // 8 slots
        let mut reader = ring.subscribe();
        let mut out = Vec::new();

        for round in 0u64..5 {
            let batch: Vec<u64> = (round * 6..round * 6 + 6).collect();
            ring.write(&batch);
            reader.read_into(&mut out, 16);
        }

        let expected: Vec<u64> = (0..30).collect();
        assert_eq!(out, expected);
        assert_eq!(reader.lost_count(), 0);
    }

    #[test]
    fn test_overflow_drops_oldest_and_counts() {
        let ring = ring(3); // 8 slots
        let mut reader = ring.subscribe();

        let values: Vec<u64> = (0..20).collect();
        ring.write(&values);

        let mut out = Vec::new();
        assert_eq!(reader.read_into(&mut out, 64), 8);
        // Only the most recent 8 elements survive.
        assert_eq!(out, (12..20).collect::<Vec<u64>>());
        assert_eq!(reader.lost_count(), 12);
        assert_eq!(ring.metrics().elements_dropped, 12);
    }

    #[test]
    fn test_two_readers_progress_independently() {
        let ring = ring(4);
        let mut fast = ring.subscribe();
        let mut slow = ring.subscribe();

        let mut fast_out = Vec::new();
        let mut slow_out = Vec::new();

        ring.write(&[1, 2]);
        fast.read_into(&mut fast_out, 16);

        ring.write(&[3, 4]);
        fast.read_into(&mut fast_out, 16);
        slow.read_into(&mut slow_out, 16);

        assert_eq!(fast_out, vec![1, 2, 3, 4]);
        assert_eq!(slow_out, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_read_respects_max() {
        let ring = ring(4);
        let mut reader = ring.subscribe();
        ring.write(&[1, 2, 3, 4, 5]);

        let mut out = Vec::new();
        assert_eq!(reader.read_into(&mut out, 2), 2);
        assert_eq!(reader.read_into(&mut out, 2), 2);
        assert_eq!(reader.read_into(&mut out, 2), 1);
        assert_eq!(out, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_metrics_counts_batches() {
        let ring = ring(4);
        ring.write(&[1, 2, 3]);
        ring.write(&[4]);

        let snapshot = ring.metrics();
        assert_eq!(snapshot.elements_written, 4);
        assert_eq!(snapshot.write_batches, 2);
    }

    #[test]
    fn test_empty_write_is_noop() {
        let ring = ring(4);
        let before = ring.tail_seq();
        ring.write(&[]);
        assert_eq!(ring.tail_seq(), before);
        assert_eq!(ring.metrics().write_batches, 0);
    }

    #[test]
    fn test_clone_shares_storage() {
        let ring = ring(4);
        let alias = ring.clone();
        let mut reader = alias.subscribe();

        ring.write(&[42]);

        let mut out = Vec::new();
        assert_eq!(reader.read_into(&mut out, 16), 1);
        assert_eq!(out, vec![42]);
    }
}
