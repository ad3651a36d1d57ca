use crate::invariants::{
    debug_assert_cursor_not_past_tail, debug_assert_lag_bounded, debug_assert_monotonic,
};
use crate::Ring;
use std::ptr;
use std::sync::atomic::{fence, Ordering};

/// Independent read cursor over a [`Ring`].
///
/// Created by [`Ring::subscribe`], positioned at the write cursor at that
/// moment. Each reader sees every element written after its subscription,
/// in write order, unless the writer laps it — lapped elements are dropped
/// silently and tallied in [`Reader::lost_count`].
///
/// Reads are non-blocking; dropping the reader detaches it. The cursor is
/// owned by the reader, so detaching can never race the writer.
pub struct Reader<T> {
    ring: Ring<T>,
    /// Sequence number of the next element to consume.
    cursor: u64,
    /// Elements overwritten before this reader consumed them.
    lost: u64,
}

impl<T: Copy> Reader<T> {
    pub(crate) fn new(ring: Ring<T>, cursor: u64) -> Self {
        Self {
            ring,
            cursor,
            lost: 0,
        }
    }

    /// Appends up to `max` unconsumed elements to `out`, in write order.
    ///
    /// Returns the number of elements appended; 0 means nothing new is
    /// available. Advances only this reader's cursor.
    pub fn read_into(&mut self, out: &mut Vec<T>, max: usize) -> usize {
        self.fetch(max, |item| out.push(item))
    }

    /// Copies up to `out.len()` unconsumed elements into `out`.
    ///
    /// Returns the number of elements written to the front of `out`.
    pub fn read(&mut self, out: &mut [T]) -> usize {
        let mut i = 0;
        self.fetch(out.len(), |item| {
            out[i] = item;
            i += 1;
        })
    }

    /// Number of elements written but not yet consumed by this reader.
    ///
    /// May exceed capacity when the reader has lagged; the excess will be
    /// counted as lost on the next read.
    pub fn available(&self) -> u64 {
        self.ring.tail_seq().saturating_sub(self.cursor)
    }

    /// Total elements this reader lost to writer overwrites.
    pub fn lost_count(&self) -> u64 {
        self.lost
    }

    /// Capacity of the underlying ring.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    fn fetch(&mut self, max: usize, mut emit: impl FnMut(T)) -> usize {
        if max == 0 {
            return 0;
        }

        let mut tail = self.ring.tail_seq();
        if self.cursor == tail {
            return 0;
        }
        debug_assert_cursor_not_past_tail!(self.cursor, tail);

        let start = self.cursor;
        let capacity = self.ring.capacity() as u64;

        // Already lapped before we even started: jump to the oldest element
        // that is still present.
        let floor = tail.saturating_sub(capacity);
        if floor > self.cursor {
            self.note_lost(floor - self.cursor);
            self.cursor = floor;
        }

        let mut taken = 0usize;
        while self.cursor < tail && taken < max {
            let seq = self.cursor;
            let slot = self.ring.slot(seq);

            if slot.stamp.load(Ordering::Acquire) != seq {
                // Writer claimed this slot for a newer element while we were
                // catching up.
                tail = self.ring.tail_seq();
                self.skip_lapped(tail);
                continue;
            }

            // SAFETY: the stamp matched, so the slot held element `seq` at
            // the first check. The copy may still race an overwrite; the
            // re-check below rejects it in that case, and T: Copy makes the
            // discarded copy inert. Volatile keeps the compiler from folding
            // the read across the checks.
            let copy = unsafe { ptr::read_volatile(slot.value_ptr()) };
            fence(Ordering::Acquire);
            if slot.stamp.load(Ordering::Relaxed) != seq {
                tail = self.ring.tail_seq();
                self.skip_lapped(tail);
                continue;
            }

            // SAFETY: stamp was stable across the copy, so `copy` holds the
            // fully written element `seq`.
            emit(unsafe { copy.assume_init() });
            self.cursor += 1;
            taken += 1;
        }

        debug_assert_monotonic!("cursor", start, self.cursor);

        if taken > 0 {
            self.ring.count_read(taken as u64);
        }
        taken
    }

    /// Steps the cursor past elements the writer has overwritten, counting
    /// them as lost.
    fn skip_lapped(&mut self, tail: u64) {
        let capacity = self.ring.capacity() as u64;
        let floor = tail.saturating_sub(capacity);
        if floor > self.cursor {
            self.note_lost(floor - self.cursor);
            self.cursor = floor;
        } else {
            // The stamp moved but the published tail has not caught up: the
            // writer is mid-batch in this exact slot. Step past it alone.
            self.note_lost(1);
            self.cursor += 1;
        }
        debug_assert_lag_bounded!(tail.saturating_sub(self.cursor), capacity);
    }

    fn note_lost(&mut self, n: u64) {
        self.lost += n;
        self.ring.count_dropped(n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    #[test]
    fn test_read_into_slice() {
        let ring = Ring::<u32>::new(Config::new(4, false));
        let mut reader = ring.subscribe();
        ring.write(&[7, 8, 9]);

        let mut out = [0u32; 2];
        assert_eq!(reader.read(&mut out), 2);
        assert_eq!(out, [7, 8]);
        assert_eq!(reader.read(&mut out), 1);
        assert_eq!(out[0], 9);
    }

    #[test]
    fn test_available_tracks_cursor() {
        let ring = Ring::<u32>::new(Config::new(4, false));
        let mut reader = ring.subscribe();
        assert_eq!(reader.available(), 0);

        ring.write(&[1, 2, 3]);
        assert_eq!(reader.available(), 3);

        let mut out = Vec::new();
        reader.read_into(&mut out, 2);
        assert_eq!(reader.available(), 1);
    }

    #[test]
    fn test_lap_after_partial_read() {
        let ring = Ring::<u64>::new(Config::new(2, false)); // 4 slots
        let mut reader = ring.subscribe();
        let mut out = Vec::new();

        ring.write(&[0, 1]);
        reader.read_into(&mut out, 16);

        // Ten more elements through a 4-slot ring: 2..12, of which only
        // 8..12 survive for the lagging cursor.
        ring.write(&(2..12).collect::<Vec<u64>>());
        reader.read_into(&mut out, 16);

        assert_eq!(out, vec![0, 1, 8, 9, 10, 11]);
        assert_eq!(reader.lost_count(), 6);
    }

    #[test]
    fn test_zero_max_reads_nothing() {
        let ring = Ring::<u32>::new(Config::new(4, false));
        let mut reader = ring.subscribe();
        ring.write(&[1]);

        let mut out = Vec::new();
        assert_eq!(reader.read_into(&mut out, 0), 0);
        assert_eq!(reader.available(), 1);
    }
}
