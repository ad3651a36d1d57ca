use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for ring activity.
///
/// Updated only when `Config::enable_metrics` is set. Element loss is the
/// operationally interesting one: it is the only way a wrapped-past reader
/// shows up outside of its own `lost_count`.
#[derive(Debug, Default)]
pub struct Metrics {
    elements_written: AtomicU64,
    elements_read: AtomicU64,
    elements_dropped: AtomicU64,
    write_batches: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_written(&self, n: u64) {
        self.elements_written.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_read(&self, n: u64) {
        self.elements_read.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_dropped(&self, n: u64) {
        self.elements_dropped.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_write_batch(&self) {
        self.write_batches.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            elements_written: self.elements_written.load(Ordering::Relaxed),
            elements_read: self.elements_read.load(Ordering::Relaxed),
            elements_dropped: self.elements_dropped.load(Ordering::Relaxed),
            write_batches: self.write_batches.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of ring metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub elements_written: u64,
    pub elements_read: u64,
    pub elements_dropped: u64,
    pub write_batches: u64,
}
