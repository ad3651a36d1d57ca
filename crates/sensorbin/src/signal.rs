use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

/// Cross-thread wake-up primitive for the worker loop.
///
/// Any number of notifications arriving while the worker is busy coalesce
/// into a single pending wake, so a burst of writes costs one loop cycle,
/// not one per write.
///
/// The two-phase discipline below closes the classic lost-wakeup window: a
/// signal landing between the waiter's lock-free check and its lock
/// acquisition is caught by the re-check under the lock; a signal landing
/// during the block is caught by the condvar itself.
#[derive(Debug, Default)]
pub struct EventSignal {
    pending: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

impl EventSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an event pending and wakes the waiter if it was idle.
    ///
    /// Safe from any thread. Only the signal that flips `pending` from false
    /// to true pays for the lock and the notify.
    pub fn signal(&self) {
        if !self.pending.swap(true, Ordering::AcqRel) {
            let _guard = self.lock.lock().unwrap();
            self.cond.notify_all();
        }
    }

    /// Blocks until at least one signal has arrived since the last wait,
    /// then clears the pending flag.
    ///
    /// Worker thread only. Returns immediately when a signal is already
    /// pending.
    pub fn wait(&self) {
        // Fast path: events arrived while we were busy.
        if self.pending.swap(false, Ordering::AcqRel) {
            return;
        }

        let mut guard = self.lock.lock().unwrap();
        // Re-check under the lock; a spurious condvar wake just loops.
        while !self.pending.swap(false, Ordering::AcqRel) {
            guard = self.cond.wait(guard).unwrap();
        }
    }

    /// Whether a wake is currently pending. Diagnostic only; the answer can
    /// be stale by the time the caller looks at it.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_signal_before_wait_returns_immediately() {
        let signal = EventSignal::new();
        signal.signal();

        let start = Instant::now();
        signal.wait();
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(!signal.is_pending());
    }

    #[test]
    fn test_signals_coalesce() {
        let signal = EventSignal::new();
        signal.signal();
        signal.signal();
        signal.signal();

        signal.wait();
        // All three collapsed into one wake.
        assert!(!signal.is_pending());
    }

    #[test]
    fn test_wait_blocks_until_signalled() {
        let signal = Arc::new(EventSignal::new());
        let (tx, rx) = mpsc::channel();

        let waiter_signal = Arc::clone(&signal);
        let waiter = thread::spawn(move || {
            waiter_signal.wait();
            tx.send(()).unwrap();
        });

        // The waiter must still be blocked with no signal sent.
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        signal.signal();
        rx.recv_timeout(Duration::from_secs(5))
            .expect("waiter never woke");
        waiter.join().unwrap();
    }

    #[test]
    fn test_signal_from_many_threads_wakes_once_each_cycle() {
        let signal = Arc::new(EventSignal::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let signal = Arc::clone(&signal);
                thread::spawn(move || signal.signal())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        signal.wait();
        assert!(!signal.is_pending());
    }
}
