use crate::signal::EventSignal;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mutable view of the worker loop handed to executing commands.
#[derive(Debug)]
pub struct LoopControl {
    keep_running: bool,
}

impl LoopControl {
    pub(crate) fn new() -> Self {
        Self { keep_running: true }
    }

    /// Asks the worker loop to exit after finishing the current cycle.
    pub fn request_stop(&mut self) {
        self.keep_running = false;
    }

    pub(crate) fn should_run(&self) -> bool {
        self.keep_running
    }
}

/// A control instruction executed exactly once on the worker thread.
///
/// Commands are posted from arbitrary threads and drained strictly in post
/// order; ownership transfers to the queue at post and to `execute` at
/// drain time.
pub trait Command: Send {
    fn execute(self: Box<Self>, ctl: &mut LoopControl);
}

/// Terminates the worker loop after the cycle that drains it.
#[derive(Debug, Default)]
pub struct StopCommand;

impl Command for StopCommand {
    fn execute(self: Box<Self>, ctl: &mut LoopControl) {
        ctl.request_stop();
    }
}

/// FIFO of pending commands, written from any thread, drained only by the
/// worker thread.
///
/// Commands are never dropped: the queue grows past its capacity hint
/// rather than lose one.
pub(crate) struct CommandQueue {
    queue: Mutex<VecDeque<Box<dyn Command>>>,
    signal: Arc<EventSignal>,
}

impl CommandQueue {
    pub(crate) fn new(signal: Arc<EventSignal>, capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            signal,
        }
    }

    /// Enqueues a command and wakes the worker.
    pub(crate) fn post(&self, command: Box<dyn Command>) {
        self.queue.lock().unwrap().push_back(command);
        self.signal.signal();
    }

    /// Executes everything currently queued, in post order.
    ///
    /// Returns the number of commands executed. Commands posted while the
    /// drain runs are picked up on the next cycle; their post has already
    /// re-raised the signal.
    pub(crate) fn drain(&self, ctl: &mut LoopControl) -> usize {
        let drained: Vec<Box<dyn Command>> = {
            let mut queue = self.queue.lock().unwrap();
            queue.drain(..).collect()
        };

        let count = drained.len();
        for command in drained {
            command.execute(ctl);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::thread;

    struct RecordCommand {
        thread: usize,
        seq: usize,
        log: Arc<StdMutex<Vec<(usize, usize)>>>,
    }

    impl Command for RecordCommand {
        fn execute(self: Box<Self>, _ctl: &mut LoopControl) {
            self.log.lock().unwrap().push((self.thread, self.seq));
        }
    }

    fn queue() -> CommandQueue {
        CommandQueue::new(Arc::new(EventSignal::new()), 16)
    }

    #[test]
    fn test_drain_executes_in_post_order() {
        let queue = queue();
        let log = Arc::new(StdMutex::new(Vec::new()));

        for seq in 0..5 {
            queue.post(Box::new(RecordCommand {
                thread: 0,
                seq,
                log: Arc::clone(&log),
            }));
        }

        let mut ctl = LoopControl::new();
        assert_eq!(queue.drain(&mut ctl), 5);
        assert_eq!(
            *log.lock().unwrap(),
            vec![(0, 0), (0, 1), (0, 2), (0, 3), (0, 4)]
        );

        // A second drain finds nothing.
        assert_eq!(queue.drain(&mut ctl), 0);
    }

    #[test]
    fn test_stop_command_flips_control() {
        let queue = queue();
        queue.post(Box::new(StopCommand));

        let mut ctl = LoopControl::new();
        assert!(ctl.should_run());
        queue.drain(&mut ctl);
        assert!(!ctl.should_run());
    }

    #[test]
    fn test_post_raises_signal() {
        let signal = Arc::new(EventSignal::new());
        let queue = CommandQueue::new(Arc::clone(&signal), 16);

        assert!(!signal.is_pending());
        queue.post(Box::new(StopCommand));
        assert!(signal.is_pending());
    }

    #[test]
    fn test_concurrent_posts_preserve_per_thread_order() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 64;

        let queue = Arc::new(queue());
        let log = Arc::new(StdMutex::new(Vec::new()));

        let handles: Vec<_> = (0..THREADS)
            .map(|thread_id| {
                let queue = Arc::clone(&queue);
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for seq in 0..PER_THREAD {
                        queue.post(Box::new(RecordCommand {
                            thread: thread_id,
                            seq,
                            log: Arc::clone(&log),
                        }));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut ctl = LoopControl::new();
        assert_eq!(queue.drain(&mut ctl), THREADS * PER_THREAD);

        let log = log.lock().unwrap();
        assert_eq!(log.len(), THREADS * PER_THREAD);

        // No command skipped or duplicated, and each thread's commands
        // appear in the order that thread posted them.
        for thread_id in 0..THREADS {
            let seqs: Vec<usize> = log
                .iter()
                .filter(|(t, _)| *t == thread_id)
                .map(|(_, s)| *s)
                .collect();
            assert_eq!(seqs, (0..PER_THREAD).collect::<Vec<_>>());
        }
    }
}
