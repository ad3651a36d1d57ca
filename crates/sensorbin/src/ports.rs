use crate::node::ReadyCallback;
use ringcast::{Config, Reader, Ring};
use std::any::{type_name, Any};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::trace;

/// Failure attaching or detaching a sink, relative to one source.
///
/// The bin wraps these into [`crate::GraphError`] with the node and port
/// names filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The sink expects a different element type than the source carries.
    #[error("element types differ: source carries `{source_type}`, sink expects `{sink_type}`")]
    TypeMismatch {
        source_type: &'static str,
        sink_type: &'static str,
    },

    /// The sink is already attached to this source.
    #[error("sink is already joined to this source")]
    AlreadyJoined,

    /// The sink is not attached to this source.
    #[error("sink is not joined to this source")]
    NotJoined,
}

/// Process-unique identity of a sink instance.
///
/// Edges are keyed on this, so the same sink cannot be attached to one
/// source twice and unjoin can find the exact attachment to remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

impl SinkId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Object-safe face of a typed source port, as the bin sees it.
pub trait SourceBase: Send + Sync {
    fn name(&self) -> &str;

    /// Element type carried by this source, for diagnostics.
    fn element_type_name(&self) -> &'static str;

    /// Attaches `sink` so it observes data written after this call; no
    /// retroactive delivery. Fails without touching the graph when the
    /// element types differ or the sink is already attached.
    fn try_join(&self, sink: &dyn SinkBase) -> Result<(), LinkError>;

    /// Detaches `sink`. Fails when it is not attached.
    fn try_unjoin(&self, sink: &dyn SinkBase) -> Result<(), LinkError>;

    /// Moves buffered data to every attached sink. Worker thread only.
    fn deliver(&self);

    /// Installs the wake-up callback fired after each published batch.
    fn set_ready_callback(&self, callback: ReadyCallback);

    /// Number of currently attached sinks.
    fn link_count(&self) -> usize;
}

/// Object-safe face of a typed sink port.
pub trait SinkBase: Send + Sync {
    fn name(&self) -> &str;
    fn id(&self) -> SinkId;
    fn element_type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
}

/// Typed input port: hands arriving batches to its collect handler.
///
/// The handler runs on the worker thread, inside the upstream source's
/// delivery pass. A filter's handler transforms and republishes; a
/// consumer's handler is the end of the line.
pub struct Sink<T: Copy + Send + 'static> {
    name: String,
    id: SinkId,
    collect: Arc<dyn Fn(&[T]) + Send + Sync>,
}

impl<T: Copy + Send + 'static> Sink<T> {
    pub fn new(name: impl Into<String>, collect: impl Fn(&[T]) + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            id: SinkId::next(),
            collect: Arc::new(collect),
        }
    }

    fn collector(&self) -> Arc<dyn Fn(&[T]) + Send + Sync> {
        Arc::clone(&self.collect)
    }
}

impl<T: Copy + Send + 'static> SinkBase for Sink<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> SinkId {
        self.id
    }

    fn element_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One edge: a sink attached to a source.
struct Link<T> {
    sink_id: SinkId,
    collect: Arc<dyn Fn(&[T]) + Send + Sync>,
    reader: Reader<T>,
    scratch: Vec<T>,
}

/// Typed output port: owns the broadcast ring its consumers read from.
///
/// `publish` is called by the owning node from whichever single thread
/// produces the data (a device thread for adaptors, the worker thread for
/// filters); `deliver` runs only on the worker thread.
pub struct Source<T: Copy + Send + 'static> {
    name: String,
    ring: Ring<T>,
    links: Mutex<Vec<Link<T>>>,
    ready: Mutex<Option<ReadyCallback>>,
}

impl<T: Copy + Send + 'static> Source<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, Config::default())
    }

    pub fn with_config(name: impl Into<String>, config: Config) -> Self {
        Self {
            name: name.into(),
            ring: Ring::new(config),
            links: Mutex::new(Vec::new()),
            ready: Mutex::new(None),
        }
    }

    /// Writes a batch into the ring and wakes the bin.
    ///
    /// Single-writer contract: only the owning node's producing thread may
    /// call this. A lagging downstream sink loses the oldest elements, it
    /// never blocks this call.
    pub fn publish(&self, items: &[T]) {
        if items.is_empty() {
            return;
        }
        self.ring.write(items);

        let ready = self.ready.lock().unwrap().clone();
        if let Some(callback) = ready {
            callback();
        }
    }

    /// Ring-level counters for this port.
    pub fn metrics(&self) -> ringcast::MetricsSnapshot {
        self.ring.metrics()
    }
}

impl<T: Copy + Send + 'static> SourceBase for Source<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn element_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn try_join(&self, sink: &dyn SinkBase) -> Result<(), LinkError> {
        let Some(typed) = sink.as_any().downcast_ref::<Sink<T>>() else {
            return Err(LinkError::TypeMismatch {
                source_type: type_name::<T>(),
                sink_type: sink.element_type_name(),
            });
        };

        let mut links = self.links.lock().unwrap();
        if links.iter().any(|link| link.sink_id == typed.id()) {
            return Err(LinkError::AlreadyJoined);
        }

        links.push(Link {
            sink_id: typed.id(),
            collect: typed.collector(),
            reader: self.ring.subscribe(),
            scratch: Vec::with_capacity(self.ring.capacity()),
        });
        Ok(())
    }

    fn try_unjoin(&self, sink: &dyn SinkBase) -> Result<(), LinkError> {
        if sink.as_any().downcast_ref::<Sink<T>>().is_none() {
            return Err(LinkError::TypeMismatch {
                source_type: type_name::<T>(),
                sink_type: sink.element_type_name(),
            });
        }

        let mut links = self.links.lock().unwrap();
        let before = links.len();
        links.retain(|link| link.sink_id != sink.id());
        if links.len() == before {
            return Err(LinkError::NotJoined);
        }
        Ok(())
    }

    fn deliver(&self) {
        let mut links = self.links.lock().unwrap();
        for link in links.iter_mut() {
            let capacity = link.reader.capacity();
            loop {
                link.scratch.clear();
                let taken = link.reader.read_into(&mut link.scratch, capacity);
                if taken == 0 {
                    break;
                }
                trace!(source = %self.name, elements = taken, "delivering batch");
                (link.collect)(&link.scratch);
            }
        }
    }

    fn set_ready_callback(&self, callback: ReadyCallback) {
        *self.ready.lock().unwrap() = Some(callback);
    }

    fn link_count(&self) -> usize {
        self.links.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn collecting_sink(name: &str) -> (Sink<i32>, Arc<Mutex<Vec<i32>>>) {
        let collected = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::clone(&collected);
        let sink = Sink::new(name, move |items: &[i32]| {
            store.lock().unwrap().extend_from_slice(items);
        });
        (sink, collected)
    }

    #[test]
    fn test_join_deliver_unjoin() {
        let source = Source::<i32>::new("out");
        let (sink, collected) = collecting_sink("in");

        source.try_join(&sink).unwrap();
        assert_eq!(source.link_count(), 1);

        source.publish(&[1, 2, 3]);
        source.deliver();
        assert_eq!(*collected.lock().unwrap(), vec![1, 2, 3]);

        source.try_unjoin(&sink).unwrap();
        assert_eq!(source.link_count(), 0);

        // Data published after unjoin never reaches the detached sink.
        source.publish(&[4]);
        source.deliver();
        assert_eq!(*collected.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_join_rejects_type_mismatch() {
        let source = Source::<i32>::new("out");
        let sink = Sink::<f64>::new("in", |_| {});

        let err = source.try_join(&sink).unwrap_err();
        assert!(matches!(err, LinkError::TypeMismatch { .. }));
        assert_eq!(source.link_count(), 0);
    }

    #[test]
    fn test_join_rejects_double_attach() {
        let source = Source::<i32>::new("out");
        let (sink, _collected) = collecting_sink("in");

        source.try_join(&sink).unwrap();
        assert_eq!(source.try_join(&sink), Err(LinkError::AlreadyJoined));
        assert_eq!(source.link_count(), 1);
    }

    #[test]
    fn test_unjoin_unknown_sink() {
        let source = Source::<i32>::new("out");
        let (sink, _collected) = collecting_sink("in");
        assert_eq!(source.try_unjoin(&sink), Err(LinkError::NotJoined));
    }

    #[test]
    fn test_sink_joined_late_starts_from_now() {
        let source = Source::<i32>::new("out");
        source.publish(&[1, 2]);

        let (sink, collected) = collecting_sink("in");
        source.try_join(&sink).unwrap();

        source.publish(&[3]);
        source.deliver();
        assert_eq!(*collected.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_publish_fires_ready_callback() {
        let source = Source::<i32>::new("out");
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        source.set_ready_callback(Arc::new(move || flag.store(true, Ordering::Release)));

        source.publish(&[1]);
        assert!(fired.load(Ordering::Acquire));
    }

    #[test]
    fn test_two_sinks_receive_independently() {
        let source = Source::<i32>::new("out");
        let (first, first_out) = collecting_sink("a");
        let (second, second_out) = collecting_sink("b");

        source.try_join(&first).unwrap();
        source.try_join(&second).unwrap();

        source.publish(&[5, 6]);
        source.deliver();

        assert_eq!(*first_out.lock().unwrap(), vec![5, 6]);
        assert_eq!(*second_out.lock().unwrap(), vec![5, 6]);
    }
}
