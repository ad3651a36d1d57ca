use crate::command::{Command, CommandQueue, LoopControl, StopCommand};
use crate::error::GraphError;
use crate::node::{Consumer, Filter, Producer, ReadyCallback};
use crate::ports::{LinkError, SinkBase, SourceBase};
use crate::signal::EventSignal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// Tuning knobs for a bin instance.
#[derive(Debug, Clone)]
pub struct BinConfig {
    /// Initial command queue capacity; the queue grows if exceeded.
    pub command_capacity: usize,
    /// Name given to the worker thread.
    pub thread_name: String,
}

impl Default for BinConfig {
    fn default() -> Self {
        Self {
            command_capacity: 256,
            thread_name: "sensorbin-worker".into(),
        }
    }
}

/// Name→node registry, insertion-ordered so the push pass is deterministic
/// within a run.
#[derive(Default)]
struct Registry {
    producers: Vec<(String, Arc<dyn Producer>)>,
    consumers: Vec<(String, Arc<dyn Consumer>)>,
    filters: Vec<(String, Arc<dyn Filter>)>,
}

impl Registry {
    /// A producer or filter already answers to this name.
    fn producer_name_taken(&self, name: &str) -> bool {
        self.producers.iter().any(|(n, _)| n == name)
            || self.filters.iter().any(|(n, _)| n == name)
    }

    /// A consumer or filter already answers to this name.
    fn consumer_name_taken(&self, name: &str) -> bool {
        self.consumers.iter().any(|(n, _)| n == name)
            || self.filters.iter().any(|(n, _)| n == name)
    }

    /// Resolves a source port, letting filters answer as producers.
    fn find_source(&self, node: &str, port: &str) -> Result<&dyn SourceBase, GraphError> {
        if let Some((_, producer)) = self.producers.iter().find(|(n, _)| n == node) {
            return producer.source(port).ok_or_else(|| GraphError::SourceNotFound {
                node: node.into(),
                port: port.into(),
            });
        }
        if let Some((_, filter)) = self.filters.iter().find(|(n, _)| n == node) {
            return filter.source(port).ok_or_else(|| GraphError::SourceNotFound {
                node: node.into(),
                port: port.into(),
            });
        }
        Err(GraphError::ProducerNotFound { name: node.into() })
    }

    /// Resolves a sink port, letting filters answer as consumers.
    fn find_sink(&self, node: &str, port: &str) -> Result<&dyn SinkBase, GraphError> {
        if let Some((_, consumer)) = self.consumers.iter().find(|(n, _)| n == node) {
            return consumer.sink(port).ok_or_else(|| GraphError::SinkNotFound {
                node: node.into(),
                port: port.into(),
            });
        }
        if let Some((_, filter)) = self.filters.iter().find(|(n, _)| n == node) {
            return filter.sink(port).ok_or_else(|| GraphError::SinkNotFound {
                node: node.into(),
                port: port.into(),
            });
        }
        Err(GraphError::ConsumerNotFound { name: node.into() })
    }
}

/// State shared between the owning handle and the worker thread.
struct BinShared {
    registry: Mutex<Registry>,
    commands: CommandQueue,
    signal: Arc<EventSignal>,
    running: AtomicBool,
}

impl BinShared {
    /// Snapshot of every push-capable node, registration order, taken under
    /// the registry lock so a concurrent `join`/`add_*` cannot tear it.
    fn pushers(&self) -> (Vec<Arc<dyn Producer>>, Vec<Arc<dyn Filter>>) {
        let registry = self.registry.lock().unwrap();
        (
            registry.producers.iter().map(|(_, p)| Arc::clone(p)).collect(),
            registry.filters.iter().map(|(_, f)| Arc::clone(f)).collect(),
        )
    }
}

/// Dataflow graph executor owning one worker thread.
///
/// Nodes register under unique names; `join` wires a named source port to a
/// named sink port with a type check. The worker thread blocks until
/// signalled, drains pending commands in post order, then runs one push pass
/// over all producers and filters.
///
/// All wiring calls are safe from any thread, concurrently with the running
/// loop. Dropping the bin stops it.
///
/// # Example
///
/// ```
/// use sensorbin::{Bin, FnSink, SampleSource};
/// use std::sync::{Arc, Mutex};
///
/// let bin = Bin::new();
/// let probe = Arc::new(SampleSource::<i32>::new("out"));
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let store = Arc::clone(&seen);
/// let collector = Arc::new(FnSink::new("in", move |items: &[i32]| {
///     store.lock().unwrap().extend_from_slice(items);
/// }));
///
/// bin.add_producer("probe", probe.clone()).unwrap();
/// bin.add_consumer("collector", collector).unwrap();
/// bin.join("probe", "out", "collector", "in").unwrap();
///
/// bin.start().unwrap();
/// probe.ingest(&[1, 2, 3]);
/// # while seen.lock().unwrap().len() < 3 { std::thread::yield_now(); }
/// bin.stop().unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
/// ```
pub struct Bin {
    shared: Arc<BinShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    config: BinConfig,
}

impl Default for Bin {
    fn default() -> Self {
        Self::new()
    }
}

impl Bin {
    pub fn new() -> Self {
        Self::with_config(BinConfig::default())
    }

    pub fn with_config(config: BinConfig) -> Self {
        let signal = Arc::new(EventSignal::new());
        Self {
            shared: Arc::new(BinShared {
                registry: Mutex::new(Registry::default()),
                commands: CommandQueue::new(Arc::clone(&signal), config.command_capacity),
                signal,
                running: AtomicBool::new(false),
            }),
            worker: Mutex::new(None),
            config,
        }
    }

    fn ready_callback(&self) -> ReadyCallback {
        let signal = Arc::clone(&self.shared.signal);
        Arc::new(move || signal.signal())
    }

    /// Registers a producer under a unique name.
    ///
    /// The bin's wake-up callback is installed on the node before it can
    /// appear in any push cycle.
    pub fn add_producer(
        &self,
        name: impl Into<String>,
        node: Arc<dyn Producer>,
    ) -> Result<(), GraphError> {
        let name = name.into();
        let mut registry = self.shared.registry.lock().unwrap();
        if registry.producer_name_taken(&name) {
            warn!(%name, "duplicate producer name rejected");
            return Err(GraphError::DuplicateName { name });
        }
        node.set_ready_callback(self.ready_callback());
        debug!(%name, "producer registered");
        registry.producers.push((name, node));
        Ok(())
    }

    /// Registers a consumer under a unique name.
    pub fn add_consumer(
        &self,
        name: impl Into<String>,
        node: Arc<dyn Consumer>,
    ) -> Result<(), GraphError> {
        let name = name.into();
        let mut registry = self.shared.registry.lock().unwrap();
        if registry.consumer_name_taken(&name) {
            warn!(%name, "duplicate consumer name rejected");
            return Err(GraphError::DuplicateName { name });
        }
        debug!(%name, "consumer registered");
        registry.consumers.push((name, node));
        Ok(())
    }

    /// Registers a filter under a unique name.
    ///
    /// The name must be free among producers and consumers alike, since the
    /// filter will answer lookups in both roles.
    pub fn add_filter(
        &self,
        name: impl Into<String>,
        node: Arc<dyn Filter>,
    ) -> Result<(), GraphError> {
        let name = name.into();
        let mut registry = self.shared.registry.lock().unwrap();
        if registry.producer_name_taken(&name) || registry.consumer_name_taken(&name) {
            warn!(%name, "duplicate filter name rejected");
            return Err(GraphError::DuplicateName { name });
        }
        node.set_ready_callback(self.ready_callback());
        debug!(%name, "filter registered");
        registry.filters.push((name, node));
        Ok(())
    }

    /// Removes a producer. Only valid while the worker is stopped.
    pub fn remove_producer(&self, name: &str) -> Result<(), GraphError> {
        self.remove_node(name, |registry| &mut registry.producers)
    }

    /// Removes a consumer. Only valid while the worker is stopped.
    pub fn remove_consumer(&self, name: &str) -> Result<(), GraphError> {
        self.remove_node(name, |registry| &mut registry.consumers)
    }

    /// Removes a filter. Only valid while the worker is stopped.
    pub fn remove_filter(&self, name: &str) -> Result<(), GraphError> {
        self.remove_node(name, |registry| &mut registry.filters)
    }

    fn remove_node<N>(
        &self,
        name: &str,
        select: impl FnOnce(&mut Registry) -> &mut Vec<(String, N)>,
    ) -> Result<(), GraphError> {
        if self.is_running() {
            return Err(GraphError::Running);
        }
        let mut registry = self.shared.registry.lock().unwrap();
        let nodes = select(&mut registry);
        let before = nodes.len();
        nodes.retain(|(n, _)| n != name);
        if nodes.len() == before {
            return Err(GraphError::NodeNotFound { name: name.into() });
        }
        debug!(name, "node removed");
        Ok(())
    }

    /// Wires `producer/source` to `consumer/sink`.
    ///
    /// Filters resolve on either side. Fails without touching the graph when
    /// an endpoint is unknown, the element types differ, or the edge already
    /// exists; every failure is logged with all four names.
    pub fn join(
        &self,
        producer: &str,
        source: &str,
        consumer: &str,
        sink: &str,
    ) -> Result<(), GraphError> {
        let result = self.link(producer, source, consumer, sink, true);
        match &result {
            Ok(()) => debug!(producer, source, consumer, sink, "joined"),
            Err(error) => warn!(producer, source, consumer, sink, %error, "join failed"),
        }
        result
    }

    /// Severs the edge between `producer/source` and `consumer/sink`.
    ///
    /// Fails when the endpoints do not resolve or the edge does not exist.
    pub fn unjoin(
        &self,
        producer: &str,
        source: &str,
        consumer: &str,
        sink: &str,
    ) -> Result<(), GraphError> {
        let result = self.link(producer, source, consumer, sink, false);
        match &result {
            Ok(()) => debug!(producer, source, consumer, sink, "unjoined"),
            Err(error) => warn!(producer, source, consumer, sink, %error, "unjoin failed"),
        }
        result
    }

    fn link(
        &self,
        producer: &str,
        source: &str,
        consumer: &str,
        sink: &str,
        attach: bool,
    ) -> Result<(), GraphError> {
        let registry = self.shared.registry.lock().unwrap();
        let src = registry.find_source(producer, source)?;
        let snk = registry.find_sink(consumer, sink)?;

        let result = if attach {
            src.try_join(snk)
        } else {
            src.try_unjoin(snk)
        };
        result.map_err(|error| match error {
            LinkError::TypeMismatch {
                source_type,
                sink_type,
            } => GraphError::TypeMismatch {
                source_node: producer.into(),
                source_port: source.into(),
                source_type,
                sink_node: consumer.into(),
                sink_port: sink.into(),
                sink_type,
            },
            LinkError::AlreadyJoined => GraphError::AlreadyJoined {
                source_node: producer.into(),
                source_port: source.into(),
                sink_node: consumer.into(),
                sink_port: sink.into(),
            },
            LinkError::NotJoined => GraphError::NotJoined {
                source_node: producer.into(),
                source_port: source.into(),
                sink_node: consumer.into(),
                sink_port: sink.into(),
            },
        })
    }

    /// Injects a command for the worker thread to execute in post order.
    ///
    /// Safe from any thread; wakes the worker.
    pub fn post(&self, command: Box<dyn Command>) {
        self.shared.commands.post(command);
    }

    /// Spawns the worker thread.
    pub fn start(&self) -> Result<(), GraphError> {
        let mut worker = self.worker.lock().unwrap();
        if worker.is_some() {
            return Err(GraphError::AlreadyRunning);
        }

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || worker_loop(&shared))
            .map_err(|error| {
                self.shared.running.store(false, Ordering::Release);
                GraphError::SpawnFailed(error.to_string())
            })?;

        debug!(thread = %self.config.thread_name, "worker started");
        *worker = Some(handle);
        Ok(())
    }

    /// Whether the worker thread is live.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Stops the worker thread and waits for it to exit.
    ///
    /// Posts a stop command and blocks without bound until the worker has
    /// drained it and returned. A bin that was never started, or is already
    /// stopped, returns immediately.
    pub fn stop(&self) -> Result<(), GraphError> {
        let handle = self.worker.lock().unwrap().take();
        let Some(handle) = handle else {
            return Ok(());
        };

        self.shared.commands.post(Box::new(StopCommand));
        let result = handle.join();
        self.shared.running.store(false, Ordering::Release);

        match result {
            Ok(()) => {
                debug!("worker stopped");
                Ok(())
            }
            Err(_) => Err(GraphError::WorkerPanicked),
        }
    }
}

impl Drop for Bin {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// The worker loop: block until signalled, run commands, run one push pass.
///
/// A stop command still lets the cycle that drained it finish its push pass,
/// so data already queued ahead of the stop is flushed. Collaborator panics
/// are not caught here; they unwind the thread and surface in `stop`.
fn worker_loop(shared: &BinShared) {
    debug!("worker loop entered");
    let mut ctl = LoopControl::new();

    while ctl.should_run() {
        shared.signal.wait();

        let executed = shared.commands.drain(&mut ctl);
        if executed > 0 {
            trace!(executed, "commands executed");
        }

        // Producers first, then filters, each in registration order. A
        // cascade that republishes during this pass re-raises the signal,
        // so anything left behind is picked up on the next cycle.
        let (producers, filters) = shared.pushers();
        for node in &producers {
            node.push_new_data();
        }
        for node in &filters {
            node.push_new_data();
        }
    }

    shared.running.store(false, Ordering::Release);
    debug!("worker loop exited");
}
