//! Sensor-hub pipeline engine.
//!
//! A [`Bin`] owns a dedicated worker thread and a registry of named nodes:
//! producers (device adaptors), consumers (sensor channels), and filters
//! (both at once, transforming data in transit). Nodes expose named, typed
//! ports; [`Bin::join`] wires a source port to a sink port after a type
//! check, and data then flows over [`ringcast`] broadcast rings from the
//! producing threads into the worker loop, cascading through filters into
//! consumers.
//!
//! The worker thread is a cooperative poll loop: it blocks in an
//! [`EventSignal`] until data or a command arrives, drains the command queue
//! in post order, runs one push pass over all producers and filters, and
//! blocks again. It never busy-waits and never misses a wake.
//!
//! # Pipeline shape
//!
//! ```text
//! device thread            worker thread
//!      │                        │
//!      │  ingest()              │
//!      ▼                        ▼
//!  SampleSource ──ring──▶ MapFilter ──ring──▶ FnSink
//!  (producer)             (filter)            (consumer)
//! ```
//!
//! Wiring calls (`add_*`, `join`, `unjoin`) and data ingestion are safe from
//! arbitrary threads while the loop runs. Node removal requires the loop
//! stopped.

mod bin;
mod command;
mod error;
mod node;
mod nodes;
mod ports;
mod signal;

pub use bin::{Bin, BinConfig};
pub use command::{Command, LoopControl, StopCommand};
pub use error::GraphError;
pub use node::{Consumer, Filter, Producer, ReadyCallback};
pub use nodes::{FnSink, MapFilter, SampleSource};
pub use ports::{LinkError, Sink, SinkBase, SinkId, Source, SourceBase};
pub use signal::EventSignal;

// Re-export the transport configuration alongside the ports that take it.
pub use ringcast::{Config as RingConfig, MetricsSnapshot};
