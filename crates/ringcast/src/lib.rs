//! Broadcast ring buffer for sensor pipelines.
//!
//! A fixed-capacity circular buffer with exactly one writer and any number of
//! independent readers. Every reader observes every written element through
//! its own cursor; readers never consume data from each other. The writer
//! never waits: when it wraps past data a reader has not yet consumed, that
//! data is silently lost to the lagging reader and counted, never an error.
//!
//! This is the transport between pipeline stages in a sensor-hub daemon,
//! where a stalled consumer must not be able to stall the device feeding it.
//!
//! # Key properties
//!
//! - Unbounded `u64` sequence numbers, buffer index = `seq & mask`
//! - Per-slot sequence stamps so readers detect overwrites without blocking
//!   the writer
//! - Per-reader loss counters plus optional ring-level atomic metrics
//! - Cache-padded hot fields (`crossbeam_utils::CachePadded`)
//!
//! # Example
//!
//! ```
//! use ringcast::{Config, Ring};
//!
//! let ring = Ring::<u64>::new(Config::new(4, false));
//! let mut reader = ring.subscribe();
//!
//! ring.write(&[1, 2, 3]);
//!
//! let mut out = Vec::new();
//! reader.read_into(&mut out, 16);
//! assert_eq!(out, vec![1, 2, 3]);
//! ```

mod config;
mod invariants;
mod metrics;
mod reader;
mod ring;

pub use config::{Config, HIGH_RATE_CONFIG, LOW_RATE_CONFIG};
pub use metrics::{Metrics, MetricsSnapshot};
pub use reader::Reader;
pub use ring::Ring;
