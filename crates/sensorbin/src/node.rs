use crate::ports::{SinkBase, SourceBase};
use std::sync::Arc;

/// Callback a node invokes to tell its bin that it has output ready.
///
/// Installed once at registration; invocations from any thread coalesce in
/// the bin's event signal, so firing it per batch is cheap.
pub type ReadyCallback = Arc<dyn Fn() + Send + Sync>;

/// A node that emits data on named source ports.
///
/// The push step is the unit of work the worker loop drives: move whatever
/// has accumulated in the node's sources onward to the joined sinks.
pub trait Producer: Send + Sync {
    /// Looks up a source port by exact, case-sensitive name.
    fn source(&self, name: &str) -> Option<&dyn SourceBase>;

    /// Moves buffered output to the joined sinks. Worker thread only.
    fn push_new_data(&self);

    /// Installs the bin's wake-up callback. Called once at registration,
    /// before the node appears in any push cycle.
    fn set_ready_callback(&self, callback: ReadyCallback);
}

/// A node that receives data on named sink ports and emits nothing.
pub trait Consumer: Send + Sync {
    /// Looks up a sink port by exact, case-sensitive name.
    fn sink(&self, name: &str) -> Option<&dyn SinkBase>;
}

/// A node that is both consumer and producer, transforming data in transit.
///
/// Registered under a single name, a filter resolves as a producer when a
/// source port is requested and as a consumer when a sink port is.
pub trait Filter: Producer + Consumer {}
