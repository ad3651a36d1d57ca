use thiserror::Error;

/// Errors reported by the wiring and lifecycle API.
///
/// Every variant is recoverable: a failed call leaves the graph exactly as
/// it was, and the caller may retry with corrected names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// No producer or filter is registered under the given name.
    #[error("no producer or filter registered as `{name}`")]
    ProducerNotFound { name: String },

    /// No consumer or filter is registered under the given name.
    #[error("no consumer or filter registered as `{name}`")]
    ConsumerNotFound { name: String },

    /// The producer exists but exposes no source port with that name.
    #[error("producer `{node}` has no source port `{port}`")]
    SourceNotFound { node: String, port: String },

    /// The consumer exists but exposes no sink port with that name.
    #[error("consumer `{node}` has no sink port `{port}`")]
    SinkNotFound { node: String, port: String },

    /// Source and sink carry different element types; the join did not happen.
    #[error(
        "source `{source_node}/{source_port}` carries `{source_type}` \
         but sink `{sink_node}/{sink_port}` expects `{sink_type}`"
    )]
    TypeMismatch {
        source_node: String,
        source_port: String,
        source_type: &'static str,
        sink_node: String,
        sink_port: String,
        sink_type: &'static str,
    },

    /// The edge already exists.
    #[error("sink `{sink_node}/{sink_port}` is already joined to source `{source_node}/{source_port}`")]
    AlreadyJoined {
        source_node: String,
        source_port: String,
        sink_node: String,
        sink_port: String,
    },

    /// The edge does not exist.
    #[error("sink `{sink_node}/{sink_port}` is not joined to source `{source_node}/{source_port}`")]
    NotJoined {
        source_node: String,
        source_port: String,
        sink_node: String,
        sink_port: String,
    },

    /// A node is already registered under this name in a conflicting role.
    #[error("a node named `{name}` is already registered")]
    DuplicateName { name: String },

    /// No node of the requested role is registered under this name.
    #[error("no node registered as `{name}`")]
    NodeNotFound { name: String },

    /// `start` was called while the worker thread is live.
    #[error("worker thread is already running")]
    AlreadyRunning,

    /// The operation requires the worker thread to be stopped first.
    #[error("operation requires the worker thread to be stopped")]
    Running,

    /// The OS refused to spawn the worker thread.
    #[error("failed to spawn worker thread: {0}")]
    SpawnFailed(String),

    /// The worker thread panicked; the panic came from a collaborator's
    /// push step, which the bin does not catch.
    #[error("worker thread panicked")]
    WorkerPanicked,
}
