//! Engine-level error types.

use thiserror::Error;

/// Errors produced by the flow engine (validation + execution).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Validation errors ------

    /// Two or more nodes share the same ID.
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    /// A connection or bridge references a node ID that doesn't exist in
    /// the flow.
    #[error("reference to unknown node '{node_id}' ({side} side)")]
    UnknownNodeReference {
        node_id: String,
        side: &'static str,
    },

    /// `run(..., start_node_id: Some(id))` was called with an id that
    /// isn't in the flow.
    #[error("start node '{0}' not found in flow")]
    StartNodeNotFound(String),

    // ------ Execution errors ------

    /// A node failed with a fatal error; the whole execution is aborted.
    ///
    /// The Display text is the literal contract a run's result carries as
    /// its `{"error": ...}` value — keep the wording in sync with what
    /// `run()` hands back to callers.
    #[error("Execution failed at node '{name}': {message}")]
    NodeFatal {
        node_id: String,
        name: String,
        message: String,
    },

    /// A node's retryable error was exhausted.
    #[error("node '{node_id}' exceeded retry limit: {message}")]
    NodeRetryExhausted {
        node_id: String,
        message: String,
    },

    /// A flow with the given id doesn't exist.
    #[error("flow '{0}' not found")]
    FlowNotFound(uuid::Uuid),

    /// A stored flow definition didn't parse back into `Flow`.
    #[error("flow '{flow_id}' has an invalid stored definition: {message}")]
    InvalidFlowDefinition { flow_id: uuid::Uuid, message: String },

    /// Process startup wiring failed (module discovery, seeding the
    /// built-in logic module's metadata on disk).
    #[error("failed to bootstrap runtime: {0}")]
    Bootstrap(String),

    /// Persistence error from the db crate.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),
}
