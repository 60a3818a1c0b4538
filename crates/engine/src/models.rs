//! Core domain models for the flow engine.
//!
//! These types are the source of truth for what a flow looks like in
//! memory. They can be serialised to/from the JSONB `definition` column
//! of the `flows` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// How a flow is started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Triggered by an incoming HTTP request to `/webhook/{path}`.
    Webhook {
        /// URL path segment that identifies this flow.
        path: String,
    },
    /// Triggered manually via the REST API or CLI.
    Manual,
    /// Triggered on a cron schedule by something outside the core —
    /// the engine itself carries only the expression, it does not run
    /// a wall-clock tick loop.
    Cron {
        /// Standard cron expression (5 fields).
        expression: String,
    },
}

// ---------------------------------------------------------------------------
// NodeDefinition
// ---------------------------------------------------------------------------

/// A single step in the flow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Unique identifier within this flow (referenced by connections and
    /// bridges).
    pub id: String,
    /// Which module owns this node's executor.
    pub module_id: String,
    /// Which of the module's node types this is.
    pub node_type_id: String,
    /// Display name, used only in error messages and debug events.
    #[serde(default)]
    pub name: String,
    /// Arbitrary configuration passed to the node's executor at
    /// execution time.
    #[serde(default)]
    pub config: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Directed edge from one node to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// Undirected equivalence edge: nodes joined by a bridge share outputs
/// and downstream triggers as if they were a single node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bridge {
    pub from: String,
    pub to: String,
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

/// A complete flow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    pub id: Uuid,
    pub name: String,
    #[serde(default = "default_trigger")]
    pub trigger: Trigger,
    pub nodes: Vec<NodeDefinition>,
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub bridges: Vec<Bridge>,
    pub created_at: DateTime<Utc>,
}

fn default_trigger() -> Trigger {
    Trigger::Manual
}

impl Flow {
    /// Convenience constructor for testing.
    pub fn new(
        name: impl Into<String>,
        trigger: Trigger,
        nodes: Vec<NodeDefinition>,
        connections: Vec<Connection>,
        bridges: Vec<Bridge>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            trigger,
            nodes,
            connections,
            bridges,
            created_at: Utc::now(),
        }
    }
}
