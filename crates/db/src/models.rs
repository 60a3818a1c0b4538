//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models — they carry no domain behaviour.
//! Domain types live in the `engine` crate; this crate only knows the
//! flow definition as an opaque JSON blob.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// flows
// ---------------------------------------------------------------------------

/// A persisted flow definition row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FlowRow {
    pub id: Uuid,
    pub name: String,
    /// Full JSON flow definition (nodes, connections, bridges, trigger, …)
    pub definition: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// At most one row in the table may have this set — the flow new
    /// installs boot into, pinned via `make_active_default`.
    pub is_default: bool,
}

// ---------------------------------------------------------------------------
// flow_executions
// ---------------------------------------------------------------------------

/// A persisted flow execution row.
///
/// `status` is a plain string (`"pending"`, `"running"`, `"succeeded"`,
/// `"failed"`) rather than a typed enum — every reader of this row is SQL
/// or a debug/audit log, never a Rust `match`, so a typed enum would just
/// be machinery nothing consumes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FlowExecutionRow {
    pub id: Uuid,
    pub flow_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// node_executions
// ---------------------------------------------------------------------------

/// A persisted node execution row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NodeExecutionRow {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub node_id: String,
    pub input: serde_json::Value,
    pub output: Option<serde_json::Value>,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// secrets
// ---------------------------------------------------------------------------

/// A persisted secret row, scoped to a single flow.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SecretRow {
    pub id: Uuid,
    pub flow_id: Uuid,
    pub key: String,
    /// AES-256 encrypted value (base64-encoded ciphertext).
    pub encrypted_value: String,
}

// ---------------------------------------------------------------------------
// job_queue
// ---------------------------------------------------------------------------

/// A job row fetched from the queue table.
///
/// `status` (`"pending"`, `"processing"`, `"completed"`, `"failed"`,
/// `"dead_lettered"`) is a plain string for the same reason as
/// `FlowExecutionRow::status` above.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub flow_id: Uuid,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
