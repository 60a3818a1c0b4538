//! Persistence seam for the Flow Runner.
//!
//! `FlowRunner` talks to this trait instead of `db::repository::executions`
//! and `db::repository::flows::get_flow` directly, so the orchestration
//! logic — the part of this crate that actually matters — can be driven by
//! an in-memory stand-in in tests, the same way `nodes::BackgroundScheduler`
//! and `nodes::FlowRerunner` already let tests swap out their respective
//! collaborators.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::models::Flow;
use crate::EngineError;

/// Everything `FlowRunner::run` needs from storage: creating and updating
/// the `flow_executions`/`node_executions` rows for a run, and fetching the
/// flow definition it's about to execute.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Create a new execution record for `flow_id`, returning its id.
    async fn create_execution(&self, flow_id: Uuid) -> Result<Uuid, EngineError>;

    /// Update the status (and, when `finished`, the finish time) of an
    /// execution record.
    async fn update_execution_status(
        &self,
        execution_id: Uuid,
        status: &str,
        finished: bool,
    ) -> Result<(), EngineError>;

    /// Record a single node's input/output/status for an execution.
    async fn insert_node_execution(
        &self,
        execution_id: Uuid,
        node_id: &str,
        input: Value,
        output: Option<Value>,
        status: &str,
        started_at: DateTime<Utc>,
    ) -> Result<(), EngineError>;

    /// Fetch and parse a flow definition by id.
    async fn get_flow(&self, flow_id: Uuid) -> Result<Flow, EngineError>;
}

/// The real, Postgres-backed implementation — thin delegation to
/// `db::repository::{executions,flows}`.
pub struct PgExecutionStore {
    pool: db::DbPool,
}

impl PgExecutionStore {
    pub fn new(pool: db::DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExecutionStore for PgExecutionStore {
    async fn create_execution(&self, flow_id: Uuid) -> Result<Uuid, EngineError> {
        let row = db::repository::executions::create_execution(&self.pool, flow_id).await?;
        Ok(row.id)
    }

    async fn update_execution_status(
        &self,
        execution_id: Uuid,
        status: &str,
        finished: bool,
    ) -> Result<(), EngineError> {
        db::repository::executions::update_execution_status(&self.pool, execution_id, status, finished)
            .await?;
        Ok(())
    }

    async fn insert_node_execution(
        &self,
        execution_id: Uuid,
        node_id: &str,
        input: Value,
        output: Option<Value>,
        status: &str,
        started_at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        db::repository::executions::insert_node_execution(
            &self.pool,
            execution_id,
            node_id,
            input,
            output,
            status,
            started_at,
        )
        .await?;
        Ok(())
    }

    async fn get_flow(&self, flow_id: Uuid) -> Result<Flow, EngineError> {
        let row = db::repository::flows::get_flow(&self.pool, flow_id).await?;
        serde_json::from_value(row.definition)
            .map_err(|e| EngineError::InvalidFlowDefinition { flow_id, message: e.to_string() })
    }
}
