//! Execution and node-execution repository functions.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::{FlowExecutionRow, NodeExecutionRow},
    DbError,
};

// ---------------------------------------------------------------------------
// flow_executions
// ---------------------------------------------------------------------------

/// Create a new flow execution record in `pending` status.
pub async fn create_execution(pool: &PgPool, flow_id: Uuid) -> Result<FlowExecutionRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as!(
        FlowExecutionRow,
        r#"
        INSERT INTO flow_executions (id, flow_id, status, started_at)
        VALUES ($1, $2, 'pending', $3)
        RETURNING id, flow_id, status, started_at, finished_at
        "#,
        id,
        flow_id,
        now,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Update the `status` (and optionally `finished_at`) of a flow execution.
pub async fn update_execution_status(
    pool: &PgPool,
    execution_id: Uuid,
    status: &str,
    finished: bool,
) -> Result<(), DbError> {
    if finished {
        sqlx::query!(
            r#"
            UPDATE flow_executions
            SET status = $1, finished_at = $2
            WHERE id = $3
            "#,
            status,
            Utc::now(),
            execution_id,
        )
        .execute(pool)
        .await?;
    } else {
        sqlx::query!(
            r#"UPDATE flow_executions SET status = $1 WHERE id = $2"#,
            status,
            execution_id,
        )
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Fetch a single flow execution by its primary key.
pub async fn get_execution(pool: &PgPool, execution_id: Uuid) -> Result<FlowExecutionRow, DbError> {
    let row = sqlx::query_as!(
        FlowExecutionRow,
        r#"SELECT id, flow_id, status, started_at, finished_at FROM flow_executions WHERE id = $1"#,
        execution_id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

// ---------------------------------------------------------------------------
// node_executions
// ---------------------------------------------------------------------------

/// Insert a completed node execution record.
pub async fn insert_node_execution(
    pool: &PgPool,
    execution_id: Uuid,
    node_id: &str,
    input: serde_json::Value,
    output: Option<serde_json::Value>,
    status: &str,
    started_at: chrono::DateTime<Utc>,
) -> Result<NodeExecutionRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as!(
        NodeExecutionRow,
        r#"
        INSERT INTO node_executions
            (id, execution_id, node_id, input, output, status, started_at, finished_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, execution_id, node_id, input, output, status, started_at, finished_at
        "#,
        id,
        execution_id,
        node_id,
        input,
        output,
        status,
        started_at,
        now,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Return every node execution recorded for a given flow execution, in
/// the order they finished.
pub async fn list_node_executions(
    pool: &PgPool,
    execution_id: Uuid,
) -> Result<Vec<NodeExecutionRow>, DbError> {
    let rows = sqlx::query_as!(
        NodeExecutionRow,
        r#"
        SELECT id, execution_id, node_id, input, output, status, started_at, finished_at
        FROM node_executions
        WHERE execution_id = $1
        ORDER BY started_at ASC
        "#,
        execution_id,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
