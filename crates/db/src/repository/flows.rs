//! Flow CRUD operations.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::FlowRow, DbError};

/// Insert a new flow into the database.
///
/// `definition` must be a valid JSON object produced by serialising the
/// domain `Flow` type from the `engine` crate.
pub async fn create_flow(
    pool: &PgPool,
    name: &str,
    definition: serde_json::Value,
) -> Result<FlowRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as!(
        FlowRow,
        r#"
        INSERT INTO flows (id, name, definition, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, definition, created_at, is_default
        "#,
        id,
        name,
        definition,
        now,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Insert or replace a flow under an explicit id — used for import and
/// for "make active flow the default" style operations where the
/// caller already knows the id it wants.
pub async fn upsert_flow(
    pool: &PgPool,
    id: Uuid,
    name: &str,
    definition: serde_json::Value,
) -> Result<FlowRow, DbError> {
    let now = Utc::now();

    let row = sqlx::query_as!(
        FlowRow,
        r#"
        INSERT INTO flows (id, name, definition, created_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, definition = EXCLUDED.definition
        RETURNING id, name, definition, created_at, is_default
        "#,
        id,
        name,
        definition,
        now,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch a single flow by its primary key.
pub async fn get_flow(pool: &PgPool, id: Uuid) -> Result<FlowRow, DbError> {
    let row = sqlx::query_as!(
        FlowRow,
        r#"SELECT id, name, definition, created_at, is_default FROM flows WHERE id = $1"#,
        id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Return all flows ordered by creation time (newest first).
pub async fn list_flows(pool: &PgPool) -> Result<Vec<FlowRow>, DbError> {
    let rows = sqlx::query_as!(
        FlowRow,
        r#"SELECT id, name, definition, created_at, is_default FROM flows ORDER BY created_at DESC"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetch the flow currently pinned as default, if any.
pub async fn get_default_flow(pool: &PgPool) -> Result<Option<FlowRow>, DbError> {
    let row = sqlx::query_as!(
        FlowRow,
        r#"SELECT id, name, definition, created_at, is_default FROM flows WHERE is_default"#,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Promote a flow to the canonical "default" slot, demoting whichever
/// flow (if any) previously held it. Atomic: a reader never observes
/// zero or two default flows.
pub async fn make_active_default(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query!("UPDATE flows SET is_default = FALSE WHERE is_default")
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query!("UPDATE flows SET is_default = TRUE WHERE id = $1", id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    tx.commit().await?;
    Ok(())
}

/// Rename a flow in place.
pub async fn rename_flow(pool: &PgPool, id: Uuid, new_name: &str) -> Result<(), DbError> {
    let result = sqlx::query!("UPDATE flows SET name = $1 WHERE id = $2", new_name, id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Permanently delete a flow by its primary key.
///
/// Returns `DbError::NotFound` if no row was deleted.
pub async fn delete_flow(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query!("DELETE FROM flows WHERE id = $1", id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Replace every flow in the table with the given set, in a single
/// transaction — backs the bulk "import flows" operation. `default_id`,
/// if present, re-derives the default-active invariant after the swap
/// (it must name one of the ids in `flows`, or no flow ends up default).
pub async fn replace_all_flows(
    pool: &PgPool,
    flows: Vec<(Uuid, String, serde_json::Value)>,
    default_id: Option<Uuid>,
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query!("DELETE FROM flows").execute(&mut *tx).await?;

    let now = Utc::now();
    for (id, name, definition) in flows {
        let is_default = default_id == Some(id);
        sqlx::query!(
            r#"INSERT INTO flows (id, name, definition, created_at, is_default) VALUES ($1, $2, $3, $4, $5)"#,
            id,
            name,
            definition,
            now,
            is_default,
        )
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}
