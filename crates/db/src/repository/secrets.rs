//! Secret storage, scoped per flow.
//!
//! Values are stored pre-encrypted by the caller (the `api` crate owns
//! the encryption key); this layer only ever sees ciphertext.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::SecretRow, DbError};

pub async fn upsert_secret(
    pool: &PgPool,
    flow_id: Uuid,
    key: &str,
    encrypted_value: &str,
) -> Result<SecretRow, DbError> {
    let id = Uuid::new_v4();

    let row = sqlx::query_as!(
        SecretRow,
        r#"
        INSERT INTO secrets (id, flow_id, key, encrypted_value)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (flow_id, key) DO UPDATE SET encrypted_value = EXCLUDED.encrypted_value
        RETURNING id, flow_id, key, encrypted_value
        "#,
        id,
        flow_id,
        key,
        encrypted_value,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn list_secrets(pool: &PgPool, flow_id: Uuid) -> Result<Vec<SecretRow>, DbError> {
    let rows = sqlx::query_as!(
        SecretRow,
        r#"SELECT id, flow_id, key, encrypted_value FROM secrets WHERE flow_id = $1"#,
        flow_id,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn delete_secret(pool: &PgPool, flow_id: Uuid, key: &str) -> Result<(), DbError> {
    let result = sqlx::query!(
        "DELETE FROM secrets WHERE flow_id = $1 AND key = $2",
        flow_id,
        key,
    )
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
