use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use super::AppState;
use db::repository::{flows as flow_repo, jobs as job_repo};
use engine::Flow;

#[derive(serde::Deserialize)]
pub struct CreateFlowDto {
    pub name: String,
    pub definition: Value,
}

#[derive(serde::Deserialize)]
pub struct ExecuteFlowDto {
    #[serde(default)]
    pub input: Value,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<db::models::FlowRow>>, StatusCode> {
    match flow_repo::list_flows(&state.pool).await {
        Ok(flows) => Ok(Json(flows)),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn get(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<db::models::FlowRow>, StatusCode> {
    match flow_repo::get_flow(&state.pool, id).await {
        Ok(row) => Ok(Json(row)),
        Err(db::DbError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateFlowDto>,
) -> Result<(StatusCode, Json<db::models::FlowRow>), StatusCode> {
    if serde_json::from_value::<Flow>(payload.definition.clone()).is_err() {
        return Err(StatusCode::BAD_REQUEST);
    }

    match flow_repo::create_flow(&state.pool, &payload.name, payload.definition).await {
        Ok(row) => Ok((StatusCode::CREATED, Json(row))),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn delete(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, StatusCode> {
    match flow_repo::delete_flow(&state.pool, id).await {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(db::DbError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// Queue a job for a worker process to pick up — this endpoint only
/// accepts the trigger; running the flow happens out-of-band, the same
/// decoupling `POST /webhook/:path` relies on.
pub async fn execute(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<ExecuteFlowDto>,
) -> Result<(StatusCode, Json<db::models::JobRow>), StatusCode> {
    if flow_repo::get_flow(&state.pool, id).await.is_err() {
        return Err(StatusCode::NOT_FOUND);
    }

    match job_repo::enqueue_job(&state.pool, id, payload.input).await {
        Ok(job) => Ok((StatusCode::ACCEPTED, Json(job))),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
