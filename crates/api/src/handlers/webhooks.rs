use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use super::AppState;
use db::repository::{flows as flow_repo, jobs as job_repo};
use engine::{Flow, Trigger};

pub async fn handle_webhook(
    Path(path): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let flows = match flow_repo::list_flows(&state.pool).await {
        Ok(flows) => flows,
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    let matched = flows.into_iter().find(|row| {
        let flow: Result<Flow, _> = serde_json::from_value(row.definition.clone());
        match flow {
            Ok(flow) => matches!(&flow.trigger, Trigger::Webhook { path: p } if p == &path),
            Err(_) => false,
        }
    });

    let row = match matched {
        Some(row) => row,
        None => return Err(StatusCode::NOT_FOUND),
    };

    match job_repo::enqueue_job(&state.pool, row.id, payload).await {
        Ok(_job) => Ok((StatusCode::ACCEPTED, Json(serde_json::json!({"message": "webhook accepted"})))),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
