use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::AppState;
use engine::DebugLogEntry;

#[derive(Deserialize)]
pub struct EventsQuery {
    since: Option<DateTime<Utc>>,
}

pub async fn events(
    State(state): State<AppState>,
    axum::extract::Query(query): axum::extract::Query<EventsQuery>,
) -> Result<Json<Vec<DebugLogEntry>>, StatusCode> {
    let entries = match query.since {
        Some(since) => state.debug_log.since(since),
        None => state.debug_log.recent(),
    };
    Ok(Json(entries))
}
