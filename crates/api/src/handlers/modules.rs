use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use registry::RegistryError;

use super::AppState;

pub async fn list(State(state): State<AppState>) -> Json<Vec<registry::ModuleMetadata>> {
    Json(state.module_registry.list())
}

pub async fn enable(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<registry::ModuleMetadata>, StatusCode> {
    toggle(&state, &id, true)
}

pub async fn disable(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<registry::ModuleMetadata>, StatusCode> {
    toggle(&state, &id, false)
}

/// Toggling a module must invalidate the Executor Resolver's cache —
/// otherwise a disabled module's nodes keep resolving from cache until
/// the process restarts.
fn toggle(state: &AppState, id: &str, enabled: bool) -> Result<Json<registry::ModuleMetadata>, StatusCode> {
    let result = if enabled {
        state.module_registry.enable(id)
    } else {
        state.module_registry.disable(id)
    };

    match result {
        Ok(meta) => {
            state.resolver.invalidate();
            Ok(Json(meta))
        }
        Err(RegistryError::ModuleNotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
