//! `api` crate — HTTP REST API layer
//!
//! Exposes:
//!   GET    /api/v1/flows
//!   POST   /api/v1/flows
//!   GET    /api/v1/flows/:id
//!   DELETE /api/v1/flows/:id
//!   POST   /api/v1/flows/:id/execute
//!   GET    /api/v1/modules
//!   POST   /api/v1/modules/:id/enable
//!   POST   /api/v1/modules/:id/disable
//!   GET    /api/v1/debug/events
//!   POST   /webhook/:path

pub mod handlers;

use std::path::Path;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use db::DbPool;
use engine::{ExecutorConfig, FlowRunner};
use nodes::ActiveFlowState;
use registry::{ExecutorResolver, ModuleRegistry};
use scheduler::BackgroundFlowScheduler;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub flow_runner: Arc<FlowRunner>,
    pub module_registry: Arc<ModuleRegistry>,
    pub resolver: Arc<ExecutorResolver>,
    pub debug_log: Arc<engine::DebugLog>,
    pub active_flow: Arc<ActiveFlowState>,
    pub scheduler: Arc<BackgroundFlowScheduler>,
}

/// Bootstrap the runtime (module discovery, executor resolver, Flow
/// Runner) and serve the HTTP API on `bind`.
pub async fn serve(
    bind: &str,
    pool: DbPool,
    modules_dir: impl AsRef<Path>,
    config: ExecutorConfig,
) -> Result<(), std::io::Error> {
    let runtime = engine::bootstrap(pool, modules_dir, config)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let state = AppState {
        pool: runtime.pool,
        flow_runner: runtime.flow_runner,
        module_registry: runtime.module_registry,
        resolver: runtime.resolver,
        debug_log: runtime.debug_log,
        active_flow: runtime.active_flow,
        scheduler: runtime.scheduler,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_router = Router::new()
        .route("/flows", get(handlers::flows::list).post(handlers::flows::create))
        .route("/flows/:id", get(handlers::flows::get).delete(handlers::flows::delete))
        .route("/flows/:id/execute", post(handlers::flows::execute))
        .route("/modules", get(handlers::modules::list))
        .route("/modules/:id/enable", post(handlers::modules::enable))
        .route("/modules/:id/disable", post(handlers::modules::disable))
        .route("/debug/events", get(handlers::debug::events));

    let app = Router::new()
        .nest("/api/v1", api_router)
        .route("/webhook/:path", post(handlers::webhooks::handle_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await
}
