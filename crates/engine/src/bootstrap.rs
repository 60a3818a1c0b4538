//! Process-wide wiring: discovers modules, registers the built-in "logic"
//! node types, and assembles a [`FlowRunner`] ready to serve requests.
//!
//! Lives in the `engine` crate (rather than `api` or `cli`) since both the
//! HTTP server and the background worker need the exact same runtime.

use std::path::Path;
use std::sync::Arc;

use nodes::builtins::{ConditionalRouterNode, DelayNode, RepeaterNode, TriggerNode};
use registry::{ExecutorResolver, ModuleRegistry};
use scheduler::BackgroundFlowScheduler;

use crate::debug::DebugLog;
use crate::executor::{ExecutorConfig, FlowRunner};
use crate::store::PgExecutionStore;
use crate::EngineError;

/// The id of the always-available module that ships the core flow-control
/// primitives (trigger, conditional router, repeater, delay). It is a
/// regular discovered module like any other — an operator can disable it
/// through the Module Registry like any plugin.
pub const LOGIC_MODULE_ID: &str = "logic";

/// Everything a server or worker process needs to run flows.
pub struct Runtime {
    pub pool: db::DbPool,
    pub flow_runner: Arc<FlowRunner>,
    pub module_registry: Arc<ModuleRegistry>,
    pub resolver: Arc<ExecutorResolver>,
    pub debug_log: Arc<DebugLog>,
    pub active_flow: Arc<nodes::ActiveFlowState>,
    pub scheduler: Arc<BackgroundFlowScheduler>,
}

/// Discover modules under `modules_dir`, seed the built-in `logic` module
/// if it isn't present yet, and wire up a `FlowRunner`.
pub async fn bootstrap(
    pool: db::DbPool,
    modules_dir: impl AsRef<Path>,
    config: ExecutorConfig,
) -> Result<Runtime, EngineError> {
    let modules_dir = modules_dir.as_ref();
    seed_logic_module(modules_dir)?;

    let module_registry = Arc::new(
        ModuleRegistry::discover(modules_dir).map_err(|e| EngineError::Bootstrap(e.to_string()))?,
    );

    let resolver = Arc::new(ExecutorResolver::new(module_registry.clone()));
    register_builtins(&resolver);

    let debug_log = Arc::new(DebugLog::default());
    let active_flow = Arc::new(nodes::ActiveFlowState::new());
    let scheduler = Arc::new(BackgroundFlowScheduler::new());

    let store = Arc::new(PgExecutionStore::new(pool.clone()));

    let flow_runner = FlowRunner::new_arc(
        store,
        resolver.clone(),
        debug_log.clone(),
        active_flow.clone(),
        scheduler.clone() as Arc<dyn nodes::BackgroundScheduler>,
        config,
    );

    Ok(Runtime {
        pool,
        flow_runner,
        module_registry,
        resolver,
        debug_log,
        active_flow,
        scheduler,
    })
}

fn register_builtins(resolver: &ExecutorResolver) {
    resolver.register(LOGIC_MODULE_ID, "trigger", Arc::new(|| Arc::new(TriggerNode)));
    resolver.register(LOGIC_MODULE_ID, "conditional_router", Arc::new(|| Arc::new(ConditionalRouterNode)));
    resolver.register(LOGIC_MODULE_ID, "repeater", Arc::new(|| Arc::new(RepeaterNode)));
    resolver.register(LOGIC_MODULE_ID, "delay", Arc::new(|| Arc::new(DelayNode)));
}

/// Write a default, enabled `module.json` for the `logic` module if one
/// isn't already on disk — first-run bootstrap only, never overwrites an
/// operator's existing choice to disable it.
fn seed_logic_module(modules_dir: &Path) -> Result<(), EngineError> {
    let dir = modules_dir.join(LOGIC_MODULE_ID);
    let meta_path = dir.join("module.json");
    if meta_path.exists() {
        return Ok(());
    }

    std::fs::create_dir_all(&dir)
        .map_err(|e| EngineError::Bootstrap(format!("failed to create logic module directory: {e}")))?;

    let meta = serde_json::json!({
        "name": "Logic",
        "enabled": true,
        "order": 0,
        "config": {},
    });
    std::fs::write(&meta_path, serde_json::to_vec_pretty(&meta).unwrap())
        .map_err(|e| EngineError::Bootstrap(format!("failed to seed logic module.json: {e}")))?;

    Ok(())
}
