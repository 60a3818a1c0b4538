//! Shared test support for integration tests: an in-memory `ExecutionStore`
//! stand-in (so tests can drive `FlowRunner::run()` without a live
//! Postgres pool) and a resolver pre-wired with enabled modules, mirroring
//! `registry::executor_resolver`'s own `#[cfg(test)]` helper.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine::{EngineError, ExecutionStore, Flow};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RecordedNodeExecution {
    pub node_id: String,
    pub input: Value,
    pub output: Option<Value>,
    pub status: String,
}

/// `ExecutionStore` backed by plain in-memory maps — no Postgres, no
/// migrations, just enough bookkeeping for scenario tests to assert
/// against.
#[derive(Default)]
pub struct InMemoryStore {
    flows: Mutex<HashMap<Uuid, Flow>>,
    statuses: Mutex<HashMap<Uuid, (String, bool)>>,
    node_executions: Mutex<Vec<RecordedNodeExecution>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_flow(&self, flow: &Flow) {
        self.flows.lock().unwrap().insert(flow.id, flow.clone());
    }

    pub fn node_executions(&self) -> Vec<RecordedNodeExecution> {
        self.node_executions.lock().unwrap().clone()
    }

    pub fn final_status(&self, execution_id: Uuid) -> Option<(String, bool)> {
        self.statuses.lock().unwrap().get(&execution_id).cloned()
    }
}

#[async_trait]
impl ExecutionStore for InMemoryStore {
    async fn create_execution(&self, _flow_id: Uuid) -> Result<Uuid, EngineError> {
        let id = Uuid::new_v4();
        self.statuses.lock().unwrap().insert(id, ("pending".to_string(), false));
        Ok(id)
    }

    async fn update_execution_status(
        &self,
        execution_id: Uuid,
        status: &str,
        finished: bool,
    ) -> Result<(), EngineError> {
        self.statuses.lock().unwrap().insert(execution_id, (status.to_string(), finished));
        Ok(())
    }

    async fn insert_node_execution(
        &self,
        _execution_id: Uuid,
        node_id: &str,
        input: Value,
        output: Option<Value>,
        status: &str,
        _started_at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.node_executions.lock().unwrap().push(RecordedNodeExecution {
            node_id: node_id.to_string(),
            input,
            output,
            status: status.to_string(),
        });
        Ok(())
    }

    async fn get_flow(&self, flow_id: Uuid) -> Result<Flow, EngineError> {
        self.flows
            .lock()
            .unwrap()
            .get(&flow_id)
            .cloned()
            .ok_or(EngineError::FlowNotFound(flow_id))
    }
}

/// Build an `ExecutorResolver` backed by a throwaway module directory with
/// one enabled module per id in `module_ids`.
pub fn resolver_with_modules(module_ids: &[&str]) -> Arc<registry::ExecutorResolver> {
    let tmp = tempfile::tempdir().unwrap();
    for module_id in module_ids {
        let module_dir = tmp.path().join(module_id);
        std::fs::create_dir_all(&module_dir).unwrap();
        let meta = serde_json::json!({ "name": module_id, "enabled": true, "order": 1 });
        std::fs::write(module_dir.join("module.json"), serde_json::to_vec(&meta).unwrap()).unwrap();
    }
    // Leak the tempdir for the duration of the test, same as
    // `registry::executor_resolver`'s own helper.
    let path = tmp.into_path();
    let module_registry = Arc::new(registry::ModuleRegistry::discover(path).unwrap());
    Arc::new(registry::ExecutorResolver::new(module_registry))
}
