//! `engine` crate — core domain models, DAG/bridge-group analysis, the
//! Debug Log Ring, and the queue-driven Flow Runner.

pub mod bootstrap;
pub mod models;
pub mod error;
pub mod dag;
pub mod debug;
pub mod executor;
pub mod store;

pub use bootstrap::{bootstrap, Runtime, LOGIC_MODULE_ID};
pub use dag::{build_bridge_groups, compute_execution_order, validate_flow, BridgeGroups};
pub use debug::{DebugEvent, DebugLog, DebugLogEntry};
pub use error::EngineError;
pub use executor::{ExecutionResult, ExecutorConfig, FlowRunner};
pub use models::{Bridge, Connection, Flow, NodeDefinition, Trigger};
pub use store::{ExecutionStore, PgExecutionStore};

#[cfg(test)]
mod executor_tests;
