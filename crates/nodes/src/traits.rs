//! The `ExecutableNode` trait — the two-phase contract every node type must
//! fulfil (spec §4.A).

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::background::{BackgroundScheduler, FlowRerunner};
use crate::active_flow::ActiveFlowState;
use crate::NodeError;

/// Reserved config keys the Flow Runner injects into every node's
/// `effective_config` before calling `receive` (spec §4.E.2 step 4).
pub const CONFIG_FLOW_ID_KEY: &str = "_flow_id";
pub const CONFIG_NODE_ID_KEY: &str = "_node_id";

/// Key a node's output mapping may carry to override downstream routing
/// (spec §4.A, §4.E.2 step 5).
pub const ROUTE_TARGETS_KEY: &str = "_route_targets";

/// Context shared by every node invocation within one flow run.
///
/// Defined here (in the nodes crate) so both the engine and individual node
/// implementations can import it without a circular dependency.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// ID of the flow being executed.
    pub flow_id: uuid::Uuid,
    /// ID of the current execution run.
    pub execution_id: uuid::Uuid,
    /// The original input the run was triggered with (constant for the run).
    pub initial_input: Value,
    /// Decrypted secrets scoped to this flow.
    pub secrets: std::collections::HashMap<String, String>,
    /// The process-wide active-flow id, consulted by repeater nodes
    /// before arming another iteration (spec §4.E.5).
    pub active_flow: Arc<ActiveFlowState>,
    /// Handle to the Background Flow Scheduler, used by repeater nodes to
    /// arm their next iteration (spec §4.F).
    pub scheduler: Option<Arc<dyn BackgroundScheduler>>,
    /// Handle that lets a repeater trigger a fresh run of its own flow
    /// (spec §4.E.5).
    pub rerunner: Option<Arc<dyn FlowRerunner>>,
}

/// The result of a node's `receive` phase.
///
/// `Stopped` is the spec's "stopped" sentinel (§4.A): it means the branch
/// produces no output and propagation must not continue past this node.
#[derive(Debug, Clone)]
pub enum NodeSignal {
    /// The node produced data to hand to `send`.
    Continue(Value),
    /// The node suppressed this branch; no further propagation.
    Stopped,
}

impl NodeSignal {
    /// Read `_route_targets` out of a `Continue` value, if present.
    pub fn route_targets(&self) -> Option<Vec<String>> {
        match self {
            NodeSignal::Continue(Value::Object(map)) => map.get(ROUTE_TARGETS_KEY).and_then(|v| {
                v.as_array().map(|arr| {
                    arr.iter()
                        .filter_map(|t| t.as_str().map(str::to_owned))
                        .collect()
                })
            }),
            _ => None,
        }
    }
}

/// The core node trait.
///
/// All built-in nodes and module-provided executors implement this.
/// An executor is constructed fresh for every node invocation — no
/// per-node state survives between runs (spec §4.A).
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Phase one: receive the resolved input and the effective config
    /// (already augmented with `_flow_id`/`_node_id`) and decide what,
    /// if anything, this node publishes.
    async fn receive(
        &self,
        input: Value,
        config: &Value,
        ctx: &ExecutionContext,
    ) -> Result<NodeSignal, NodeError>;

    /// Phase two: a (usually pure) post-processing pass over the data
    /// `receive` decided to publish. Only called when `receive` returned
    /// `NodeSignal::Continue`.
    async fn send(&self, processed: Value) -> Result<Value, NodeError>;
}
