//! Flow execution engine.
//!
//! `FlowRunner` is the central orchestrator:
//! 1. Builds bridge groups and a cycle-tolerant execution order hint.
//! 2. Drives a queue of pending node ids, dispatching each via the
//!    Executor Resolver and the two-phase `receive`/`send` contract.
//! 3. Resolves a node's input from its parents' published outputs
//!    (merged left-to-right), honouring bridge peers and `_route_targets`.
//! 4. Persists per-node results via the `db` crate.
//! 5. Retries `NodeError::Retryable` (up to `max_retries`, exponential
//!    back-off) before promoting it to fatal; `NodeError::Fatal` aborts
//!    the whole run immediately.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use nodes::traits::{CONFIG_FLOW_ID_KEY, CONFIG_NODE_ID_KEY};
use nodes::{ActiveFlowState, BackgroundScheduler, ExecutableNode, ExecutionContext, FlowRerunner, NodeError, NodeSignal};
use registry::ExecutorResolver;

use crate::dag::{build_bridge_groups, compute_execution_order};
use crate::debug::{DebugEvent, DebugLog};
use crate::models::{Flow, NodeDefinition};
use crate::store::ExecutionStore;
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the runner.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of times a retryable node failure will be retried
    /// before it is promoted to fatal.
    pub max_retries: u32,
    /// Base delay for exponential back-off between retries.
    pub retry_base_delay: Duration,
    /// Per-node execution cap within one run, guarding against runaway
    /// cycles.
    pub max_node_runs: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay: Duration::from_millis(100),
            max_node_runs: 1000,
        }
    }
}

// ---------------------------------------------------------------------------
// Output of a completed execution
// ---------------------------------------------------------------------------

/// The result of running a full flow.
#[derive(Debug)]
pub struct ExecutionResult {
    /// ID of the `flow_executions` row created for this run.
    pub execution_id: Uuid,
    /// The output of the last node (in execution-order) that didn't stop,
    /// `{}` if every branch stopped, or `{"error": "..."}` if a node
    /// failed fatally or exhausted its retries.
    pub output: Value,
}

// ---------------------------------------------------------------------------
// FlowRunner
// ---------------------------------------------------------------------------

/// Stateless-per-call orchestrator; holds only process-wide shared
/// collaborators. Construct one per process and share it behind an
/// `Arc`.
pub struct FlowRunner {
    store: Arc<dyn ExecutionStore>,
    resolver: Arc<ExecutorResolver>,
    debug_log: Arc<DebugLog>,
    active_flow: Arc<ActiveFlowState>,
    scheduler: Arc<dyn BackgroundScheduler>,
    config: ExecutorConfig,
    /// Lets `run` hand repeater nodes a `FlowRerunner` pointing back at
    /// this same runner, without an owning `Arc<FlowRunner>` on hand.
    self_ref: std::sync::Weak<FlowRunner>,
}

impl FlowRunner {
    /// Construct a runner behind an `Arc`, wiring its self-referential
    /// `FlowRerunner` handle via `Arc::new_cyclic`.
    pub fn new_arc(
        store: Arc<dyn ExecutionStore>,
        resolver: Arc<ExecutorResolver>,
        debug_log: Arc<DebugLog>,
        active_flow: Arc<ActiveFlowState>,
        scheduler: Arc<dyn BackgroundScheduler>,
        config: ExecutorConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            store,
            resolver,
            debug_log,
            active_flow,
            scheduler,
            config,
            self_ref: weak.clone(),
        })
    }

    /// Run the flow and return its final output.
    ///
    /// # Errors
    /// Returns `EngineError` for validation failures, an unknown start
    /// node, fatal node errors, retry exhaustion, or database problems.
    #[instrument(skip(self, initial_input), fields(flow_id = %flow.id))]
    pub async fn run(
        &self,
        flow: &Flow,
        initial_input: Value,
        start_node_id: Option<String>,
    ) -> Result<ExecutionResult, EngineError> {
        crate::dag::validate_flow(flow)?;

        if let Some(ref start) = start_node_id {
            if !flow.nodes.iter().any(|n| &n.id == start) {
                return Err(EngineError::StartNodeNotFound(start.clone()));
            }
        }

        let bridge_groups = build_bridge_groups(flow);
        let execution_order = compute_execution_order(flow, &bridge_groups);

        info!(
            "flow '{}' — {} nodes, execution order hint: {:?}",
            flow.id,
            flow.nodes.len(),
            execution_order
        );

        let execution_id = self.store.create_execution(flow.id).await?;
        self.store.update_execution_status(execution_id, "running", false).await?;

        let node_map: HashMap<&str, &NodeDefinition> =
            flow.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

        let mut execution_queue: VecDeque<String> = match &start_node_id {
            Some(id) => VecDeque::from([id.clone()]),
            None => execution_order.iter().cloned().collect(),
        };

        let mut node_outputs: HashMap<String, Option<Value>> = HashMap::new();
        let mut run_counts: HashMap<String, u32> =
            flow.nodes.iter().map(|n| (n.id.clone(), 0)).collect();

        let ctx = ExecutionContext {
            flow_id: flow.id,
            execution_id,
            initial_input: initial_input.clone(),
            secrets: HashMap::new(),
            active_flow: self.active_flow.clone(),
            scheduler: Some(self.scheduler.clone()),
            rerunner: self.self_ref.upgrade().map(|arc| arc as Arc<dyn FlowRerunner>),
        };

        while let Some(node_id) = execution_queue.pop_front() {
            let count = run_counts.entry(node_id.clone()).or_insert(0);
            if *count >= self.config.max_node_runs {
                warn!(
                    "node '{}' hit max execution limit ({}), stopping branch",
                    node_id, self.config.max_node_runs
                );
                continue;
            }
            *count += 1;

            let Some(&node_def) = node_map.get(node_id.as_str()) else {
                continue;
            };

            self.debug_log.log(flow.id, node_id.as_str(), node_def.name.as_str(), DebugEvent::Start, json!({}));

            // -------------------------------------------------------------
            // 1. Resolve input.
            // -------------------------------------------------------------
            let is_forced_start = start_node_id.as_deref() == Some(node_id.as_str());
            let incoming: Vec<_> = flow.connections.iter().filter(|c| c.to == node_id).collect();

            let node_input = if is_forced_start || incoming.is_empty() {
                initial_input.clone()
            } else {
                let mut relevant = incoming.clone();
                if let Some(peers) = bridge_groups.get(&node_id) {
                    for peer in peers {
                        relevant.extend(flow.connections.iter().filter(|c| &c.to == peer));
                    }
                }

                let mut parent_outputs: Vec<Value> = Vec::new();
                for conn in &relevant {
                    if let Some(Some(out)) = node_outputs.get(conn.from.as_str()) {
                        parent_outputs.push(out.clone());
                    }
                }

                if parent_outputs.is_empty() {
                    node_outputs.insert(node_id.clone(), None);
                    continue;
                }

                merge_parent_outputs(parent_outputs)
            };

            self.debug_log.log(
                flow.id,
                node_id.as_str(),
                node_def.name.as_str(),
                DebugEvent::InputResolved,
                json!({ "input": node_input }),
            );

            // -------------------------------------------------------------
            // 2. Dispatch.
            // -------------------------------------------------------------
            let executor = self.resolver.resolve(&node_def.module_id, &node_def.node_type_id);

            let Some(executor) = executor else {
                warn!(
                    "no executor for module '{}' node type '{}' on node '{}' — passing through",
                    node_def.module_id, node_def.node_type_id, node_id
                );
                node_outputs.insert(node_id.clone(), Some(node_input.clone()));
                self.enqueue_downstream(flow, &bridge_groups, &node_id, &node_input, &mut node_outputs, &mut execution_queue);
                continue;
            };

            let mut effective_config = node_def.config.clone();
            if !effective_config.is_object() {
                effective_config = json!({});
            }
            {
                let obj = effective_config.as_object_mut().unwrap();
                obj.insert(CONFIG_FLOW_ID_KEY.to_string(), json!(flow.id.to_string()));
                obj.insert(CONFIG_NODE_ID_KEY.to_string(), json!(node_id.clone()));
            }

            let signal = match self
                .execute_with_retry(&node_id, &node_def.name, executor.as_ref(), node_input.clone(), &effective_config, &ctx)
                .await
            {
                Ok(signal) => signal,
                Err(engine_err) => {
                    let message = executor_failure_message(&node_def.name, &engine_err);

                    self.debug_log.log(
                        flow.id,
                        node_id.as_str(),
                        node_def.name.as_str(),
                        DebugEvent::Error,
                        json!({ "error": message }),
                    );
                    error!("{}", message);

                    let _ = self
                        .store
                        .insert_node_execution(
                            execution_id,
                            &node_id,
                            node_input.clone(),
                            None,
                            "failed",
                            chrono::Utc::now(),
                        )
                        .await;
                    let _ = self.store.update_execution_status(execution_id, "failed", true).await;

                    // The single-return-value contract (spec §4.E): a run's
                    // result is either a normal output or an error mapping,
                    // never a dropped Rust exception — so this comes back
                    // as data on `ExecutionResult`, not as `Err`.
                    return Ok(ExecutionResult {
                        execution_id,
                        output: json!({ "error": message }),
                    });
                }
            };

            let mut output = match signal {
                NodeSignal::Stopped => {
                    node_outputs.insert(node_id.clone(), None);
                    continue;
                }
                NodeSignal::Continue(v) => v,
            };

            // -------------------------------------------------------------
            // 3. Context propagation assist.
            // -------------------------------------------------------------
            if let Some(messages) = node_input.get("messages") {
                if output.get("messages").is_none() {
                    if let Some(obj) = output.as_object_mut() {
                        obj.insert("messages".to_string(), messages.clone());
                    }
                }
            }

            self.store
                .insert_node_execution(
                    execution_id,
                    &node_id,
                    node_input.clone(),
                    Some(output.clone()),
                    "succeeded",
                    chrono::Utc::now(),
                )
                .await?;

            self.debug_log
                .log(flow.id, node_id.as_str(), node_def.name.as_str(), DebugEvent::End, json!({ "output": output }));

            node_outputs.insert(node_id.clone(), Some(output.clone()));
            self.enqueue_downstream(flow, &bridge_groups, &node_id, &output, &mut node_outputs, &mut execution_queue);
        }

        self.store.update_execution_status(execution_id, "succeeded", true).await?;
        info!("flow '{}' execution {} succeeded", flow.id, execution_id);

        Ok(ExecutionResult {
            execution_id,
            output: select_result(&execution_order, &node_outputs),
        })
    }

    /// Publish `output` to every bridge peer and enqueue downstream
    /// candidates, honouring `_route_targets` when present.
    fn enqueue_downstream(
        &self,
        flow: &Flow,
        bridge_groups: &crate::dag::BridgeGroups,
        node_id: &str,
        output: &Value,
        node_outputs: &mut HashMap<String, Option<Value>>,
        execution_queue: &mut VecDeque<String>,
    ) {
        let allowed_targets = NodeSignal::Continue(output.clone()).route_targets();

        let mut downstream: Vec<String> = flow
            .connections
            .iter()
            .filter(|c| c.from == node_id)
            .map(|c| c.to.clone())
            .collect();

        if let Some(peers) = bridge_groups.get(node_id) {
            for peer in peers {
                node_outputs.insert(peer.clone(), Some(output.clone()));
                downstream.extend(flow.connections.iter().filter(|c| &c.from == peer).map(|c| c.to.clone()));
            }
        }

        for child_id in downstream {
            if let Some(allowed) = &allowed_targets {
                if !allowed.contains(&child_id) {
                    continue;
                }
            }
            if !execution_queue.contains(&child_id) {
                execution_queue.push_back(child_id);
            }
        }
    }

    async fn execute_with_retry(
        &self,
        node_id: &str,
        name: &str,
        node: &dyn ExecutableNode,
        input: Value,
        config: &Value,
        ctx: &ExecutionContext,
    ) -> Result<NodeSignal, EngineError> {
        let mut attempts = 0u32;

        loop {
            match node.receive(input.clone(), config, ctx).await {
                Ok(signal) => {
                    let value = match signal {
                        NodeSignal::Stopped => return Ok(NodeSignal::Stopped),
                        NodeSignal::Continue(v) => v,
                    };
                    return node
                        .send(value)
                        .await
                        .map(NodeSignal::Continue)
                        .map_err(|err| node_error_to_engine(node_id, name, err));
                }

                Err(NodeError::Fatal(msg)) => {
                    return Err(EngineError::NodeFatal {
                        node_id: node_id.to_owned(),
                        name: name.to_owned(),
                        message: msg,
                    });
                }

                Err(NodeError::Retryable(msg)) => {
                    attempts += 1;
                    if attempts > self.config.max_retries {
                        return Err(EngineError::NodeRetryExhausted {
                            node_id: node_id.to_owned(),
                            message: msg,
                        });
                    }

                    let delay = self.config.retry_base_delay * 2u32.pow(attempts.saturating_sub(1));
                    warn!(
                        "node '{}' retryable error (attempt {}/{}), retrying in {:?}: {}",
                        node_id, attempts, self.config.max_retries, delay, msg
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn node_error_to_engine(node_id: &str, name: &str, err: NodeError) -> EngineError {
    match err {
        NodeError::Fatal(message) => EngineError::NodeFatal {
            node_id: node_id.to_owned(),
            name: name.to_owned(),
            message,
        },
        NodeError::Retryable(message) => EngineError::NodeFatal {
            node_id: node_id.to_owned(),
            name: name.to_owned(),
            message: format!("retryable error surfaced from send(): {message}"),
        },
    }
}

/// Render an `EngineError` coming out of `execute_with_retry` the way
/// spec's run-result contract expects: `"Execution failed at node
/// '<name>': <message>"`, regardless of whether the node failed outright
/// or exhausted its retries.
fn executor_failure_message(name: &str, err: &EngineError) -> String {
    match err {
        EngineError::NodeRetryExhausted { message, .. } => {
            format!("Execution failed at node '{name}': {message}")
        }
        other => other.to_string(),
    }
}

/// Merge parent outputs left-to-right: mapping parents merge keys (last
/// writer wins), a primitive parent replaces the accumulator entirely.
fn merge_parent_outputs(parent_outputs: Vec<Value>) -> Value {
    let mut acc = Value::Object(serde_json::Map::new());
    for parent in parent_outputs {
        match parent {
            Value::Object(map) => {
                if let Some(acc_obj) = acc.as_object_mut() {
                    for (k, v) in map {
                        acc_obj.insert(k, v);
                    }
                } else {
                    acc = Value::Object(map);
                }
            }
            other => acc = other,
        }
    }
    acc
}

/// Walk the execution order in reverse and return the first output that
/// isn't "stopped"; `{}` if every branch stopped.
fn select_result(execution_order: &[String], node_outputs: &HashMap<String, Option<Value>>) -> Value {
    for node_id in execution_order.iter().rev() {
        if let Some(Some(out)) = node_outputs.get(node_id) {
            return out.clone();
        }
    }
    json!({})
}

// ---------------------------------------------------------------------------
// FlowRerunner: lets the repeater built-in trigger a fresh run of this
// same flow, starting at its own node, without `nodes` depending on
// `engine`.
// ---------------------------------------------------------------------------

#[async_trait]
impl FlowRerunner for FlowRunner {
    async fn rerun(&self, flow_id: Uuid, start_node_id: String, input: Value) -> Result<(), String> {
        let flow = self.store.get_flow(flow_id).await.map_err(|e| e.to_string())?;

        let result = self.run(&flow, input, Some(start_node_id)).await.map_err(|e| e.to_string())?;

        if let Some(error) = result.output.get("error").and_then(|v| v.as_str()) {
            return Err(error.to_string());
        }

        Ok(())
    }
}
