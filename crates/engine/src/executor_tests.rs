//! Unit-level tests for the DAG/bridge-group helpers and the bare
//! `ExecutableNode` two-phase contract, driven directly against
//! `MockNode` without a `FlowRunner` in the loop. Scenario-level coverage
//! that exercises `FlowRunner::run()` itself — conditional routing,
//! bridges, cycles, fatal errors — lives in `tests/scenarios.rs`, backed
//! by the in-memory `ExecutionStore` in `tests/support/mod.rs`.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::dag::{build_bridge_groups, compute_execution_order, validate_flow};
use crate::models::{Bridge, Connection, Flow, NodeDefinition, Trigger};
use nodes::mock::MockNode;
use nodes::{ActiveFlowState, ExecutableNode, ExecutionContext, NodeSignal};

fn linear_flow(ids: &[&str]) -> Flow {
    let nodes: Vec<NodeDefinition> = ids
        .iter()
        .map(|id| NodeDefinition {
            id: id.to_string(),
            module_id: "core".into(),
            node_type_id: "mock".into(),
            name: id.to_string(),
            config: Value::Null,
        })
        .collect();

    let connections: Vec<Connection> = ids
        .windows(2)
        .map(|w| Connection { from: w[0].into(), to: w[1].into() })
        .collect();

    Flow::new("test-linear", Trigger::Manual, nodes, connections, vec![])
}

fn make_ctx(flow: &Flow) -> ExecutionContext {
    ExecutionContext {
        flow_id: flow.id,
        execution_id: uuid::Uuid::new_v4(),
        initial_input: json!({}),
        secrets: HashMap::new(),
        active_flow: Arc::new(ActiveFlowState::new()),
        scheduler: None,
        rerunner: None,
    }
}

// ============================================================
// DAG / bridge-group unit tests (no DB required)
// ============================================================

#[test]
fn linear_flow_validates_and_sorts_correctly() {
    let flow = linear_flow(&["step_a", "step_b", "step_c"]);
    validate_flow(&flow).expect("should be a valid flow");
    let groups = build_bridge_groups(&flow);
    let sorted = compute_execution_order(&flow, &groups);
    assert_eq!(sorted, vec!["step_a", "step_b", "step_c"]);
}

#[test]
fn cycle_in_linear_flow_is_tolerated_not_rejected() {
    let mut flow = linear_flow(&["x", "y", "z"]);
    flow.connections.push(Connection { from: "z".into(), to: "x".into() });
    validate_flow(&flow).expect("cycles are a runtime concern, not a validation error");
    let groups = build_bridge_groups(&flow);
    let sorted = compute_execution_order(&flow, &groups);
    assert_eq!(sorted.len(), 3);
}

#[test]
fn missing_node_reference_is_rejected() {
    let flow = Flow::new(
        "bad",
        Trigger::Manual,
        vec![NodeDefinition {
            id: "a".into(),
            module_id: "core".into(),
            node_type_id: "mock".into(),
            name: "a".into(),
            config: Value::Null,
        }],
        vec![Connection { from: "a".into(), to: "b".into() }],
        vec![],
    );
    assert!(validate_flow(&flow).is_err());
}

// ============================================================
// MockNode execution tests (no DB required)
// ============================================================

/// Execute a sequence of MockNodes manually (bypassing FlowRunner + DB)
/// and assert output propagation through the two-phase contract.
#[tokio::test]
async fn three_node_pipeline_output_propagation() {
    let flow = linear_flow(&["node_a", "node_b", "node_c"]);
    let groups = build_bridge_groups(&flow);
    let sorted = compute_execution_order(&flow, &groups);
    let ctx = make_ctx(&flow);

    let nodes: Vec<(&str, MockNode)> = vec![
        ("node_a", MockNode::returning("node_a", json!({ "step": 1 }))),
        ("node_b", MockNode::returning("node_b", json!({ "step": 2 }))),
        ("node_c", MockNode::returning("node_c", json!({ "step": 3 }))),
    ];
    let registry: HashMap<&str, &MockNode> = nodes.iter().map(|(k, v)| (*k, v)).collect();

    let mut current_input = json!({ "origin": "trigger" });
    let mut order_seen: Vec<String> = Vec::new();

    for node_id in &sorted {
        let node = registry[node_id.as_str()];
        let signal = node
            .receive(current_input.clone(), &Value::Null, &ctx)
            .await
            .expect("node should succeed");
        let processed = match signal {
            NodeSignal::Continue(v) => v,
            NodeSignal::Stopped => panic!("node unexpectedly stopped"),
        };
        current_input = node.send(processed).await.expect("send should succeed");
        order_seen.push(node_id.clone());
    }

    assert_eq!(order_seen, vec!["node_a", "node_b", "node_c"]);
    assert_eq!(nodes[0].1.call_count(), 1);
    assert_eq!(nodes[1].1.call_count(), 1);
    assert_eq!(nodes[2].1.call_count(), 1);
    assert_eq!(current_input["node"], "node_c");
    assert_eq!(current_input["step"], 3);
}

#[tokio::test]
async fn fatal_node_error_stops_pipeline() {
    let flow = linear_flow(&["ok", "boom", "never"]);
    let groups = build_bridge_groups(&flow);
    let sorted = compute_execution_order(&flow, &groups);
    let ctx = make_ctx(&flow);

    let ok = MockNode::returning("ok", json!({ "ok": true }));
    let boom = MockNode::failing_fatal("boom", "something broke irreparably");
    let never = MockNode::returning("never", json!({ "should": "not run" }));

    let registry: HashMap<&str, &dyn ExecutableNode> = [
        ("ok", &ok as &dyn ExecutableNode),
        ("boom", &boom as &dyn ExecutableNode),
        ("never", &never as &dyn ExecutableNode),
    ]
    .into_iter()
    .collect();

    let mut current_input = json!({});
    let mut hit_fatal = false;

    for node_id in &sorted {
        let node = registry[node_id.as_str()];
        match node.receive(current_input.clone(), &Value::Null, &ctx).await {
            Ok(NodeSignal::Continue(v)) => current_input = v,
            Ok(NodeSignal::Stopped) => break,
            Err(e) => {
                assert_eq!(node_id, "boom");
                assert!(matches!(e, nodes::NodeError::Fatal(_)));
                hit_fatal = true;
                break;
            }
        }
    }

    assert!(hit_fatal, "expected a fatal error");
    assert_eq!(never.call_count(), 0);
}

#[tokio::test]
async fn retryable_node_error_is_returned_correctly() {
    let node = MockNode::failing_retryable("flaky", "transient failure");
    let ctx = ExecutionContext {
        flow_id: uuid::Uuid::new_v4(),
        execution_id: uuid::Uuid::new_v4(),
        initial_input: json!({}),
        secrets: HashMap::new(),
        active_flow: Arc::new(ActiveFlowState::new()),
        scheduler: None,
        rerunner: None,
    };

    let result = node.receive(json!({}), &Value::Null, &ctx).await;
    assert!(matches!(result, Err(nodes::NodeError::Retryable(_))));
    assert_eq!(node.call_count(), 1);
}

#[tokio::test]
async fn stopped_node_suppresses_propagation() {
    let stopper = MockNode::stopping("gatekeeper");
    let ctx = ExecutionContext {
        flow_id: uuid::Uuid::new_v4(),
        execution_id: uuid::Uuid::new_v4(),
        initial_input: json!({}),
        secrets: HashMap::new(),
        active_flow: Arc::new(ActiveFlowState::new()),
        scheduler: None,
        rerunner: None,
    };

    let signal = stopper.receive(json!({ "x": 1 }), &Value::Null, &ctx).await.unwrap();
    assert!(matches!(signal, NodeSignal::Stopped));
}

#[test]
fn bridged_nodes_share_a_downstream_peer_group() {
    let flow = Flow::new(
        "bridged",
        Trigger::Manual,
        vec![
            NodeDefinition { id: "src".into(), module_id: "core".into(), node_type_id: "mock".into(), name: "src".into(), config: Value::Null },
            NodeDefinition { id: "a".into(), module_id: "core".into(), node_type_id: "mock".into(), name: "a".into(), config: Value::Null },
            NodeDefinition { id: "b".into(), module_id: "core".into(), node_type_id: "mock".into(), name: "b".into(), config: Value::Null },
        ],
        vec![Connection { from: "src".into(), to: "a".into() }],
        vec![Bridge { from: "a".into(), to: "b".into() }],
    );

    let groups = build_bridge_groups(&flow);
    let sorted = compute_execution_order(&flow, &groups);
    let src_pos = sorted.iter().position(|n| n == "src").unwrap();
    let b_pos = sorted.iter().position(|n| n == "b").unwrap();
    assert!(src_pos < b_pos, "bridge peer should be reachable downstream of src");
}
