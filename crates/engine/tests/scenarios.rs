//! Scenario-level coverage of the two-phase contract, conditional
//! routing, bridges, cycle bounding, and fatal-error propagation — all
//! driven through `engine::FlowRunner::run()` itself, backed by an
//! in-memory `ExecutionStore` stand-in (see `support/mod.rs`) instead of
//! a live Postgres pool.

mod support;

use std::sync::Arc;

use serde_json::{json, Value};

use engine::{Bridge, Connection, DebugLog, ExecutionResult, ExecutorConfig, Flow, FlowRunner, NodeDefinition, Trigger};
use nodes::builtins::{router_config, ConditionalRouterNode, TriggerNode};
use nodes::mock::MockNode;
use nodes::traits::ROUTE_TARGETS_KEY;
use nodes::{ActiveFlowState, BackgroundScheduler, ExecutableNode, FlowRerunner};
use scheduler::BackgroundFlowScheduler;

use support::{resolver_with_modules, InMemoryStore};

fn node(id: &str, module_id: &str, node_type_id: &str, config: Value) -> NodeDefinition {
    NodeDefinition {
        id: id.to_string(),
        module_id: module_id.to_string(),
        node_type_id: node_type_id.to_string(),
        name: id.to_string(),
        config,
    }
}

/// Wire a `FlowRunner` over `resolver`, backed by a fresh `InMemoryStore`.
/// Returns both so tests can assert against the store's recorded history.
fn runner_with(resolver: Arc<registry::ExecutorResolver>, config: ExecutorConfig) -> (Arc<FlowRunner>, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let debug_log = Arc::new(DebugLog::default());
    let active_flow = Arc::new(ActiveFlowState::new());
    let scheduler = Arc::new(BackgroundFlowScheduler::new()) as Arc<dyn BackgroundScheduler>;

    let runner = FlowRunner::new_arc(store.clone(), resolver, debug_log, active_flow, scheduler, config);
    (runner, store)
}

/// Scenario 1 — linear chat pipe: input -> system -> llm -> output,
/// driven end-to-end through `FlowRunner::run`.
#[tokio::test]
async fn linear_chat_pipe_threads_llm_content_through() {
    let flow = Flow::new(
        "chat-pipe",
        Trigger::Manual,
        vec![
            node("system", "logic", "trigger", Value::Null),
            node("llm", "test", "mock_llm", Value::Null),
            node("output", "logic", "trigger", Value::Null),
        ],
        vec![
            Connection { from: "system".into(), to: "llm".into() },
            Connection { from: "llm".into(), to: "output".into() },
        ],
        vec![],
    );

    let resolver = resolver_with_modules(&["logic", "test"]);
    resolver.register("logic", "trigger", Arc::new(|| Arc::new(TriggerNode)));
    resolver.register(
        "test",
        "mock_llm",
        Arc::new(|| {
            Arc::new(MockNode::returning(
                "llm",
                json!({ "choices": [{ "message": { "content": "Hello" } }] }),
            ))
        }),
    );

    let (runner, store) = runner_with(resolver, ExecutorConfig::default());
    let initial = json!({ "messages": [{ "role": "user", "content": "Hi" }] });

    let ExecutionResult { execution_id, output } = runner.run(&flow, initial, None).await.unwrap();

    // system and output are pure pass-throughs; only llm transforms the
    // payload, and its content survives both hops unchanged.
    assert_eq!(output["choices"][0]["message"]["content"], "Hello");
    assert_eq!(store.final_status(execution_id), Some(("succeeded".to_string(), true)));
}

/// Scenario 2 — conditional route on tool-calls, end to end: the router
/// is the flow's only downstream node, so its routed output is the run's
/// result.
#[tokio::test]
async fn conditional_router_enqueues_only_the_true_branch() {
    let router_config = router_config("tool_calls", vec!["A".into()], vec!["B".into()], false);
    let flow = Flow::new(
        "router-flow",
        Trigger::Manual,
        vec![
            node("start", "logic", "trigger", Value::Null),
            node("router", "logic", "router", router_config),
        ],
        vec![Connection { from: "start".into(), to: "router".into() }],
        vec![],
    );

    let resolver = resolver_with_modules(&["logic"]);
    resolver.register("logic", "trigger", Arc::new(|| Arc::new(TriggerNode)));
    resolver.register("logic", "router", Arc::new(|| Arc::new(ConditionalRouterNode)));

    let (runner, _store) = runner_with(resolver, ExecutorConfig::default());
    let initial = json!({ "choices": [{ "message": { "tool_calls": [{ "id": "1" }] } }] });

    let ExecutionResult { output, .. } = runner.run(&flow, initial, None).await.unwrap();

    let targets: Vec<String> = output[ROUTE_TARGETS_KEY]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert_eq!(targets, vec!["A".to_string()]);
}

/// Scenario 3 — bridged output: a connection into one bridge member makes
/// both members reachable and both members' own downstream connections
/// fire, exercised as an actual run rather than just a DAG-ordering check.
#[tokio::test]
async fn bridged_peers_both_publish_and_both_route_downstream() {
    let flow = Flow::new(
        "bridged",
        Trigger::Manual,
        vec![
            node("llm", "test", "mock_llm", Value::Null),
            node("out1", "test", "mock_out1", Value::Null),
            node("out2", "test", "mock_out2", Value::Null),
            node("child1", "test", "mock_child1", Value::Null),
            node("child2", "test", "mock_child2", Value::Null),
        ],
        vec![
            Connection { from: "llm".into(), to: "out1".into() },
            Connection { from: "out1".into(), to: "child1".into() },
            Connection { from: "out2".into(), to: "child2".into() },
        ],
        vec![Bridge { from: "out1".into(), to: "out2".into() }],
    );

    let resolver = resolver_with_modules(&["test"]);
    for id in ["llm", "out1", "out2", "child1", "child2"] {
        let type_id = format!("mock_{id}");
        resolver.register(
            "test",
            type_id,
            Arc::new(move || Arc::new(MockNode::returning(id, json!({})))),
        );
    }

    let (runner, store) = runner_with(resolver, ExecutorConfig::default());
    runner.run(&flow, json!({}), None).await.unwrap();

    let visited: Vec<String> = store.node_executions().into_iter().map(|r| r.node_id).collect();
    // out2 never has a direct incoming connection — it only runs because
    // the bridge makes it a peer of out1 — and child2 only runs because
    // out2 published to it.
    assert!(visited.contains(&"out2".to_string()));
    assert!(visited.contains(&"child2".to_string()));
}

/// Scenario 4 — a 2-cycle bounded by `max_node_runs`, run through the
/// real queue-driven loop in `FlowRunner::run`.
#[tokio::test]
async fn cycle_is_bounded_by_max_node_runs() {
    const MAX_NODE_RUNS: u32 = 3;

    let flow = Flow::new(
        "cycle",
        Trigger::Manual,
        vec![node("a", "test", "mock_a", Value::Null), node("b", "test", "mock_b", Value::Null)],
        vec![
            Connection { from: "a".into(), to: "b".into() },
            Connection { from: "b".into(), to: "a".into() },
        ],
        vec![],
    );

    let a_mock = Arc::new(MockNode::returning("a", json!({})));
    let b_mock = Arc::new(MockNode::returning("b", json!({})));
    let a_for_ctor = a_mock.clone();
    let b_for_ctor = b_mock.clone();

    let resolver = resolver_with_modules(&["test"]);
    resolver.register("test", "mock_a", Arc::new(move || a_for_ctor.clone() as Arc<dyn ExecutableNode>));
    resolver.register("test", "mock_b", Arc::new(move || b_for_ctor.clone() as Arc<dyn ExecutableNode>));

    let config = ExecutorConfig { max_node_runs: MAX_NODE_RUNS, ..Default::default() };
    let (runner, _store) = runner_with(resolver, config);

    runner.run(&flow, json!({}), None).await.unwrap();

    assert_eq!(a_mock.call_count(), MAX_NODE_RUNS as usize);
    assert_eq!(b_mock.call_count(), MAX_NODE_RUNS as usize);
}

/// Scenario 6 — a fatal error on a middle node stops the branch and comes
/// back as the run's `{"error": "..."}` result, not a dropped exception;
/// the downstream node never runs.
#[tokio::test]
async fn fatal_error_on_middle_node_stops_downstream_execution() {
    let flow = Flow::new(
        "fatal",
        Trigger::Manual,
        vec![
            node("ok", "test", "mock_ok", Value::Null),
            node("boom", "test", "mock_boom", Value::Null),
            node("never", "test", "mock_never", Value::Null),
        ],
        vec![
            Connection { from: "ok".into(), to: "boom".into() },
            Connection { from: "boom".into(), to: "never".into() },
        ],
        vec![],
    );

    let never_mock = Arc::new(MockNode::returning("never", json!({})));
    let never_for_ctor = never_mock.clone();

    let resolver = resolver_with_modules(&["test"]);
    resolver.register("test", "mock_ok", Arc::new(|| Arc::new(MockNode::returning("ok", json!({})))));
    resolver.register(
        "test",
        "mock_boom",
        Arc::new(|| Arc::new(MockNode::failing_fatal("boom", "node blew up"))),
    );
    resolver.register("test", "mock_never", Arc::new(move || never_for_ctor.clone() as Arc<dyn ExecutableNode>));

    let (runner, store) = runner_with(resolver, ExecutorConfig::default());

    let ExecutionResult { execution_id, output } = runner.run(&flow, json!({}), None).await.unwrap();

    assert_eq!(
        output,
        json!({ "error": "Execution failed at node 'boom': node blew up" })
    );
    assert_eq!(never_mock.call_count(), 0);
    assert_eq!(store.final_status(execution_id), Some(("failed".to_string(), true)));
}

/// Scenario 7 — `FlowRerunner::rerun` looks the flow up through the same
/// `ExecutionStore` seam and re-runs it from `start_node_id`, surfacing a
/// node's fatal failure as an `Err(String)` rather than swallowing it.
#[tokio::test]
async fn rerun_looks_up_the_flow_and_restarts_from_the_given_node() {
    let flow = Flow::new(
        "rerun-flow",
        Trigger::Manual,
        vec![node("a", "test", "mock_a", Value::Null), node("b", "test", "mock_b", Value::Null)],
        vec![Connection { from: "a".into(), to: "b".into() }],
        vec![],
    );

    let resolver = resolver_with_modules(&["test"]);
    resolver.register("test", "mock_a", Arc::new(|| Arc::new(MockNode::returning("a", json!({})))));
    resolver.register("test", "mock_b", Arc::new(|| Arc::new(MockNode::returning("b", json!({ "redone": true })))));

    let (runner, store) = runner_with(resolver, ExecutorConfig::default());
    store.register_flow(&flow);

    let result = runner.rerun(flow.id, "b".to_string(), json!({ "from": "repeater" })).await;
    assert!(result.is_ok());

    let visited: Vec<String> = store.node_executions().into_iter().map(|r| r.node_id).collect();
    assert_eq!(visited, vec!["b".to_string()]);
}
