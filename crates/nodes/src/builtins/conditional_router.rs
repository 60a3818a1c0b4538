//! `ConditionalRouterNode` — evaluates a named field on its input and
//! emits `_route_targets` accordingly (spec §4.E.4).

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::traits::{ExecutionContext, NodeSignal, ROUTE_TARGETS_KEY};
use crate::{ExecutableNode, NodeError};

pub struct ConditionalRouterNode;

impl ConditionalRouterNode {
    /// `input[check_field]`, falling back to the OpenAI-style nested
    /// `choices[0].message[check_field]` when `check_field == "tool_calls"`
    /// and the flat field is absent.
    fn condition_met(input: &Value, check_field: &str) -> bool {
        let Some(obj) = input.as_object() else {
            return false;
        };

        if truthy(obj.get(check_field)) {
            return true;
        }

        if check_field == "tool_calls" {
            if let Some(choices) = obj.get("choices").and_then(Value::as_array) {
                if let Some(message) = choices.first().and_then(|c| c.get("message")) {
                    if truthy(message.get("tool_calls")) {
                        return true;
                    }
                }
            }
        }

        false
    }
}

fn truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
    }
}

#[async_trait]
impl ExecutableNode for ConditionalRouterNode {
    async fn receive(
        &self,
        input: Value,
        config: &Value,
        _ctx: &ExecutionContext,
    ) -> Result<NodeSignal, NodeError> {
        let check_field = config
            .get("check_field")
            .and_then(Value::as_str)
            .unwrap_or("tool_calls");
        let invert = config
            .get("invert")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let mut condition_met = Self::condition_met(&input, check_field);
        if invert {
            condition_met = !condition_met;
        }

        let branch_key = if condition_met {
            "true_branches"
        } else {
            "false_branches"
        };
        let targets = config
            .get(branch_key)
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));

        let mut result: Map<String, Value> = match input {
            Value::Object(map) => map,
            other => {
                let mut m = Map::new();
                m.insert("content".to_string(), other);
                m
            }
        };
        result.insert(ROUTE_TARGETS_KEY.to_string(), targets);

        Ok(NodeSignal::Continue(Value::Object(result)))
    }

    async fn send(&self, processed: Value) -> Result<Value, NodeError> {
        Ok(processed)
    }
}

/// Convenience for module authors building router configs in tests/tools.
pub fn router_config(
    check_field: &str,
    true_branches: Vec<String>,
    false_branches: Vec<String>,
    invert: bool,
) -> Value {
    json!({
        "check_field": check_field,
        "true_branches": true_branches,
        "false_branches": false_branches,
        "invert": invert,
    })
}
