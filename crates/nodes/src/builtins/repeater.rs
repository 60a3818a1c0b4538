//! `RepeaterNode` — passes its input through unchanged and concurrently
//! arms a future re-run of its own flow, starting at itself, bounded by
//! the active-flow liveness check (spec §4.E.5).

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::traits::{ExecutionContext, NodeSignal, CONFIG_FLOW_ID_KEY, CONFIG_NODE_ID_KEY};
use crate::{ExecutableNode, NodeError};

const REPEAT_COUNT_KEY: &str = "_repeat_count";

pub struct RepeaterNode;

impl RepeaterNode {
    fn delay_secs(config: &Value) -> f64 {
        config
            .get("delay")
            .and_then(Value::as_f64)
            .unwrap_or(5.0)
            .max(0.0)
    }

    fn max_repeats(config: &Value) -> u64 {
        config
            .get("max_repeats")
            .and_then(Value::as_u64)
            .unwrap_or(1)
    }

    fn repeat_count(input: &Value) -> u64 {
        input
            .get(REPEAT_COUNT_KEY)
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }
}

#[async_trait]
impl ExecutableNode for RepeaterNode {
    async fn receive(
        &self,
        input: Value,
        config: &Value,
        ctx: &ExecutionContext,
    ) -> Result<NodeSignal, NodeError> {
        let flow_id = config
            .get(CONFIG_FLOW_ID_KEY)
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok());
        let node_id = config
            .get(CONFIG_NODE_ID_KEY)
            .and_then(Value::as_str)
            .map(str::to_owned);

        let (Some(flow_id), Some(node_id), Some(scheduler), Some(rerunner)) =
            (flow_id, node_id, ctx.scheduler.clone(), ctx.rerunner.clone())
        else {
            // No wiring to schedule against (e.g. a bare unit test) — behave
            // as a pure pass-through.
            return Ok(NodeSignal::Continue(input));
        };

        if !ctx.active_flow.is_active(flow_id) {
            return Ok(NodeSignal::Continue(input));
        }

        let delay = Self::delay_secs(config);
        let max_repeats = Self::max_repeats(config);
        let current_repeat = Self::repeat_count(&input);

        if max_repeats == 0 || current_repeat < max_repeats {
            let active_flow = ctx.active_flow.clone();
            let mut next_input = input.clone();
            if let Some(obj) = next_input.as_object_mut() {
                obj.insert(REPEAT_COUNT_KEY.to_string(), json!(current_repeat + 1));
            }

            let task = Box::pin(async move {
                tokio::time::sleep(Duration::from_secs_f64(delay)).await;

                if !active_flow.is_active(flow_id) {
                    return;
                }

                if let Err(err) = rerunner.rerun(flow_id, node_id.clone(), next_input).await {
                    warn!(
                        flow_id = %flow_id,
                        node_id = %node_id,
                        error = %err,
                        "repeater failed to trigger next run"
                    );
                }
            });

            scheduler.spawn(task);
        }

        Ok(NodeSignal::Continue(input))
    }

    async fn send(&self, processed: Value) -> Result<Value, NodeError> {
        Ok(processed)
    }
}
