//! `DelayNode` — sleeps for a configured number of seconds, then passes
//! its input through unchanged. The simplest possible node that exercises
//! the Executor Contract's suspension point (spec §5 "Suspension points").

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::traits::{ExecutionContext, NodeSignal};
use crate::{ExecutableNode, NodeError};

pub struct DelayNode;

impl DelayNode {
    fn seconds(config: &Value) -> f64 {
        config
            .get("seconds")
            .and_then(Value::as_f64)
            .unwrap_or(1.0)
            .max(0.0)
    }
}

#[async_trait]
impl ExecutableNode for DelayNode {
    async fn receive(
        &self,
        input: Value,
        config: &Value,
        _ctx: &ExecutionContext,
    ) -> Result<NodeSignal, NodeError> {
        let seconds = Self::seconds(config);
        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
        Ok(NodeSignal::Continue(input))
    }

    async fn send(&self, processed: Value) -> Result<Value, NodeError> {
        Ok(processed)
    }
}
