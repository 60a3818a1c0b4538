//! `TriggerNode` — a pure pass-through, used for manual/webhook/cron entry
//! points that don't need to transform the initial payload.

use async_trait::async_trait;
use serde_json::Value;

use crate::traits::{ExecutionContext, NodeSignal};
use crate::{ExecutableNode, NodeError};

pub struct TriggerNode;

#[async_trait]
impl ExecutableNode for TriggerNode {
    async fn receive(
        &self,
        input: Value,
        _config: &Value,
        _ctx: &ExecutionContext,
    ) -> Result<NodeSignal, NodeError> {
        Ok(NodeSignal::Continue(input))
    }

    async fn send(&self, processed: Value) -> Result<Value, NodeError> {
        Ok(processed)
    }
}
