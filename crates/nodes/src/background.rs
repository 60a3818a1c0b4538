//! Abstraction over the Background Flow Scheduler (spec §4.F), defined here
//! so built-in nodes (the repeater, in particular) can schedule future work
//! without the `nodes` crate depending on the concrete `scheduler` crate.

use std::future::Future;
use std::pin::Pin;

/// A boxed, `'static` future with no output — the unit of work the
/// scheduler tracks.
pub type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Implemented by the concrete Background Flow Scheduler. Spawns `task`
/// and tracks it until completion (spec §4.F `spawn`).
pub trait BackgroundScheduler: Send + Sync {
    /// Launch `task` in the background, tracked until it completes.
    fn spawn(&self, task: BoxedTask);
}

/// Implemented by whatever owns a running `FlowRunner` so a repeater node
/// can trigger "re-run my own flow starting at my own node" without the
/// `nodes` crate depending on the `engine` crate (spec §4.E.5).
#[async_trait::async_trait]
pub trait FlowRerunner: Send + Sync {
    /// Re-run `flow_id` starting at `start_node_id` with `input`.
    ///
    /// Errors are logged by the caller to the debug stream and otherwise
    /// swallowed (spec §7 "Scheduler errors").
    async fn rerun(
        &self,
        flow_id: uuid::Uuid,
        start_node_id: String,
        input: serde_json::Value,
    ) -> Result<(), String>;
}
