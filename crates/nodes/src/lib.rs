//! `nodes` crate — the `ExecutableNode` trait and built-in node implementations.
//!
//! Every node — built-in and plugin alike — must implement [`ExecutableNode`].
//! The engine crate dispatches execution through this trait object.

pub mod active_flow;
pub mod background;
pub mod builtins;
pub mod error;
pub mod mock;
pub mod traits;

pub use active_flow::ActiveFlowState;
pub use background::{BackgroundScheduler, BoxedTask, FlowRerunner};
pub use error::NodeError;
pub use traits::{ExecutableNode, ExecutionContext, NodeSignal};
