//! The handful of "logic" primitives the original system ships under
//! `modules/logic` (trigger, conditional router, repeater, delay).
//! Registered under module id `logic` alongside any plugin-provided
//! node types — they go through the same Executor Resolver path as
//! everything else, so disabling the `logic` module disables them too.

pub mod conditional_router;
pub mod delay;
pub mod repeater;
pub mod trigger;

pub use conditional_router::{router_config, ConditionalRouterNode};
pub use delay::DelayNode;
pub use repeater::RepeaterNode;
pub use trigger::TriggerNode;
