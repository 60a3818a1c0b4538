//! `registry` crate — Module Registry and Executor Resolver.
//!
//! The Module Registry discovers module directories on disk and tracks
//! their enabled/disabled state and per-module config, persisting
//! changes atomically. The Executor Resolver caches constructed
//! [`nodes::ExecutableNode`] instances keyed by `(module_id,
//! node_type_id)`, and must be invalidated whenever a module is toggled.

pub mod error;
pub mod executor_resolver;
pub mod metadata;
pub mod module_registry;

pub use error::RegistryError;
pub use executor_resolver::{ExecutorResolver, NodeConstructor};
pub use metadata::ModuleMetadata;
pub use module_registry::ModuleRegistry;
