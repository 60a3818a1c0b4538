//! `db` crate — pure persistence layer.
//!
//! Provides a connection pool, typed row structs, and repository functions
//! for every table in the flow engine's schema. No business logic lives
//! here; flow definitions are stored and returned as opaque JSON, with
//! the `engine` crate owning what that JSON means.

pub mod error;
pub mod pool;
pub mod repository;
pub mod models;

pub use pool::DbPool;
pub use error::DbError;
