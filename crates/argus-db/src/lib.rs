//! ARGUS Database — SurrealDB persistence for the `argus-core` data
//! model.
//!
//! This crate provides:
//! - Connection management ([`DbConfig`], [`connect`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - The staged-write session implementing `argus_core::DbSession`
//!   ([`SurrealSession`])
//! - Error types ([`DbError`])

mod connection;
mod error;
mod schema;
mod session;

pub use connection::{DbConfig, connect};
pub use error::DbError;
pub use schema::{LINK_TABLES, run_migrations, schema_v1};
pub use session::SurrealSession;
