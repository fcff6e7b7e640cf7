//! # Document Store
//!
//! The durable system of record for nodes.
//!
//! ## Key Components
//!
//! - [`node_repository`] - the store-agnostic [`NodeRepository`] contract with
//!   its compare-and-swap write and the [`Lookup`] result type
//! - [`postgres`] - PostgreSQL implementation over `sqlx`
//! - [`in_memory`] - in-process implementation for tests and local runs
//! - [`connection`] - pool creation with startup backoff and migrations
//!
//! ## Optimistic Concurrency
//!
//! Every write bumps `version` inside the store. [`NodeRepository::update`]
//! only applies when the caller's version still matches; a mismatch means a
//! concurrent writer won and the call becomes a logged no-op.

pub mod connection;
pub mod in_memory;
pub mod node_repository;
pub mod postgres;

pub use connection::{connect_with_retry, run_migrations};
pub use in_memory::InMemoryNodeRepository;
pub use node_repository::{stale_writes_dropped, Lookup, NodeRepository};
pub use postgres::PgNodeRepository;
