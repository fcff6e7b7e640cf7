#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Node Index
//!
//! Lifecycle and dual-store consistency engine for a public directory of
//! externally hosted profiles.
//!
//! ## Overview
//!
//! Each directory entry (a node) points at a JSON profile that an independent
//! validator fetches and checks. This crate owns the node's identity and
//! status, keeps the PostgreSQL system of record in sync with an
//! Elasticsearch-compatible search index under at-least-once event delivery,
//! and resolves concurrent writers with optimistic concurrency.
//!
//! ## Module Organization
//!
//! - [`state_machine`] - Node statuses, events and the transition table
//! - [`models`] - Node record and profile normalization
//! - [`database`] - Document store repository with compare-and-swap writes
//! - [`search`] - Query builder and search index backends
//! - [`messaging`] - Durable, queue-grouped event bus over pgmq
//! - [`orchestration`] - Node service, event handlers, cleaner and bootstrap
//! - [`services`] - Profile probe and country lookup collaborators
//! - [`config`] - Layered configuration and feature toggles
//! - [`error`] - Structured error handling
//!
//! ## Testing
//!
//! Every backend has an in-memory counterpart, so the whole lifecycle runs
//! without external services:
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod resilience;
pub mod search;
pub mod services;
pub mod state_machine;
pub mod utils;

pub use config::{ConfigManager, IndexConfig};
pub use error::{NodeIndexError, Result};
pub use models::{Node, NodeView};
pub use orchestration::{DeleteOutcome, NodeIndexSystem, NodeService};
pub use state_machine::NodeStatus;
