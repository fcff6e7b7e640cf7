//! # Orchestration
//!
//! Node lifecycle operations and the wiring that runs them.
//!
//! - [`NodeService`]: AddNode, SetNodeValid, SetNodeInvalid, Delete, Search,
//!   Export and GetNodes
//! - [`event_handlers`]: validator result consumers
//! - [`NodeCleaner`]: retention sweep
//! - [`NodeIndexSystem`]: bootstrap and lifecycle

pub mod bootstrap;
pub mod event_handlers;
pub mod node_cleaner;
pub mod node_service;

pub use bootstrap::{NodeIndexSystem, SystemComponents};
pub use event_handlers::{
    node_listeners, spawn_node_listeners, NodeValidatedHandler, NodeValidationFailedHandler,
};
pub use node_cleaner::{CleanupReport, NodeCleaner};
pub use node_service::{DeleteOutcome, NodeService, NodeServiceSettings};
