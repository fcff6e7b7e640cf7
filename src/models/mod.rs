//! # Domain Models
//!
//! Node records kept in the document store and the profile documents they
//! project into the search index.

pub mod node;
pub mod profile;

pub use node::{node_id_for, Node, NodeView};
pub use profile::{Profile, TagLimits};
