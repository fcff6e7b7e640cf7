//! # Node Model
//!
//! A node is one directory entry referencing an externally hosted profile.
//!
//! ## Identity
//!
//! `id` is the lowercase hex SHA-256 of `profile_url`. It is recomputed from
//! the URL on every write path and never accepted from callers, so two
//! submissions of the same URL always collide on the same record.
//!
//! ## Database Schema
//!
//! Maps to the `nodes` table:
//! - `id`: hex SHA-256 of the profile URL (VARCHAR(64), primary key)
//! - `profile_url`: externally owned document location (VARCHAR(2000))
//! - `profile_hash`: hash of the last validated profile body
//! - `status`: snake_case [`NodeStatus`]
//! - `last_updated`: Unix seconds of the last accepted content change
//! - `failure_reasons`: JSONB array of validator messages
//! - `version`: optimistic-lock counter owned by the repository
//! - `created_at`: Unix seconds of first persistence
//!
//! ## Versioning
//!
//! `version` is read back from the store after every write. Callers only ever
//! clear it (set it to `None`) to request an unconditional administrative write.

use crate::constants::ZERO_TIMESTAMP;
use crate::state_machine::NodeStatus;
use crate::utils::sha256_hex;
use serde::{Deserialize, Serialize};

/// Derive the node identity from its profile URL
pub fn node_id_for(profile_url: &str) -> String {
    sha256_hex(profile_url)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub profile_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_hash: Option<String>,
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reasons: Option<Vec<String>>,
    #[serde(default, rename = "__v", skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    #[serde(default)]
    pub created_at: i64,
    /// Raw profile body, only held while a validation result is processed
    #[serde(skip)]
    pub profile_str: Option<String>,
}

impl Node {
    /// A fresh `Received` node for the given profile URL
    pub fn new(profile_url: impl Into<String>) -> Self {
        let profile_url = profile_url.into();
        Self {
            id: node_id_for(&profile_url),
            profile_url,
            profile_hash: None,
            status: NodeStatus::Received,
            last_updated: None,
            failure_reasons: None,
            version: None,
            created_at: 0,
            profile_str: None,
        }
    }

    /// Recompute `id` from `profile_url`
    pub fn refresh_id(&mut self) {
        self.id = node_id_for(&self.profile_url);
    }

    /// Reset the content fields the way an invalidation does
    pub fn clear_content(&mut self) {
        self.profile_hash = Some(String::new());
        self.last_updated = Some(ZERO_TIMESTAMP);
    }

    pub fn is_deleted(&self) -> bool {
        self.status == NodeStatus::Deleted
    }

    /// API representation honouring field presence rules
    pub fn view(&self) -> NodeView {
        let content = self.status.exposes_content_fields();
        NodeView {
            node_id: self.id.clone(),
            profile_url: self.profile_url.clone(),
            profile_hash: self.profile_hash.clone().filter(|_| content),
            status: self.status,
            last_updated: self.last_updated.filter(|_| content),
            failure_reasons: self
                .failure_reasons
                .clone()
                .filter(|_| self.status == NodeStatus::ValidationFailed),
        }
    }
}

/// `GET /nodes/{id}` payload.
///
/// `profile_hash` and `last_updated` only appear for validated or posted
/// nodes; `failure_reasons` only for nodes that failed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub node_id: String,
    pub profile_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_hash: Option<String>,
    pub status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reasons: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_hash_of_url() {
        let node = Node::new("https://ic3.dev/test.json");
        assert_eq!(node.id, sha256_hex("https://ic3.dev/test.json"));
        assert_eq!(node.status, NodeStatus::Received);
        assert!(node.version.is_none());
    }

    #[test]
    fn test_refresh_id_ignores_caller_value() {
        let mut node = Node::new("https://ic3.dev/test.json");
        node.id = "forged".to_string();
        node.refresh_id();
        assert_eq!(node.id, node_id_for("https://ic3.dev/test.json"));
    }

    #[test]
    fn test_view_hides_content_fields_until_validated() {
        let mut node = Node::new("https://ic3.dev/test.json");
        node.profile_hash = Some("abc".into());
        node.last_updated = Some(1_700_000_000);
        node.failure_reasons = Some(vec!["bad".into()]);

        let json = serde_json::to_value(node.view()).unwrap();
        assert!(json.get("profile_hash").is_none());
        assert!(json.get("last_updated").is_none());
        assert!(json.get("failure_reasons").is_none());

        node.status = NodeStatus::Posted;
        let view = node.view();
        assert_eq!(view.profile_hash.as_deref(), Some("abc"));
        assert_eq!(view.last_updated, Some(1_700_000_000));
        assert!(view.failure_reasons.is_none());

        node.status = NodeStatus::ValidationFailed;
        let view = node.view();
        assert_eq!(view.failure_reasons, Some(vec!["bad".to_string()]));
        assert!(view.profile_hash.is_none());
    }

    #[test]
    fn test_record_shape() {
        let mut node = Node::new("https://ic3.dev/test.json");
        node.version = Some(3);
        node.profile_str = Some("{}".into());

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["__v"], 3);
        assert_eq!(json["status"], "received");
        assert!(json.get("profile_str").is_none());
    }

    #[test]
    fn test_clear_content_uses_zero_sentinel() {
        let mut node = Node::new("https://ic3.dev/test.json");
        node.profile_hash = Some("abc".into());
        node.last_updated = Some(1);
        node.clear_content();
        assert_eq!(node.profile_hash.as_deref(), Some(""));
        assert_eq!(node.last_updated, Some(ZERO_TIMESTAMP));
    }
}
