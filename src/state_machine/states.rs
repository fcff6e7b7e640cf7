use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a directory node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Initial state after submission, awaiting the validator
    Received,
    /// Validator accepted the profile; the index write is in progress
    Validated,
    /// Validator rejected the profile
    ValidationFailed,
    /// Profile is indexed and searchable
    Posted,
    /// Profile validated but the index write failed
    PostFailed,
    /// Soft-deleted; the record stays queryable
    Deleted,
}

impl NodeStatus {
    pub const ALL: [NodeStatus; 6] = [
        Self::Received,
        Self::Validated,
        Self::ValidationFailed,
        Self::Posted,
        Self::PostFailed,
        Self::Deleted,
    ];

    /// Check if this is a terminal state (only a resubmission leaves it)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Deleted)
    }

    /// Whether a search-index document is expected for a node in this state
    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::Validated | Self::Posted | Self::Deleted)
    }

    /// Statuses that carry a profile hash and a last-updated stamp in API views
    pub fn exposes_content_fields(&self) -> bool {
        matches!(self, Self::Validated | Self::Posted)
    }

    /// Delete keeps the record (soft delete) only for published or already deleted nodes
    pub fn is_soft_deletable(&self) -> bool {
        matches!(self, Self::Posted | Self::Deleted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::ValidationFailed => "validation_failed",
            Self::Posted => "posted",
            Self::PostFailed => "post_failed",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(Self::Received),
            "validated" => Ok(Self::Validated),
            "validation_failed" => Ok(Self::ValidationFailed),
            "posted" => Ok(Self::Posted),
            "post_failed" => Ok(Self::PostFailed),
            "deleted" => Ok(Self::Deleted),
            _ => Err(format!("Invalid node status: {s}")),
        }
    }
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self::Received
    }
}
