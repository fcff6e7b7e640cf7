//! # System Constants
//!
//! Names and limits shared by the stores, the event bus and the query layer.

/// Default search index name
pub const NODES_INDEX: &str = "nodes";

/// Maximum accepted length of a profile URL
pub const MAX_PROFILE_URL_LENGTH: usize = 2000;

/// `LastUpdated` stamp of an invalidated node: 0001-01-01T00:00:00Z
pub const ZERO_TIMESTAMP: i64 = -62_135_596_800;

/// Event subjects exchanged with the validator
pub mod subjects {
    pub const NODE_CREATED: &str = "node:created";
    pub const NODE_VALIDATED: &str = "node:validated";
    pub const NODE_VALIDATION_FAILED: &str = "node:validation-failed";
}

/// Pagination limits for search requests
pub mod pagination {
    pub const DEFAULT_PAGE: i64 = 0;
    pub const DEFAULT_PAGE_SIZE: i64 = 30;
    pub const MAX_PAGE_SIZE: i64 = 500;
    /// Map view returns every matching node in one page
    pub const MAX_MAP_PAGE_SIZE: i64 = 10_000;
}

/// Profile fields that reach the search index
pub const ALLOWED_PROFILE_FIELDS: [&str; 12] = [
    "country",
    "geolocation",
    "last_updated",
    "linked_schemas",
    "locality",
    "name",
    "primary_url",
    "profile_url",
    "region",
    "status",
    "tags",
    "expires",
];

/// Runtime feature toggle names
pub mod features {
    /// Skip the live profile probe before deleting a node
    pub const BYPASS_DELETE_PROFILE_CHECK: &str = "bypass_delete_profile_check";
}
