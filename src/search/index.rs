//! # Search Index Abstraction
//!
//! The search index is a derived projection of posted nodes. Node documents are
//! keyed by node id and are eventually consistent with the document store.

use super::query::{BlockQuery, NodeQuery};
use crate::error::Result;
use crate::models::Node;
use crate::state_machine::NodeStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One page of directory search hits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResults {
    pub result: Vec<Map<String, Value>>,
    pub number_of_results: i64,
    pub total_pages: i64,
}

/// One export block; `sort` is the cursor for the next block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockQueryResults {
    pub result: Vec<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<Value>>,
}

/// Map projection; each row is `[lon, lat, profile_url]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapQueryResults {
    pub result: Vec<Value>,
    pub number_of_results: i64,
    pub total_pages: i64,
}

impl MapQueryResults {
    pub fn row(lon: f64, lat: f64, profile_url: &str) -> Value {
        json!([lon, lat, profile_url])
    }
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create the index and its mapping when missing
    async fn ensure_index(&self) -> Result<()>;

    /// Full-document upsert
    async fn index_by_id(&self, id: &str, document: &Map<String, Value>) -> Result<()>;

    /// Partial update; a missing document is not an error
    async fn update(&self, id: &str, fields: &Map<String, Value>) -> Result<()>;

    /// A missing document is not an error
    async fn delete_by_id(&self, id: &str) -> Result<()>;

    async fn search(&self, query: &NodeQuery) -> Result<QueryResults>;

    async fn export(&self, query: &BlockQuery) -> Result<BlockQueryResults>;

    async fn get_nodes(&self, query: &NodeQuery) -> Result<MapQueryResults>;

    /// Drop documents in `status` whose `last_updated` is older than `before`
    async fn remove_updated_before(&self, status: NodeStatus, before: i64) -> Result<u64>;

    /// Keep the document but mark it deleted
    async fn soft_delete(&self, node: &Node) -> Result<()> {
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!(NodeStatus::Deleted.as_str()));
        fields.insert("last_updated".to_string(), json!(node.last_updated));
        self.update(&node.id, &fields).await
    }
}
