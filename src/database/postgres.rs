//! PostgreSQL node repository.
//!
//! Set-if-present semantics: optional columns are only overwritten when the
//! incoming node carries a value (`COALESCE`), so partial nodes built from
//! events never erase stored content.

use super::node_repository::{Lookup, NodeRepository};
use crate::error::{NodeIndexError, Result};
use crate::models::Node;
use crate::state_machine::NodeStatus;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{debug, instrument};

const ADD_NODE_SQL: &str = r#"
INSERT INTO nodes (id, profile_url, profile_hash, status, last_updated, failure_reasons, version, created_at)
VALUES ($1, $2, $3, $4, $5, $6, 1, $7)
ON CONFLICT (id) DO UPDATE SET
    profile_url = EXCLUDED.profile_url,
    profile_hash = COALESCE(EXCLUDED.profile_hash, nodes.profile_hash),
    status = EXCLUDED.status,
    last_updated = COALESCE(EXCLUDED.last_updated, nodes.last_updated),
    failure_reasons = COALESCE(EXCLUDED.failure_reasons, nodes.failure_reasons),
    version = nodes.version + 1
RETURNING version, created_at
"#;

const COMPARE_AND_SWAP_SQL: &str = r#"
UPDATE nodes SET
    profile_url = $2,
    profile_hash = COALESCE($3, profile_hash),
    status = $4,
    last_updated = COALESCE($5, last_updated),
    failure_reasons = COALESCE($6, failure_reasons),
    version = version + 1
WHERE id = $1 AND ($7::INTEGER IS NULL OR version = $7)
RETURNING version
"#;

const GET_NODE_SQL: &str = r#"
SELECT id, profile_url, profile_hash, status, last_updated, failure_reasons, version, created_at
FROM nodes
WHERE id = $1
"#;

#[derive(Debug, FromRow)]
struct NodeRow {
    id: String,
    profile_url: String,
    profile_hash: Option<String>,
    status: String,
    last_updated: Option<i64>,
    failure_reasons: Option<Json<Vec<String>>>,
    version: i32,
    created_at: i64,
}

impl TryFrom<NodeRow> for Node {
    type Error = NodeIndexError;

    fn try_from(row: NodeRow) -> Result<Self> {
        let status = row
            .status
            .parse::<NodeStatus>()
            .map_err(|e| NodeIndexError::database("failed to decode node", e))?;

        Ok(Node {
            id: row.id,
            profile_url: row.profile_url,
            profile_hash: row.profile_hash,
            status,
            last_updated: row.last_updated,
            failure_reasons: row.failure_reasons.map(|reasons| reasons.0),
            version: Some(row.version),
            created_at: row.created_at,
            profile_str: None,
        })
    }
}

#[derive(Debug, FromRow)]
struct AddedRow {
    version: i32,
    created_at: i64,
}

#[derive(Clone)]
pub struct PgNodeRepository {
    pool: PgPool,
}

impl PgNodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl NodeRepository for PgNodeRepository {
    #[instrument(skip(self, node), fields(node_id = %node.id))]
    async fn add(&self, node: &mut Node) -> Result<()> {
        let added = sqlx::query_as::<_, AddedRow>(ADD_NODE_SQL)
            .bind(&node.id)
            .bind(&node.profile_url)
            .bind(&node.profile_hash)
            .bind(node.status.as_str())
            .bind(node.last_updated)
            .bind(node.failure_reasons.clone().map(Json))
            .bind(node.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| NodeIndexError::database("failed to add node", e))?;

        node.version = Some(added.version);
        node.created_at = added.created_at;
        debug!(version = added.version, "Node upserted");
        Ok(())
    }

    async fn get(&self, id: &str) -> Lookup<Node> {
        let row = sqlx::query_as::<_, NodeRow>(GET_NODE_SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;

        match row {
            Ok(Some(row)) => match Node::try_from(row) {
                Ok(node) => Lookup::Found(node),
                Err(e) => Lookup::Failed(e),
            },
            Ok(None) => Lookup::NotFound,
            Err(e) => Lookup::Failed(NodeIndexError::database("failed to get node", e)),
        }
    }

    #[instrument(skip(self, node), fields(node_id = %node.id, status = %node.status))]
    async fn compare_and_swap(
        &self,
        node: &Node,
        expected_version: Option<i32>,
    ) -> Result<Option<i32>> {
        let version = sqlx::query_scalar::<_, i32>(COMPARE_AND_SWAP_SQL)
            .bind(&node.id)
            .bind(&node.profile_url)
            .bind(&node.profile_hash)
            .bind(node.status.as_str())
            .bind(node.last_updated)
            .bind(node.failure_reasons.clone().map(Json))
            .bind(expected_version)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| NodeIndexError::database("failed to update node", e))?;

        Ok(version)
    }

    #[instrument(skip(self, node), fields(node_id = %node.id))]
    async fn delete(&self, node: &Node) -> Result<()> {
        sqlx::query("DELETE FROM nodes WHERE id = $1")
            .bind(&node.id)
            .execute(&self.pool)
            .await
            .map_err(|e| NodeIndexError::database("failed to delete node", e))?;
        Ok(())
    }

    async fn remove_created_before(&self, status: NodeStatus, before: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM nodes WHERE status = $1 AND created_at < $2")
            .bind(status.as_str())
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(|e| NodeIndexError::database("failed to remove expired nodes", e))?;
        Ok(result.rows_affected())
    }

    async fn remove_updated_before(&self, status: NodeStatus, before: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM nodes WHERE status = $1 AND last_updated < $2")
            .bind(status.as_str())
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(|e| NodeIndexError::database("failed to remove expired nodes", e))?;
        Ok(result.rows_affected())
    }
}
