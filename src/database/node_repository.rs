//! Store-agnostic node repository contract.

use crate::error::{NodeIndexError, Result};
use crate::models::Node;
use crate::state_machine::NodeStatus;
use crate::utils::now_unix;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

static STALE_WRITES_DROPPED: AtomicU64 = AtomicU64::new(0);

/// Number of conditional writes dropped because a concurrent writer won
pub fn stale_writes_dropped() -> u64 {
    STALE_WRITES_DROPPED.load(Ordering::Relaxed)
}

fn record_stale_write(node: &Node, expected_version: Option<i32>) {
    let total = STALE_WRITES_DROPPED.fetch_add(1, Ordering::Relaxed) + 1;
    warn!(
        node_id = %node.id,
        status = %node.status,
        expected_version = ?expected_version,
        stale_writes_dropped = total,
        "⚠️ Stale node write dropped: version no longer matches"
    );
}

/// Outcome of a point lookup
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Failed(NodeIndexError),
}

impl<T> Lookup<T> {
    /// Treat absence as [`NodeIndexError::NotFound`]
    pub fn into_result(self, what: &str) -> Result<T> {
        match self {
            Self::Found(value) => Ok(value),
            Self::NotFound => Err(NodeIndexError::NotFound(format!(
                "Could not find {what}"
            ))),
            Self::Failed(error) => Err(error),
        }
    }

    /// Treat absence as `None`; only real failures are errors
    pub fn optional(self) -> Result<Option<T>> {
        match self {
            Self::Found(value) => Ok(Some(value)),
            Self::NotFound => Ok(None),
            Self::Failed(error) => Err(error),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

#[async_trait]
pub trait NodeRepository: Send + Sync {
    /// Upsert keyed by id. Always bumps the version and writes it back to `node`.
    ///
    /// Optional fields missing on `node` keep their stored values and
    /// `created_at` is never overwritten (the stored value is written back).
    async fn add(&self, node: &mut Node) -> Result<()>;

    async fn get(&self, id: &str) -> Lookup<Node>;

    /// Write `node` if the stored version equals `expected_version`
    /// (`None` writes unconditionally). Returns the new version when applied.
    async fn compare_and_swap(
        &self,
        node: &Node,
        expected_version: Option<i32>,
    ) -> Result<Option<i32>>;

    /// Physically remove the record. Missing records are not an error.
    async fn delete(&self, node: &Node) -> Result<()>;

    /// Remove records with `status` created before `before` (Unix seconds)
    async fn remove_created_before(&self, status: NodeStatus, before: i64) -> Result<u64>;

    /// Remove records with `status` last updated before `before` (Unix seconds)
    async fn remove_updated_before(&self, status: NodeStatus, before: i64) -> Result<u64>;

    /// Conditional update using the version carried by `node`.
    ///
    /// Returns `false` when a concurrent writer already advanced the record;
    /// that is an expected outcome, counted and logged but not an error.
    async fn update(&self, node: &mut Node) -> Result<bool> {
        let expected_version = node.version.take();
        match self.compare_and_swap(node, expected_version).await? {
            Some(version) => {
                node.version = Some(version);
                Ok(true)
            }
            None => {
                node.version = expected_version;
                record_stale_write(node, expected_version);
                Ok(false)
            }
        }
    }

    /// Flip to `Deleted`, stamp `last_updated` and write unconditionally
    async fn soft_delete(&self, node: &mut Node) -> Result<bool> {
        node.status = NodeStatus::Deleted;
        node.last_updated = Some(now_unix());
        node.version = None;
        self.update(node).await
    }
}
