//! In-process node repository.
//!
//! Mirrors the PostgreSQL semantics (set-if-present upserts, version bumps,
//! conditional writes) so orchestration tests exercise the same contract.

use super::node_repository::{Lookup, NodeRepository};
use crate::error::{NodeIndexError, Result};
use crate::models::Node;
use crate::state_machine::NodeStatus;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct InMemoryNodeRepository {
    nodes: RwLock<HashMap<String, Node>>,
    fail_operations: AtomicBool,
}

impl InMemoryNodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a database error
    pub fn set_failing(&self, failing: bool) {
        self.fail_operations.store(failing, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    fn check_available(&self) -> Result<()> {
        if self.fail_operations.load(Ordering::SeqCst) {
            return Err(NodeIndexError::database(
                "in-memory store unavailable",
                "simulated failure",
            ));
        }
        Ok(())
    }

    fn merge(stored: &mut Node, incoming: &Node) {
        stored.profile_url = incoming.profile_url.clone();
        stored.status = incoming.status;
        if incoming.profile_hash.is_some() {
            stored.profile_hash = incoming.profile_hash.clone();
        }
        if incoming.last_updated.is_some() {
            stored.last_updated = incoming.last_updated;
        }
        if incoming.failure_reasons.is_some() {
            stored.failure_reasons = incoming.failure_reasons.clone();
        }
        stored.version = Some(stored.version.unwrap_or(0) + 1);
    }
}

#[async_trait]
impl NodeRepository for InMemoryNodeRepository {
    async fn add(&self, node: &mut Node) -> Result<()> {
        self.check_available()?;
        let mut nodes = self.nodes.write();

        let incoming: &Node = node;
        let stored = nodes
            .entry(incoming.id.clone())
            .and_modify(|stored| Self::merge(stored, incoming))
            .or_insert_with(|| Node {
                profile_str: None,
                version: Some(1),
                ..incoming.clone()
            });
        let (version, created_at) = (stored.version, stored.created_at);

        node.version = version;
        node.created_at = created_at;
        Ok(())
    }

    async fn get(&self, id: &str) -> Lookup<Node> {
        if let Err(e) = self.check_available() {
            return Lookup::Failed(e);
        }
        match self.nodes.read().get(id) {
            Some(node) => Lookup::Found(node.clone()),
            None => Lookup::NotFound,
        }
    }

    async fn compare_and_swap(
        &self,
        node: &Node,
        expected_version: Option<i32>,
    ) -> Result<Option<i32>> {
        self.check_available()?;
        let mut nodes = self.nodes.write();

        let Some(stored) = nodes.get_mut(&node.id) else {
            return Ok(None);
        };
        if expected_version.is_some() && stored.version != expected_version {
            return Ok(None);
        }

        Self::merge(stored, node);
        Ok(stored.version)
    }

    async fn delete(&self, node: &Node) -> Result<()> {
        self.check_available()?;
        self.nodes.write().remove(&node.id);
        Ok(())
    }

    async fn remove_created_before(&self, status: NodeStatus, before: i64) -> Result<u64> {
        self.check_available()?;
        let mut nodes = self.nodes.write();
        let initial = nodes.len();
        nodes.retain(|_, node| !(node.status == status && node.created_at < before));
        Ok((initial - nodes.len()) as u64)
    }

    async fn remove_updated_before(&self, status: NodeStatus, before: i64) -> Result<u64> {
        self.check_available()?;
        let mut nodes = self.nodes.write();
        let initial = nodes.len();
        nodes.retain(|_, node| {
            !(node.status == status && node.last_updated.is_some_and(|ts| ts < before))
        });
        Ok((initial - nodes.len()) as u64)
    }
}
