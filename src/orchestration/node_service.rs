//! # Node Service
//!
//! Owns node identity, drives the status state machine and keeps the document
//! store and the search index consistent.
//!
//! ## Consistency Model
//!
//! The document store is the system of record. Every write after the initial
//! [`NodeRepository::add`] is a conditional update on the version read back
//! from the store, so a stale or duplicated validation result becomes a
//! counted no-op instead of overwriting newer state. The search index is a
//! projection: an index failure never fails a validation event, it degrades
//! the node to `PostFailed` and leaves reconciliation to a later validation
//! pass.
//!
//! ## Usage
//!
//! ```rust,no_run
//! # use node_index::orchestration::NodeService;
//! # async fn example(service: &NodeService) -> node_index::error::Result<()> {
//! let node = service.add_node("https://example.org/profile.json").await?;
//! let view = service.get_node(&node.id).await?.view();
//! # Ok(())
//! # }
//! ```

use crate::config::{FeatureToggles, ServerConfig};
use crate::constants::features;
use crate::database::NodeRepository;
use crate::error::{NodeIndexError, Result};
use crate::logging::log_node_operation;
use crate::messaging::{EventPublisher, NodeCreatedData, Subject};
use crate::models::{Node, Profile, TagLimits};
use crate::search::{
    BlockQuery, BlockQueryResults, MapQueryResults, NodeQuery, QueryResults, SearchIndex,
};
use crate::services::{CountryResolver, ProbeOutcome, ProfileProbe};
use crate::state_machine::{NodeEvent, NodeStateMachine, NodeStatus, TargetState};
use crate::utils::{now_unix, sha256_hex, short_hash};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Request limits applied by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeServiceSettings {
    pub tag_limits: TagLimits,
    pub max_profile_url_length: usize,
}

impl Default for NodeServiceSettings {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

impl NodeServiceSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            tag_limits: TagLimits {
                array_size: config.tags_array_size,
                string_length: config.tags_string_length,
            },
            max_profile_url_length: config.max_profile_url_length,
        }
    }
}

/// How a deletion left the node
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// Status flipped to `Deleted`; the index document is kept and marked deleted
    SoftDeleted(Node),
    /// Removed from both stores
    Removed(Node),
}

impl DeleteOutcome {
    pub fn node(&self) -> &Node {
        match self {
            Self::SoftDeleted(node) | Self::Removed(node) => node,
        }
    }

    pub fn profile_url(&self) -> &str {
        &self.node().profile_url
    }

    pub fn is_soft(&self) -> bool {
        matches!(self, Self::SoftDeleted(_))
    }
}

pub struct NodeService {
    repository: Arc<dyn NodeRepository>,
    search_index: Arc<dyn SearchIndex>,
    publisher: EventPublisher,
    probe: Arc<dyn ProfileProbe>,
    countries: Arc<dyn CountryResolver>,
    toggles: Arc<FeatureToggles>,
    settings: NodeServiceSettings,
}

impl NodeService {
    pub fn new(
        repository: Arc<dyn NodeRepository>,
        search_index: Arc<dyn SearchIndex>,
        publisher: EventPublisher,
        probe: Arc<dyn ProfileProbe>,
        countries: Arc<dyn CountryResolver>,
        toggles: Arc<FeatureToggles>,
        settings: NodeServiceSettings,
    ) -> Self {
        Self {
            repository,
            search_index,
            publisher,
            probe,
            countries,
            toggles,
            settings,
        }
    }

    pub fn toggles(&self) -> &Arc<FeatureToggles> {
        &self.toggles
    }

    /// Register (or re-register) a profile URL and announce it to the validator.
    ///
    /// A `Deleted` node whose profile is still gone is returned unchanged.
    /// Failing to publish the creation event fails the whole operation.
    #[instrument(skip(self), fields(node_id))]
    pub async fn add_node(&self, profile_url: &str) -> Result<Node> {
        self.validate_profile_url(profile_url)?;

        let mut node = Node::new(profile_url);
        tracing::Span::current().record("node_id", node.id.as_str());

        if let Some(existing) = self.repository.get(&node.id).await.optional()? {
            if existing.is_deleted() {
                if let ProbeOutcome::Gone { reason } = self.probe.probe(profile_url).await {
                    info!(reason = %reason, "Profile still gone; keeping deleted node");
                    return Ok(existing);
                }
            }
        }

        NodeStateMachine::transition(&mut node, &NodeEvent::Submit)?;
        node.created_at = now_unix();
        self.repository.add(&mut node).await?;

        let event = NodeCreatedData {
            profile_url: node.profile_url.clone(),
            version: node.version,
        };
        self.publisher.publish(Subject::NodeCreated, &event).await?;

        log_node_operation("add_node", &node.id, node.status.as_str(), None);
        Ok(node)
    }

    pub async fn get_node(&self, node_id: &str) -> Result<Node> {
        self.repository
            .get(node_id)
            .await
            .into_result(&format!("node_id: {node_id}"))
    }

    /// Apply a successful validation: persist, normalize, index.
    ///
    /// `node` carries the profile URL, the raw profile body in `profile_str`,
    /// the validator's `last_updated` and the version it validated.
    #[instrument(skip(self, node), fields(profile_url = %node.profile_url, node_id))]
    pub async fn set_node_valid(&self, mut node: Node) -> Result<()> {
        node.refresh_id();
        tracing::Span::current().record("node_id", node.id.as_str());

        let profile_str = node.profile_str.take().ok_or_else(|| {
            NodeIndexError::validation("profile_str", "The validated profile body is required.")
        })?;
        let profile_hash = sha256_hex(&profile_str);
        debug!(profile_hash = short_hash(&profile_hash), "Validated profile received");

        let Some(current) = self.repository.get(&node.id).await.optional()? else {
            warn!("Validation result for an unknown node dropped");
            return Ok(());
        };

        node.status = current.status;
        if let Err(e) = NodeStateMachine::transition(&mut node, &NodeEvent::ValidationSucceeded) {
            warn!(error = %e, "Validation result not applicable; dropped");
            return Ok(());
        }

        // Unchanged content keeps its timestamp so redelivery is idempotent
        if current.profile_hash.as_deref() == Some(profile_hash.as_str()) {
            node.last_updated = current.last_updated.or(node.last_updated);
        }
        node.profile_hash = Some(profile_hash);
        node.failure_reasons = Some(Vec::new());

        if !self.repository.update(&mut node).await? {
            // A redelivery finds the node still validated when the final write was lost
            match self.repository.get(&node.id).await.optional()? {
                Some(stored)
                    if stored.status == NodeStatus::Validated
                        && stored.profile_hash == node.profile_hash =>
                {
                    info!("Resuming interrupted validation");
                    node = stored;
                }
                _ => return Ok(()),
            }
        }

        let outcome = match self.normalized_document(&node, profile_str).await {
            Ok(document) => match self.search_index.index_by_id(&node.id, &document).await {
                Ok(()) => NodeEvent::IndexSucceeded,
                Err(e) => {
                    warn!(error = %e, "Search index write failed; node degraded to post_failed");
                    NodeEvent::IndexFailed(e.to_string())
                }
            },
            Err(e) => {
                warn!(error = %e, "Profile normalization failed; node degraded to post_failed");
                NodeEvent::IndexFailed(e.to_string())
            }
        };

        if let NodeEvent::IndexFailed(_) = outcome {
            // The index must not keep a document for a post_failed node
            if let Err(e) = self.search_index.delete_by_id(&node.id).await {
                debug!(error = %e, "Could not clear stale index document");
            }
        }

        NodeStateMachine::transition(&mut node, &outcome)?;
        let applied = self.repository.update(&mut node).await?;
        if applied {
            log_node_operation("set_node_valid", &node.id, node.status.as_str(), None);
        }
        Ok(())
    }

    /// Apply a failed validation and drop the node from the index
    #[instrument(skip(self, node), fields(profile_url = %node.profile_url, node_id))]
    pub async fn set_node_invalid(&self, mut node: Node) -> Result<()> {
        node.refresh_id();
        tracing::Span::current().record("node_id", node.id.as_str());

        let Some(current) = self.repository.get(&node.id).await.optional()? else {
            warn!("Validation failure for an unknown node dropped");
            return Ok(());
        };

        let reasons = node.failure_reasons.take().unwrap_or_default();
        node.status = current.status;
        if let Err(e) =
            NodeStateMachine::transition(&mut node, &NodeEvent::ValidationFailed(reasons.clone()))
        {
            warn!(error = %e, "Validation failure not applicable; dropped");
            return Ok(());
        }

        node.failure_reasons = Some(reasons);
        node.clear_content();

        if !self.repository.update(&mut node).await? {
            // The failure may be stored already while its index removal was lost
            let stored = self.repository.get(&node.id).await.optional()?;
            if stored.is_some_and(|n| n.status == NodeStatus::ValidationFailed) {
                self.search_index.delete_by_id(&node.id).await?;
            }
            return Ok(());
        }

        self.search_index.delete_by_id(&node.id).await?;
        let details = node.failure_reasons.as_ref().map(|r| r.join("; "));
        log_node_operation(
            "set_node_invalid",
            &node.id,
            node.status.as_str(),
            details.as_deref(),
        );
        Ok(())
    }

    /// Delete a node whose profile is gone.
    ///
    /// `Posted` and `Deleted` nodes are soft-deleted, everything else is
    /// removed from both stores. A profile that still answers with JSON makes
    /// the request a conflict unless `bypass_delete_profile_check` is on.
    #[instrument(skip(self))]
    pub async fn delete(&self, node_id: &str) -> Result<DeleteOutcome> {
        let mut node = self.get_node(node_id).await?;

        if self.toggles.is_enabled(features::BYPASS_DELETE_PROFILE_CHECK) {
            info!(node_id = %node.id, "Profile check bypassed for delete");
        } else {
            match self.probe.probe(&node.profile_url).await {
                ProbeOutcome::Reachable { status } => {
                    let detail = if status == 200 {
                        format!(
                            "The profile could not be deleted from the Index because it still exists at the profile_url: {}",
                            node.profile_url
                        )
                    } else {
                        format!(
                            "The node at {} returned the following status code: {status}",
                            node.profile_url
                        )
                    };
                    return Err(NodeIndexError::conflict(
                        "Profile Still Exists",
                        detail,
                        node.id,
                        node.profile_url,
                    ));
                }
                ProbeOutcome::Gone { reason } => {
                    debug!(node_id = %node.id, reason = %reason, "Profile confirmed gone");
                }
            }
        }

        let target =
            NodeStateMachine::determine_target_state(Some(node.status), &NodeEvent::Delete)?;
        let outcome = match target {
            TargetState::Status(_) => {
                self.repository.soft_delete(&mut node).await?;
                self.search_index.soft_delete(&node).await?;
                DeleteOutcome::SoftDeleted(node)
            }
            TargetState::Removed => {
                // The store record goes last; it is what a retried delete looks up
                self.search_index.delete_by_id(&node.id).await?;
                self.repository.delete(&node).await?;
                DeleteOutcome::Removed(node)
            }
        };

        let kind = if outcome.is_soft() { "soft" } else { "hard" };
        log_node_operation(
            "delete",
            &outcome.node().id,
            outcome.node().status.as_str(),
            Some(kind),
        );
        Ok(outcome)
    }

    pub async fn search(&self, query: &NodeQuery) -> Result<QueryResults> {
        self.search_index.search(query).await
    }

    pub async fn export(&self, query: &BlockQuery) -> Result<BlockQueryResults> {
        self.search_index.export(query).await
    }

    pub async fn get_nodes(&self, query: &NodeQuery) -> Result<MapQueryResults> {
        self.search_index.get_nodes(query).await
    }

    fn validate_profile_url(&self, profile_url: &str) -> Result<()> {
        if profile_url.is_empty() {
            return Err(NodeIndexError::validation(
                "profile_url",
                "The `profile_url` property is required.",
            ));
        }
        if profile_url.chars().count() > self.settings.max_profile_url_length {
            return Err(NodeIndexError::validation(
                "profile_url",
                format!(
                    "The `profile_url` property must not exceed {} characters.",
                    self.settings.max_profile_url_length
                ),
            ));
        }
        Ok(())
    }

    async fn normalized_document(
        &self,
        node: &Node,
        profile_str: String,
    ) -> Result<Map<String, Value>> {
        let mut profile = Profile::parse(profile_str)?;
        profile
            .normalize(
                &node.profile_url,
                node.last_updated,
                self.settings.tag_limits,
                self.countries.as_ref(),
            )
            .await?;
        Ok(profile.document())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let config = ServerConfig {
            tags_array_size: 3,
            tags_string_length: 10,
            ..ServerConfig::default()
        };
        let settings = NodeServiceSettings::from_config(&config);
        assert_eq!(settings.tag_limits.array_size, 3);
        assert_eq!(settings.tag_limits.string_length, 10);
        assert_eq!(settings.max_profile_url_length, 2000);
    }

    #[test]
    fn test_delete_outcome_accessors() {
        let node = Node::new("https://a.org/p.json");
        let outcome = DeleteOutcome::Removed(node.clone());
        assert!(!outcome.is_soft());
        assert_eq!(outcome.profile_url(), "https://a.org/p.json");
        assert!(DeleteOutcome::SoftDeleted(node).is_soft());
    }
}
