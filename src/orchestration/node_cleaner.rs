//! # Node Cleaner
//!
//! Periodic retention sweep. `ValidationFailed` nodes expire by `created_at`,
//! `Deleted` nodes by `last_updated`; expired records leave both stores.

use crate::config::TtlConfig;
use crate::database::NodeRepository;
use crate::error::Result;
use crate::search::SearchIndex;
use crate::state_machine::NodeStatus;
use crate::utils::now_unix;
use std::sync::Arc;
use tracing::{info, instrument};

/// Records removed by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub validation_failed_removed: u64,
    pub deleted_removed: u64,
    pub deleted_documents_removed: u64,
}

pub struct NodeCleaner {
    repository: Arc<dyn NodeRepository>,
    search_index: Arc<dyn SearchIndex>,
    ttl: TtlConfig,
}

impl NodeCleaner {
    pub fn new(
        repository: Arc<dyn NodeRepository>,
        search_index: Arc<dyn SearchIndex>,
        ttl: TtlConfig,
    ) -> Self {
        Self {
            repository,
            search_index,
            ttl,
        }
    }

    /// Failed nodes are never indexed, so only the document store is swept
    #[instrument(skip(self))]
    pub async fn remove_validation_failed(&self, now: i64) -> Result<u64> {
        let before = now - self.ttl.validation_failed_seconds;
        self.repository
            .remove_created_before(NodeStatus::ValidationFailed, before)
            .await
    }

    /// Returns (document store records, index documents) removed
    #[instrument(skip(self))]
    pub async fn remove_deleted(&self, now: i64) -> Result<(u64, u64)> {
        let before = now - self.ttl.deleted_seconds;
        let records = self
            .repository
            .remove_updated_before(NodeStatus::Deleted, before)
            .await?;
        let documents = self
            .search_index
            .remove_updated_before(NodeStatus::Deleted, before)
            .await?;
        Ok((records, documents))
    }

    pub async fn run(&self) -> Result<CleanupReport> {
        self.run_at(now_unix()).await
    }

    pub async fn run_at(&self, now: i64) -> Result<CleanupReport> {
        let validation_failed_removed = self.remove_validation_failed(now).await?;
        let (deleted_removed, deleted_documents_removed) = self.remove_deleted(now).await?;

        let report = CleanupReport {
            validation_failed_removed,
            deleted_removed,
            deleted_documents_removed,
        };
        info!(
            validation_failed_removed,
            deleted_removed,
            deleted_documents_removed,
            "🧹 Node cleanup finished"
        );
        Ok(report)
    }
}
