//! # Node Cleaner
//!
//! One-shot retention sweep, meant to be scheduled (cron, Kubernetes CronJob).

use anyhow::Context;
use node_index::config::ConfigManager;
use node_index::database::{connect_with_retry, PgNodeRepository};
use node_index::logging::{init_structured_logging, log_error};
use node_index::orchestration::NodeCleaner;
use node_index::resilience::RetryPolicy;
use node_index::search::ElasticsearchIndex;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let config_manager = ConfigManager::load().context("failed to load configuration")?;
    let config = config_manager.config();
    config.validate().context("invalid configuration")?;

    let policy = RetryPolicy::from_config(&config.retry);
    let pool = connect_with_retry(&config.database, &policy)
        .await
        .context("failed to connect to the document store")?;
    let search_index = ElasticsearchIndex::new(&config.search, config.server.tags_fuzziness.clone())
        .context("failed to create search client")?;

    let cleaner = NodeCleaner::new(
        Arc::new(PgNodeRepository::new(pool)),
        Arc::new(search_index),
        config.ttl.clone(),
    );
    let report = match cleaner.run().await {
        Ok(report) => report,
        Err(e) => {
            log_error("node_cleaner", "run", &e.to_string(), None);
            return Err(e).context("node cleanup failed");
        }
    };

    info!(?report, "Node cleaner finished");
    Ok(())
}
