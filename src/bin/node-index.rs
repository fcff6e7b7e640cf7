//! # Node Index Service
//!
//! Runs the node lifecycle engine: connects the stores and the event bus,
//! subscribes to validator results and serves until Ctrl-C.

use anyhow::Context;
use node_index::config::ConfigManager;
use node_index::logging::init_structured_logging;
use node_index::NodeIndexSystem;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let config_manager = ConfigManager::load().context("failed to load configuration")?;
    let mut system = NodeIndexSystem::bootstrap(config_manager)
        .await
        .context("failed to bootstrap node index")?;

    system.start_listeners();
    info!("✅ Node index running; press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("Shutdown signal received");
    system.shutdown().await;
    Ok(())
}
