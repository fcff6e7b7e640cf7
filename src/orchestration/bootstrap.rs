//! # Node Index Bootstrap
//!
//! Wires configuration, stores, event bus and the node service into one
//! [`NodeIndexSystem`] and manages the event listeners' lifecycle.
//!
//! - **Startup resilience**: the document store, the event bus and the search
//!   index bootstrap are retried with exponential backoff before giving up
//! - **Graceful shutdown**: listeners stop polling and drain in-flight handlers

use super::event_handlers::spawn_node_listeners;
use super::node_cleaner::NodeCleaner;
use super::node_service::{NodeService, NodeServiceSettings};
use crate::config::{ConfigManager, FeatureToggles};
use crate::database::{connect_with_retry, run_migrations, NodeRepository, PgNodeRepository};
use crate::error::Result;
use crate::messaging::{EventPublisher, ListenerHandle, MessagingService, PgmqMessagingService};
use crate::resilience::{retry_with_backoff, RetryPolicy};
use crate::search::{ElasticsearchIndex, SearchIndex};
use crate::services::{CountryResolver, HttpProfileProbe, LibraryCountryResolver, ProfileProbe};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Collaborators the node service is built from
pub struct SystemComponents {
    pub repository: Arc<dyn NodeRepository>,
    pub search_index: Arc<dyn SearchIndex>,
    pub messaging: Arc<dyn MessagingService>,
    pub probe: Arc<dyn ProfileProbe>,
    pub countries: Arc<dyn CountryResolver>,
}

/// Running node index with its listeners
pub struct NodeIndexSystem {
    config_manager: Arc<ConfigManager>,
    components: SystemComponents,
    node_service: Arc<NodeService>,
    toggles: Arc<FeatureToggles>,
    listeners: Vec<ListenerHandle>,
}

impl NodeIndexSystem {
    /// Connect every production backend described by the configuration
    pub async fn bootstrap(config_manager: Arc<ConfigManager>) -> Result<Self> {
        let components = Self::connect(&config_manager).await?;
        Self::from_components(config_manager, components).await
    }

    /// PostgreSQL, pgmq, Elasticsearch and the HTTP collaborators
    pub async fn connect(config_manager: &ConfigManager) -> Result<SystemComponents> {
        let config = config_manager.config();
        config.validate()?;
        let policy = RetryPolicy::from_config(&config.retry);

        let pool = connect_with_retry(&config.database, &policy).await?;
        run_migrations(&pool).await?;

        let queue_url = config.messaging_database_url();
        let messaging = retry_with_backoff(&policy, "event bus connection", move || {
            PgmqMessagingService::new(queue_url)
        })
        .await?;

        let search_index =
            ElasticsearchIndex::new(&config.search, config.server.tags_fuzziness.clone())?;
        let index_ref = &search_index;
        retry_with_backoff(&policy, "search cluster ping", move || index_ref.ping()).await?;
        search_index.ensure_index().await?;

        let probe = HttpProfileProbe::new(Duration::from_secs(config.probe.timeout_seconds))?;
        let countries = LibraryCountryResolver::new(
            &config.library.url,
            Duration::from_secs(config.library.request_timeout_seconds),
        )?;

        Ok(SystemComponents {
            repository: Arc::new(PgNodeRepository::new(pool)),
            search_index: Arc::new(search_index),
            messaging: Arc::new(messaging),
            probe: Arc::new(probe),
            countries: Arc::new(countries),
        })
    }

    /// Build the service over already connected collaborators
    pub async fn from_components(
        config_manager: Arc<ConfigManager>,
        components: SystemComponents,
    ) -> Result<Self> {
        let config = config_manager.config();
        let publisher = EventPublisher::new(components.messaging.clone());
        publisher.ensure_queues().await?;

        let toggles = Arc::new(FeatureToggles::new(config.feature_toggles.clone()));
        let node_service = Arc::new(NodeService::new(
            components.repository.clone(),
            components.search_index.clone(),
            publisher,
            components.probe.clone(),
            components.countries.clone(),
            toggles.clone(),
            NodeServiceSettings::from_config(&config.server),
        ));

        info!(
            environment = %config_manager.environment(),
            provider = components.messaging.provider_name(),
            "🚀 Node index system ready"
        );

        Ok(Self {
            config_manager,
            components,
            node_service,
            toggles,
            listeners: Vec::new(),
        })
    }

    pub fn node_service(&self) -> &Arc<NodeService> {
        &self.node_service
    }

    pub fn toggles(&self) -> &Arc<FeatureToggles> {
        &self.toggles
    }

    pub fn config_manager(&self) -> &Arc<ConfigManager> {
        &self.config_manager
    }

    pub fn cleaner(&self) -> NodeCleaner {
        NodeCleaner::new(
            self.components.repository.clone(),
            self.components.search_index.clone(),
            self.config_manager.config().ttl.clone(),
        )
    }

    /// Subscribe to the validator's result subjects
    pub fn start_listeners(&mut self) {
        if !self.listeners.is_empty() {
            return;
        }
        self.listeners = spawn_node_listeners(
            self.components.messaging.clone(),
            self.node_service.clone(),
            &self.config_manager.config().messaging,
        );
        info!(listeners = self.listeners.len(), "👂 Event listeners started");
    }

    pub fn is_listening(&self) -> bool {
        !self.listeners.is_empty()
    }

    pub async fn shutdown(mut self) {
        for listener in self.listeners.drain(..) {
            listener.shutdown().await;
        }
        info!("🛑 Node index system stopped");
    }
}
