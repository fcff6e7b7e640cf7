//! # Node Event Handlers
//!
//! Consumers of the validator's results. `node:validated` drives
//! [`NodeService::set_node_valid`], `node:validation-failed` drives
//! [`NodeService::set_node_invalid`]. Both subscribe under the configured
//! queue group so replicas share the work.

use super::node_service::NodeService;
use crate::config::MessagingConfig;
use crate::error::Result;
use crate::logging::log_event_operation;
use crate::messaging::{
    Listener, ListenerHandle, MessageHandler, MessagingService, NodeValidatedData,
    NodeValidationFailedData, QueuedMessage, Subject, SubscriptionOptions,
};
use crate::models::Node;
use async_trait::async_trait;
use std::sync::Arc;

pub struct NodeValidatedHandler {
    service: Arc<NodeService>,
}

impl NodeValidatedHandler {
    pub fn new(service: Arc<NodeService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl MessageHandler for NodeValidatedHandler {
    async fn handle(&self, message: &QueuedMessage) -> Result<()> {
        let data: NodeValidatedData = message.decode()?;
        log_event_operation(
            Subject::NodeValidated.as_str(),
            message.id,
            message.read_count,
            Some(&data.profile_url),
        );

        let mut node = Node::new(data.profile_url);
        node.profile_str = Some(data.profile_str);
        node.last_updated = Some(data.last_updated);
        node.version = data.version;

        self.service.set_node_valid(node).await
    }
}

pub struct NodeValidationFailedHandler {
    service: Arc<NodeService>,
}

impl NodeValidationFailedHandler {
    pub fn new(service: Arc<NodeService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl MessageHandler for NodeValidationFailedHandler {
    async fn handle(&self, message: &QueuedMessage) -> Result<()> {
        let data: NodeValidationFailedData = message.decode()?;
        log_event_operation(
            Subject::NodeValidationFailed.as_str(),
            message.id,
            message.read_count,
            Some(&data.profile_url),
        );

        let mut node = Node::new(data.profile_url);
        node.failure_reasons = Some(data.failure_reasons);
        node.version = data.version;

        self.service.set_node_invalid(node).await
    }
}

/// Listeners for both validator result subjects, not yet started
pub fn node_listeners(
    messaging: Arc<dyn MessagingService>,
    service: Arc<NodeService>,
    config: &MessagingConfig,
) -> Vec<Listener> {
    vec![
        Listener::new(
            messaging.clone(),
            Subject::NodeValidated,
            SubscriptionOptions::for_subject(Subject::NodeValidated, config),
            Arc::new(NodeValidatedHandler::new(service.clone())),
        ),
        Listener::new(
            messaging,
            Subject::NodeValidationFailed,
            SubscriptionOptions::for_subject(Subject::NodeValidationFailed, config),
            Arc::new(NodeValidationFailedHandler::new(service)),
        ),
    ]
}

/// Spawn both listeners
pub fn spawn_node_listeners(
    messaging: Arc<dyn MessagingService>,
    service: Arc<NodeService>,
    config: &MessagingConfig,
) -> Vec<ListenerHandle> {
    node_listeners(messaging, service, config)
        .into_iter()
        .map(Listener::spawn)
        .collect()
}
