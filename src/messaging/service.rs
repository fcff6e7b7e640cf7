//! # Messaging Service Trait
//!
//! Provider-agnostic queue operations. Payloads are JSON values; typed
//! decoding happens at the consumer through [`QueuedMessage::decode`].

use super::{MessagingError, QueuedMessage};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

#[async_trait]
pub trait MessagingService: Send + Sync {
    /// Create the queue when missing
    async fn ensure_queue(&self, queue_name: &str) -> Result<(), MessagingError>;

    /// Enqueue a message, returning its id
    async fn send(&self, queue_name: &str, payload: &Value) -> Result<i64, MessagingError>;

    /// Claim up to `max_messages` visible messages. Claimed messages stay
    /// invisible for `visibility_timeout` and are redelivered unless acked.
    async fn receive(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueuedMessage>, MessagingError>;

    /// Confirm processing; the message is removed
    async fn ack(&self, queue_name: &str, message_id: i64) -> Result<(), MessagingError>;

    /// Move a message out of the queue without processing it
    async fn archive(&self, queue_name: &str, message_id: i64) -> Result<(), MessagingError>;

    fn provider_name(&self) -> &'static str;
}
