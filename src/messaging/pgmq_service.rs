//! # PGMQ Messaging Service
//!
//! [`MessagingService`] over PostgreSQL message queues (`pgmq` crate).
//! Ack deletes the message; archive moves it to the queue's archive table.

use super::{MessagingError, MessagingService, QueuedMessage};
use async_trait::async_trait;
use pgmq::PGMQueue;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PgmqMessagingService {
    pgmq: PGMQueue,
}

impl PgmqMessagingService {
    pub async fn new(database_url: &str) -> Result<Self, MessagingError> {
        info!("🚀 Connecting to pgmq");
        let pgmq = PGMQueue::new(database_url.to_string())
            .await
            .map_err(|e| MessagingError::database_connection(e.to_string()))?;
        info!("✅ Connected to pgmq");
        Ok(Self { pgmq })
    }
}

#[async_trait]
impl MessagingService for PgmqMessagingService {
    async fn ensure_queue(&self, queue_name: &str) -> Result<(), MessagingError> {
        self.pgmq
            .create(queue_name)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "create", e.to_string()))?;
        debug!(queue = %queue_name, "📋 Queue ready");
        Ok(())
    }

    async fn send(&self, queue_name: &str, payload: &Value) -> Result<i64, MessagingError> {
        let message_id = self
            .pgmq
            .send(queue_name, payload)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "send", e.to_string()))?;
        debug!(queue = %queue_name, message_id, "📤 Message sent");
        Ok(message_id)
    }

    async fn receive(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueuedMessage>, MessagingError> {
        let vt = i32::try_from(visibility_timeout.as_secs().max(1)).unwrap_or(i32::MAX);
        let limit = i32::try_from(max_messages).unwrap_or(i32::MAX);

        let messages = self
            .pgmq
            .read_batch::<Value>(queue_name, Some(vt), limit)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "read", e.to_string()))?
            .unwrap_or_default();

        Ok(messages
            .into_iter()
            .map(|message| QueuedMessage {
                id: message.msg_id,
                queue_name: queue_name.to_string(),
                read_count: message.read_ct,
                enqueued_at: message.enqueued_at,
                payload: message.message,
            })
            .collect())
    }

    async fn ack(&self, queue_name: &str, message_id: i64) -> Result<(), MessagingError> {
        self.pgmq
            .delete(queue_name, message_id)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "delete", e.to_string()))?;
        Ok(())
    }

    async fn archive(&self, queue_name: &str, message_id: i64) -> Result<(), MessagingError> {
        self.pgmq
            .archive(queue_name, message_id)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "archive", e.to_string()))?;
        debug!(queue = %queue_name, message_id, "📦 Message archived");
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "pgmq"
    }
}
