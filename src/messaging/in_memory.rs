//! # In-Memory Messaging Service
//!
//! Queue implementation for tests and local runs.
//!
//! - **Visibility timeout**: received messages are hidden until the timeout
//!   passes, then redelivered with an incremented read count
//! - **Archive**: archived messages are kept per queue for inspection

use super::{MessagingError, MessagingService, QueuedMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct InMemoryQueuedMessage {
    id: i64,
    payload: Value,
    enqueued_at: DateTime<Utc>,
    /// `None` = visible now
    visible_at: Option<DateTime<Utc>>,
    read_count: i32,
}

#[derive(Debug)]
struct InMemoryQueue {
    messages: VecDeque<InMemoryQueuedMessage>,
    archived: Vec<InMemoryQueuedMessage>,
    next_id: i64,
}

impl InMemoryQueue {
    fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            archived: Vec::new(),
            next_id: 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMessagingService {
    queues: RwLock<HashMap<String, InMemoryQueue>>,
}

impl InMemoryMessagingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages still in the queue, visible or in flight
    pub async fn queue_length(&self, queue_name: &str) -> usize {
        let queues = self.queues.read().await;
        queues.get(queue_name).map_or(0, |q| q.messages.len())
    }

    pub async fn archived_count(&self, queue_name: &str) -> usize {
        let queues = self.queues.read().await;
        queues.get(queue_name).map_or(0, |q| q.archived.len())
    }

    /// Payloads currently in the queue, oldest first
    pub async fn peek(&self, queue_name: &str) -> Vec<Value> {
        let queues = self.queues.read().await;
        queues.get(queue_name).map_or_else(Vec::new, |q| {
            q.messages.iter().map(|m| m.payload.clone()).collect()
        })
    }

    /// Make every in-flight message visible again, as if its ack wait expired
    pub async fn expire_in_flight(&self, queue_name: &str) {
        let mut queues = self.queues.write().await;
        if let Some(queue) = queues.get_mut(queue_name) {
            for message in queue.messages.iter_mut() {
                message.visible_at = None;
            }
        }
    }

    fn remove(
        queue: &mut InMemoryQueue,
        message_id: i64,
    ) -> Result<InMemoryQueuedMessage, MessagingError> {
        let position = queue
            .messages
            .iter()
            .position(|m| m.id == message_id)
            .ok_or_else(|| MessagingError::message_not_found(message_id.to_string()))?;
        queue
            .messages
            .remove(position)
            .ok_or_else(|| MessagingError::message_not_found(message_id.to_string()))
    }
}

#[async_trait]
impl MessagingService for InMemoryMessagingService {
    async fn ensure_queue(&self, queue_name: &str) -> Result<(), MessagingError> {
        let mut queues = self.queues.write().await;
        queues
            .entry(queue_name.to_string())
            .or_insert_with(InMemoryQueue::new);
        Ok(())
    }

    async fn send(&self, queue_name: &str, payload: &Value) -> Result<i64, MessagingError> {
        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let id = queue.next_id;
        queue.next_id += 1;
        queue.messages.push_back(InMemoryQueuedMessage {
            id,
            payload: payload.clone(),
            enqueued_at: Utc::now(),
            visible_at: None,
            read_count: 0,
        });
        Ok(id)
    }

    async fn receive(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueuedMessage>, MessagingError> {
        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let now = Utc::now();
        let timeout = chrono::Duration::from_std(visibility_timeout)
            .map_err(|e| MessagingError::configuration("visibility_timeout", e.to_string()))?;
        let visible_until = now + timeout;

        let mut received = Vec::new();
        for message in queue.messages.iter_mut() {
            if received.len() >= max_messages {
                break;
            }
            if message.visible_at.map_or(true, |at| at <= now) {
                message.visible_at = Some(visible_until);
                message.read_count += 1;
                received.push(QueuedMessage {
                    id: message.id,
                    queue_name: queue_name.to_string(),
                    read_count: message.read_count,
                    enqueued_at: message.enqueued_at,
                    payload: message.payload.clone(),
                });
            }
        }
        Ok(received)
    }

    async fn ack(&self, queue_name: &str, message_id: i64) -> Result<(), MessagingError> {
        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;
        Self::remove(queue, message_id).map(|_| ())
    }

    async fn archive(&self, queue_name: &str, message_id: i64) -> Result<(), MessagingError> {
        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;
        let message = Self::remove(queue, message_id)?;
        queue.archived.push(message);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_send_receive_ack() {
        let service = InMemoryMessagingService::new();
        service.ensure_queue("q").await.unwrap();
        let id = service.send("q", &json!({ "n": 1 })).await.unwrap();

        let messages = service.receive("q", 10, Duration::from_secs(30)).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, id);
        assert_eq!(messages[0].read_count, 1);

        // in flight, not visible
        assert!(service.receive("q", 10, Duration::from_secs(30)).await.unwrap().is_empty());

        service.ack("q", id).await.unwrap();
        assert_eq!(service.queue_length("q").await, 0);
    }

    #[tokio::test]
    async fn test_unacked_message_is_redelivered_after_visibility_timeout() {
        let service = InMemoryMessagingService::new();
        service.ensure_queue("q").await.unwrap();
        service.send("q", &json!({})).await.unwrap();

        service.receive("q", 1, Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;

        let redelivered = service.receive("q", 1, Duration::from_secs(30)).await.unwrap();
        assert_eq!(redelivered.len(), 1);
        assert_eq!(redelivered[0].read_count, 2);
    }

    #[tokio::test]
    async fn test_archive_and_missing_queue() {
        let service = InMemoryMessagingService::new();
        assert!(matches!(
            service.send("missing", &json!({})).await,
            Err(MessagingError::QueueNotFound { .. })
        ));

        service.ensure_queue("q").await.unwrap();
        let id = service.send("q", &json!({})).await.unwrap();
        service.archive("q", id).await.unwrap();
        assert_eq!(service.queue_length("q").await, 0);
        assert_eq!(service.archived_count("q").await, 1);
        assert!(service.ack("q", id).await.is_err());
    }
}
