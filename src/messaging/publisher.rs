//! # Event Publisher
//!
//! Publishes subject payloads to their queues. [`EventPublisher::publish`]
//! reports the outcome to the caller; [`EventPublisher::publish_detached`]
//! runs in the background and only hands the outcome to a completion
//! callback. Neither retries.

use super::{MessagingError, MessagingService, Subject};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

pub type PublishResult = Result<i64, MessagingError>;

/// Invoked once a detached publish settles
pub type CompletionCallback = Box<dyn FnOnce(Subject, &PublishResult) + Send + 'static>;

#[derive(Clone)]
pub struct EventPublisher {
    service: Arc<dyn MessagingService>,
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher")
            .field("provider", &self.service.provider_name())
            .finish()
    }
}

impl EventPublisher {
    pub fn new(service: Arc<dyn MessagingService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<dyn MessagingService> {
        &self.service
    }

    /// Create the queue of every subject
    pub async fn ensure_queues(&self) -> Result<(), MessagingError> {
        for subject in Subject::ALL {
            self.service.ensure_queue(&subject.queue_name()).await?;
        }
        Ok(())
    }

    pub async fn publish<T: Serialize + ?Sized>(
        &self,
        subject: Subject,
        data: &T,
    ) -> PublishResult {
        let payload = serde_json::to_value(data)
            .map_err(|e| MessagingError::message_serialization(e.to_string()))?;
        let message_id = self.service.send(&subject.queue_name(), &payload).await?;
        debug!(subject = %subject, message_id, "📤 Event published");
        Ok(message_id)
    }

    /// Fire-and-forget publish; without a callback failures are logged
    pub fn publish_detached<T: Serialize + ?Sized>(
        &self,
        subject: Subject,
        data: &T,
        on_complete: Option<CompletionCallback>,
    ) {
        let payload = serde_json::to_value(data)
            .map_err(|e| MessagingError::message_serialization(e.to_string()));
        let service = self.service.clone();

        tokio::spawn(async move {
            let result = match payload {
                Ok(payload) => service.send(&subject.queue_name(), &payload).await,
                Err(e) => Err(e),
            };
            match on_complete {
                Some(callback) => callback(subject, &result),
                None => {
                    if let Err(e) = &result {
                        warn!(subject = %subject, error = %e, "Detached publish failed");
                    }
                }
            }
        });
    }
}
