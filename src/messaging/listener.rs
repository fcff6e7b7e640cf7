//! # Subscription Listener
//!
//! Polls one subject's queue and hands each delivery to a [`MessageHandler`].
//!
//! - **Manual ack**: a message is acked only after its handler succeeds
//! - **Ack wait**: claimed messages stay invisible for `ack_wait`; anything
//!   not acked by then is redelivered to any consumer of the queue group
//! - **Max in flight**: at most `max_in_flight` deliveries are processed
//!   concurrently, enforced by a semaphore
//! - **Poison messages**: undecodable or invalid payloads are archived
//!   immediately; messages failing `max_deliveries` times are archived

use super::{MessagingError, MessagingService, QueuedMessage, Subject};
use crate::config::MessagingConfig;
use crate::error::NodeIndexError;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionOptions {
    /// Consumer identity shared by every replica of the same consumer
    pub durable_name: String,
    pub queue_group: String,
    pub max_in_flight: usize,
    pub ack_wait: Duration,
    pub max_deliveries: i32,
    pub polling_interval: Duration,
}

impl SubscriptionOptions {
    pub fn for_subject(subject: Subject, config: &MessagingConfig) -> Self {
        Self {
            durable_name: format!("{}_consumer", subject.queue_name()),
            queue_group: config.queue_group.clone(),
            max_in_flight: config.max_in_flight.max(1),
            ack_wait: config.ack_wait(),
            max_deliveries: config.max_deliveries,
            polling_interval: config.polling_interval(),
        }
    }
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &QueuedMessage) -> Result<(), NodeIndexError>;
}

#[derive(Clone)]
pub struct Listener {
    service: Arc<dyn MessagingService>,
    subject: Subject,
    queue_name: String,
    options: SubscriptionOptions,
    handler: Arc<dyn MessageHandler>,
    semaphore: Arc<Semaphore>,
}

impl Listener {
    pub fn new(
        service: Arc<dyn MessagingService>,
        subject: Subject,
        options: SubscriptionOptions,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            service,
            subject,
            queue_name: subject.queue_name(),
            semaphore: Arc::new(Semaphore::new(options.max_in_flight)),
            options,
            handler,
        }
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    /// Deliveries currently being processed
    pub fn in_flight(&self) -> usize {
        self.options.max_in_flight - self.semaphore.available_permits()
    }

    /// Claim what the in-flight bound allows and wait for every handler to settle
    pub async fn poll_once(&self) -> Result<usize, MessagingError> {
        let tasks = self.dispatch().await?;
        let count = tasks.len();
        for result in join_all(tasks).await {
            if let Err(e) = result {
                error!(subject = %self.subject, error = %e, "Message task panicked");
            }
        }
        Ok(count)
    }

    /// Run the polling loop on a background task until shutdown
    pub fn spawn(self) -> ListenerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let subject = self.subject;
        let join = tokio::spawn(self.run(shutdown_rx));
        ListenerHandle {
            subject,
            shutdown: shutdown_tx,
            join,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            subject = %self.subject,
            durable_name = %self.options.durable_name,
            queue_group = %self.options.queue_group,
            max_in_flight = self.options.max_in_flight,
            ack_wait_seconds = self.options.ack_wait.as_secs(),
            "👂 Subscription started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let claimed = match self.dispatch().await {
                Ok(tasks) => tasks.len(),
                Err(e) => {
                    warn!(subject = %self.subject, error = %e, "Failed to receive messages");
                    0
                }
            };

            if claimed > 0 && self.semaphore.available_permits() > 0 {
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.options.polling_interval) => {}
                _ = shutdown.changed() => {}
            }
        }

        // Let in-flight handlers finish before returning
        let permits = u32::try_from(self.options.max_in_flight).unwrap_or(u32::MAX);
        if tokio::time::timeout(self.options.ack_wait, self.semaphore.acquire_many(permits))
            .await
            .is_err()
        {
            warn!(
                subject = %self.subject,
                in_flight = self.in_flight(),
                "Shutdown with handlers still running; their messages will be redelivered"
            );
        }
        info!(subject = %self.subject, "👋 Subscription stopped");
    }

    async fn dispatch(&self) -> Result<Vec<JoinHandle<()>>, MessagingError> {
        let available = self.semaphore.available_permits();
        if available == 0 {
            return Ok(Vec::new());
        }

        let messages = self
            .service
            .receive(&self.queue_name, available, self.options.ack_wait)
            .await?;

        let mut tasks = Vec::with_capacity(messages.len());
        for message in messages {
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| MessagingError::internal(e.to_string()))?;
            let listener = self.clone();
            tasks.push(tokio::spawn(async move {
                listener.process(message, permit).await;
            }));
        }
        Ok(tasks)
    }

    async fn process(&self, message: QueuedMessage, _permit: OwnedSemaphorePermit) {
        let message_id = message.id;
        match self.handler.handle(&message).await {
            Ok(()) => {
                if let Err(e) = self.service.ack(&self.queue_name, message_id).await {
                    warn!(
                        subject = %self.subject,
                        message_id,
                        error = %e,
                        "Ack failed; message will be redelivered"
                    );
                } else {
                    debug!(subject = %self.subject, message_id, "✅ Message acked");
                }
            }
            Err(e) if is_poison(&e) => {
                warn!(
                    subject = %self.subject,
                    message_id,
                    error = %e,
                    "☠️ Unprocessable message archived"
                );
                self.archive(message_id).await;
            }
            Err(e) if message.read_count >= self.options.max_deliveries => {
                error!(
                    subject = %self.subject,
                    message_id,
                    read_count = message.read_count,
                    error = %e,
                    "Message exceeded max deliveries and was archived"
                );
                self.archive(message_id).await;
            }
            Err(e) => {
                warn!(
                    subject = %self.subject,
                    message_id,
                    read_count = message.read_count,
                    error = %e,
                    "Handler failed; message left for redelivery"
                );
            }
        }
    }

    async fn archive(&self, message_id: i64) {
        if let Err(e) = self.service.archive(&self.queue_name, message_id).await {
            warn!(subject = %self.subject, message_id, error = %e, "Archive failed");
        }
    }
}

/// Failures that no redelivery can fix
fn is_poison(err: &NodeIndexError) -> bool {
    match err {
        NodeIndexError::Messaging(e) => e.is_permanent(),
        other => !other.is_transient(),
    }
}

/// Stops a spawned [`Listener`]
#[derive(Debug)]
pub struct ListenerHandle {
    subject: Subject,
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn subject(&self) -> Subject {
        self.subject
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            error!(subject = %self.subject, error = %e, "Listener task failed");
        }
    }
}
