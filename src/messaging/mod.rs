//! # Event Bus Adapter
//!
//! Durable, queue-grouped publish/subscribe for node lifecycle events.
//! One queue per [`Subject`]; consumers sharing a queue compete for its
//! messages, giving at-least-once delivery across the group.

pub mod errors;
pub mod in_memory;
pub mod listener;
pub mod message;
pub mod pgmq_service;
pub mod publisher;
pub mod service;

pub use errors::MessagingError;
pub use in_memory::InMemoryMessagingService;
pub use listener::{Listener, ListenerHandle, MessageHandler, SubscriptionOptions};
pub use message::{
    NodeCreatedData, NodeValidatedData, NodeValidationFailedData, QueuedMessage, Subject,
};
pub use pgmq_service::PgmqMessagingService;
pub use publisher::{CompletionCallback, EventPublisher, PublishResult};
pub use service::MessagingService;
