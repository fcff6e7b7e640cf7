//! # Messaging Error Types
//!
//! Structured errors for the event bus adapter.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("Queue operation failed: {queue_name}: {operation}: {message}")]
    QueueOperation {
        queue_name: String,
        operation: String,
        message: String,
    },

    #[error("Queue not found: {queue_name}")]
    QueueNotFound { queue_name: String },

    #[error("Message not found: {message_id}")]
    MessageNotFound { message_id: String },

    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("Message deserialization error: {message}")]
    MessageDeserialization { message: String },

    #[error("Configuration error: {component}: {message}")]
    Configuration { component: String, message: String },

    #[error("Internal messaging error: {message}")]
    Internal { message: String },
}

impl MessagingError {
    pub fn database_connection(message: impl Into<String>) -> Self {
        Self::DatabaseConnection {
            message: message.into(),
        }
    }

    pub fn queue_operation(
        queue_name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::QueueOperation {
            queue_name: queue_name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn queue_not_found(queue_name: impl Into<String>) -> Self {
        Self::QueueNotFound {
            queue_name: queue_name.into(),
        }
    }

    pub fn message_not_found(message_id: impl Into<String>) -> Self {
        Self::MessageNotFound {
            message_id: message_id.into(),
        }
    }

    pub fn message_serialization(message: impl Into<String>) -> Self {
        Self::MessageSerialization {
            message: message.into(),
        }
    }

    pub fn message_deserialization(message: impl Into<String>) -> Self {
        Self::MessageDeserialization {
            message: message.into(),
        }
    }

    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Poison messages: redelivery will never succeed
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::MessageDeserialization { .. } | Self::MessageSerialization { .. }
        )
    }
}

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() || err.is_eof() {
            MessagingError::message_deserialization(err.to_string())
        } else {
            MessagingError::message_serialization(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_errors_are_permanent() {
        let err: MessagingError = serde_json::from_str::<u32>("\"nope\"").unwrap_err().into();
        assert!(err.is_permanent());
        assert!(!MessagingError::queue_not_found("q").is_permanent());
    }

    #[test]
    fn test_display() {
        let err = MessagingError::queue_operation("node_created", "send", "boom");
        assert_eq!(
            err.to_string(),
            "Queue operation failed: node_created: send: boom"
        );
    }
}
