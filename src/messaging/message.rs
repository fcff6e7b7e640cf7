//! # Event Payloads
//!
//! Subjects carried on the event bus and their JSON payloads.

use super::MessagingError;
use crate::constants::subjects;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    NodeCreated,
    NodeValidated,
    NodeValidationFailed,
}

impl Subject {
    pub const ALL: [Subject; 3] = [
        Subject::NodeCreated,
        Subject::NodeValidated,
        Subject::NodeValidationFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NodeCreated => subjects::NODE_CREATED,
            Self::NodeValidated => subjects::NODE_VALIDATED,
            Self::NodeValidationFailed => subjects::NODE_VALIDATION_FAILED,
        }
    }

    /// Queue backing this subject; `node:validation-failed` → `node_validation_failed`
    pub fn queue_name(&self) -> String {
        self.as_str().replace([':', '-'], "_")
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `node:created`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCreatedData {
    pub profile_url: String,
    #[serde(default)]
    pub version: Option<i32>,
}

/// `node:validated`; `profile_str` is the raw profile body the validator fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeValidatedData {
    pub profile_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_hash: Option<String>,
    pub profile_str: String,
    pub last_updated: i64,
    #[serde(default)]
    pub version: Option<i32>,
}

/// `node:validation-failed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeValidationFailedData {
    pub profile_url: String,
    #[serde(default)]
    pub failure_reasons: Vec<String>,
    #[serde(default)]
    pub version: Option<i32>,
}

/// A delivery pulled from a queue, not yet acknowledged
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMessage {
    pub id: i64,
    pub queue_name: String,
    /// Deliveries so far, including this one
    pub read_count: i32,
    pub enqueued_at: DateTime<Utc>,
    pub payload: Value,
}

impl QueuedMessage {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, MessagingError> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| MessagingError::message_deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subject_queue_names() {
        assert_eq!(Subject::NodeCreated.queue_name(), "node_created");
        assert_eq!(Subject::NodeValidated.queue_name(), "node_validated");
        assert_eq!(
            Subject::NodeValidationFailed.queue_name(),
            "node_validation_failed"
        );
        assert_eq!(Subject::NodeValidationFailed.to_string(), "node:validation-failed");
    }

    #[test]
    fn test_decode_payloads() {
        let message = QueuedMessage {
            id: 1,
            queue_name: "node_validation_failed".into(),
            read_count: 1,
            enqueued_at: Utc::now(),
            payload: json!({ "profile_url": "https://a.org/p.json", "failure_reasons": ["bad"] }),
        };
        let data: NodeValidationFailedData = message.decode().unwrap();
        assert_eq!(data.failure_reasons, vec!["bad".to_string()]);
        assert_eq!(data.version, None);

        let err = message.decode::<NodeValidatedData>().unwrap_err();
        assert!(err.is_permanent());
    }
}
