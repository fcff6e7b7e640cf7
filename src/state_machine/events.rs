use serde::{Deserialize, Serialize};

/// Events that drive node status transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NodeEvent {
    /// A client submitted (or resubmitted) the profile URL
    Submit,
    /// The validator accepted the profile
    ValidationSucceeded,
    /// The validator rejected the profile
    ValidationFailed(Vec<String>),
    /// The normalized profile reached the search index
    IndexSucceeded,
    /// The search index rejected or could not take the document
    IndexFailed(String),
    /// Deletion requested after the profile was confirmed gone
    Delete,
}

impl NodeEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::ValidationSucceeded => "validation_succeeded",
            Self::ValidationFailed(_) => "validation_failed",
            Self::IndexSucceeded => "index_succeeded",
            Self::IndexFailed(_) => "index_failed",
            Self::Delete => "delete",
        }
    }

    /// Extract failure details carried by the event
    pub fn failure_reasons(&self) -> Option<&[String]> {
        match self {
            Self::ValidationFailed(reasons) => Some(reasons),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = NodeEvent::ValidationFailed(vec!["missing name".to_string()]);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ValidationFailed");
        assert_eq!(json["data"][0], "missing name");

        let back: NodeEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_failure_reasons() {
        assert!(NodeEvent::Submit.failure_reasons().is_none());
        let event = NodeEvent::ValidationFailed(vec!["a".into(), "b".into()]);
        assert_eq!(event.failure_reasons().unwrap().len(), 2);
        assert_eq!(event.event_type(), "validation_failed");
    }
}
