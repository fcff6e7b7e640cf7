//! # Error Types
//!
//! Crate-wide error taxonomy. Each variant maps onto an HTTP status and a
//! JSON:API style error object so the controller layer can render failures
//! without inspecting them.

use crate::config::ConfigurationError;
use crate::messaging::MessagingError;
use crate::state_machine::StateMachineError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeIndexError {
    /// Malformed or missing input, correctable by the caller
    #[error("Validation failed for '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("Record not found: {0}")]
    NotFound(String),

    /// Operation rejected because of the current external state
    #[error("{title}: {detail}")]
    Conflict {
        title: String,
        detail: String,
        node_id: String,
        profile_url: String,
    },

    #[error("Database error: {message}: {cause}")]
    Database { message: String, cause: String },

    #[error("Search index error: {0}")]
    SearchIndex(String),

    #[error("Profile error: {0}")]
    Profile(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("State transition error: {0}")]
    StateTransition(#[from] StateMachineError),
}

impl NodeIndexError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn database(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Database {
            message: message.into(),
            cause: cause.to_string(),
        }
    }

    pub fn search_index(message: impl std::fmt::Display) -> Self {
        Self::SearchIndex(message.to_string())
    }

    pub fn http(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Http(format!("{}: {cause}", message.into()))
    }

    pub fn conflict(
        title: impl Into<String>,
        detail: impl Into<String>,
        node_id: impl Into<String>,
        profile_url: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            title: title.into(),
            detail: detail.into(),
            node_id: node_id.into(),
            profile_url: profile_url.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Failures worth redelivering to another consumer
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Database { .. } | Self::SearchIndex(_) | Self::Messaging(_) | Self::Http(_)
        )
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::Profile(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict { .. } => 409,
            _ => 500,
        }
    }

    /// Render as a JSON:API error object
    pub fn to_error_object(&self) -> ErrorObject {
        let status = self.http_status().to_string();
        match self {
            Self::Validation { field, reason } => ErrorObject {
                status,
                title: "Validation Error".to_string(),
                detail: reason.clone(),
                source: Some(ErrorSource {
                    pointer: format!("/data/attributes/{field}"),
                }),
            },
            Self::NotFound(detail) => ErrorObject {
                status,
                title: "Record Not Found".to_string(),
                detail: detail.clone(),
                source: None,
            },
            Self::Conflict { title, detail, .. } => ErrorObject {
                status,
                title: title.clone(),
                detail: detail.clone(),
                source: None,
            },
            Self::Profile(detail) => ErrorObject {
                status,
                title: "Invalid Profile".to_string(),
                detail: detail.clone(),
                source: None,
            },
            other => ErrorObject {
                status,
                title: "Internal Server Error".to_string(),
                detail: other.to_string(),
                source: None,
            },
        }
    }

    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            errors: vec![self.to_error_object()],
        }
    }
}

/// `{errors: [...]}` body returned by the HTTP surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub errors: Vec<ErrorObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub status: String,
    pub title: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSource {
    pub pointer: String,
}

impl From<sqlx::Error> for NodeIndexError {
    fn from(error: sqlx::Error) -> Self {
        Self::database("document store operation failed", error)
    }
}

impl From<serde_json::Error> for NodeIndexError {
    fn from(error: serde_json::Error) -> Self {
        Self::Profile(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NodeIndexError>;
