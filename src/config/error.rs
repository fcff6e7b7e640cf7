//! Configuration errors with constructor helpers.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The layered sources could not be read or merged
    #[error("Failed to load configuration: {error}")]
    LoadError { error: String },

    /// A file exists but is not valid YAML
    #[error("Invalid YAML in configuration file '{file_path}': {error}")]
    InvalidYaml { file_path: String, error: String },

    #[error("Configuration directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Missing required configuration field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },
}

impl ConfigurationError {
    pub fn load_error(error: impl std::fmt::Display) -> Self {
        Self::LoadError {
            error: error.to_string(),
        }
    }

    pub fn invalid_yaml(file_path: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::InvalidYaml {
            file_path: file_path.into(),
            error: error.to_string(),
        }
    }

    pub fn missing_required_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(error: config::ConfigError) -> Self {
        Self::load_error(error)
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
