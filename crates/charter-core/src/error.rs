//! Core error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid Chart.yaml: {message}")]
    InvalidChart { message: String },

    #[error("Malformed document in {source_name}: {message}")]
    Format { source_name: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("Invalid version constraint '{constraint}': {message}")]
    InvalidConstraint { constraint: String, message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

impl CoreError {
    /// Build a [`CoreError::Format`] for a named source
    pub fn format(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error reports a missing file or directory
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
