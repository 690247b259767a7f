//! Error types for charter-kube

use thiserror::Error;

/// Result type for charter-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur during cluster operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// The cluster client rejected a create/apply/delete
    #[error("failed to {operation} {target}: {message}")]
    Dispatch {
        operation: &'static str,
        target: String,
        message: String,
    },

    /// The cluster client itself failed (binary missing, non-zero exit)
    #[error("`{command}` failed: {message}")]
    Client { command: String, message: String },

    /// Declared dependencies are not installed
    #[error("chart '{chart}' has unsatisfied dependencies: {dependencies}\nHint: install them first, or pass --force")]
    UnsatisfiedDependencies { chart: String, dependencies: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] charter_core::CoreError),

    #[error(transparent)]
    Repo(#[from] charter_repo::RepoError),
}
