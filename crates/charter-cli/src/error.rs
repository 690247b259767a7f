//! CLI error types with exit code handling
//!
//! Every library error is folded into [`CliError`], which knows the exit
//! code the process should terminate with.

use charter_core::CoreError;
use charter_kube::KubeError;
use charter_repo::RepoError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Chart structure, Chart.yaml or manifest error
    #[error("Chart error: {message}")]
    #[diagnostic(code(charter::cli::chart))]
    Chart {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Dependencies missing or out of range
    #[error("Dependency error: {message}")]
    #[diagnostic(code(charter::cli::dependency))]
    Dependency {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Repository table or lookup error
    #[error("Repository error: {message}")]
    #[diagnostic(code(charter::cli::repo))]
    Repository {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The cluster client failed or rejected a resource
    #[error("Cluster error: {message}")]
    #[diagnostic(code(charter::cli::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(charter::cli::io))]
    Io { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Chart { .. } => exit_codes::CHART_ERROR,
            CliError::Dependency { .. } => exit_codes::DEPENDENCY_ERROR,
            CliError::Repository { .. } => exit_codes::ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
        }
    }

    /// Create a chart error with help text
    pub fn chart_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Chart {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a dependency error with help text
    pub fn dependency_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Dependency {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a repository error
    pub fn repository(message: impl Into<String>) -> Self {
        Self::Repository {
            message: message.into(),
            help: None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(e) => e.into(),
            CoreError::NotFound { ref path } => CliError::chart_with_help(
                err.to_string(),
                format!(
                    "{} should be a chart directory containing Chart.yaml",
                    path.display()
                ),
            ),
            other => CliError::Chart {
                message: other.to_string(),
                help: None,
            },
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Core(e) => e.into(),
            RepoError::Io(e) => e.into(),
            RepoError::Workspace { .. } => CliError::Io {
                message: err.to_string(),
            },
            RepoError::RepositoryNotFound { .. } => CliError::Repository {
                message: err.to_string(),
                help: Some("Run 'charter repo list' to see configured repositories".to_string()),
            },
            other => CliError::repository(other.to_string()),
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::Core(e) => e.into(),
            KubeError::Repo(e) => e.into(),
            KubeError::Io(e) => e.into(),
            KubeError::UnsatisfiedDependencies { chart, dependencies } => {
                CliError::dependency_with_help(
                    format!("chart '{}' needs {}", chart, dependencies),
                    "Install the dependencies first, or pass --force",
                )
            }
            other => CliError::Cluster {
                message: other.to_string(),
                help: Some("Check the cluster with 'charter cluster-info'".to_string()),
            },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
