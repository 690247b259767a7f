//! Charter Repo - repository identities and dependency resolution
//!
//! - `canonical`: reduce repository URLs to a comparable `host/path.git` key
//! - `config`: the repository table (`config.yaml`) and home directory layout
//! - `dependency`: resolve a chart's dependency graph against the workspace
//!   and repository caches

pub mod canonical;
pub mod config;
pub mod dependency;
pub mod error;

pub use canonical::{canonicalize, same_repository};
pub use config::{DEFAULT_REPO_NAME, DEFAULT_REPO_URL, Home, Repository, RepositoryTable};
pub use dependency::{
    Mismatch, Resolution, Resolutions, Resolver, load_charts, missing_dependencies,
    resolution_key, satisfies, version_matches,
};
pub use error::{RepoError, Result};
