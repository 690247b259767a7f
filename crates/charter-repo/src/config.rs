//! Repository table and home directory layout
//!
//! The repository table lives in `<home>/config.yaml`:
//!
//! ```yaml
//! default: charts
//! repositories:
//!   - name: charts
//!     url: https://github.com/helm/charts
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::canonical::canonicalize;
use crate::error::{RepoError, Result};

/// Alias of the repository every fresh table starts with
pub const DEFAULT_REPO_NAME: &str = "charts";

/// URL of the default repository
pub const DEFAULT_REPO_URL: &str = "https://github.com/helm/charts";

/// Alias → remote URL mapping plus the default alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryTable {
    /// Alias used when a chart names no repository
    #[serde(default = "default_repo_name")]
    pub default: String,

    /// Configured repositories
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

fn default_repo_name() -> String {
    DEFAULT_REPO_NAME.to_string()
}

impl Default for RepositoryTable {
    fn default() -> Self {
        Self {
            default: default_repo_name(),
            repositories: vec![Repository::new(DEFAULT_REPO_NAME, DEFAULT_REPO_URL)],
        }
    }
}

impl RepositoryTable {
    /// Load the table from a path, falling back to the default table if absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load the table from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let table: Self = serde_yaml::from_str(&content)?;
        Ok(table)
    }

    /// Save the table to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get a repository by alias
    pub fn get(&self, name: &str) -> Option<&Repository> {
        self.repositories.iter().find(|r| r.name == name)
    }

    /// The repository named by `default`
    pub fn default_repository(&self) -> Result<&Repository> {
        self.get(&self.default)
            .ok_or_else(|| RepoError::RepositoryNotFound {
                name: self.default.clone(),
            })
    }

    /// Add a repository, rejecting duplicate aliases and unparseable URLs
    pub fn add(&mut self, repo: Repository) -> Result<()> {
        if self.get(&repo.name).is_some() {
            return Err(RepoError::RepositoryAlreadyExists {
                name: repo.name.clone(),
            });
        }
        canonicalize(&repo.url)?;
        self.repositories.push(repo);
        Ok(())
    }

    /// Remove a repository by alias
    pub fn remove(&mut self, name: &str) -> Result<Repository> {
        let idx = self
            .repositories
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| RepoError::RepositoryNotFound {
                name: name.to_string(),
            })?;
        Ok(self.repositories.remove(idx))
    }

    /// List all repository aliases
    pub fn names(&self) -> Vec<&str> {
        self.repositories.iter().map(|r| r.name.as_str()).collect()
    }

    /// Translate an alias to its URL; anything else is returned as-is
    pub fn resolve_url<'a>(&'a self, alias_or_url: &'a str) -> &'a str {
        self.get(alias_or_url)
            .map(|r| r.url.as_str())
            .unwrap_or(alias_or_url)
    }

    /// Find the alias whose URL canonicalizes to `canonical`
    pub fn alias_for(&self, canonical: &str) -> Option<&Repository> {
        self.repositories
            .iter()
            .find(|r| canonicalize(&r.url).is_ok_and(|c| c == canonical))
    }

    /// Split `alias/chart` into its parts; a bare name uses the default alias
    pub fn split_qualified<'a>(&'a self, qualified: &'a str) -> (&'a str, &'a str) {
        match qualified.split_once('/') {
            Some((alias, chart)) => (alias, chart),
            None => (self.default.as_str(), qualified),
        }
    }
}

/// A named remote chart source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Unique alias for this repository
    pub name: String,

    /// Remote URL (git SSH, http(s) or local path)
    pub url: String,
}

impl Repository {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Canonical identity of this repository
    pub fn canonical(&self) -> Result<String> {
        canonicalize(&self.url)
    }
}

/// On-disk layout of the charter home directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Home {
    root: PathBuf,
}

impl Home {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<data dir>/charter`
    pub fn default_root() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| RepoError::InvalidConfig {
            message: "Could not determine data directory".to_string(),
        })?;
        Ok(data_dir.join("charter"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Repository table file
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.yaml")
    }

    /// Directory of charts fetched into the workspace
    pub fn workspace_charts(&self) -> PathBuf {
        self.root.join("workspace").join("charts")
    }

    /// Local checkout of one repository
    pub fn cache(&self, alias: &str) -> PathBuf {
        self.root.join("cache").join(alias)
    }

    /// Chart directory inside a repository cache
    pub fn cached_chart(&self, alias: &str, chart: &str) -> PathBuf {
        self.cache(alias).join(chart)
    }

    /// Load the repository table of this home
    pub fn repositories(&self) -> Result<RepositoryTable> {
        RepositoryTable::load_or_default(&self.config_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = RepositoryTable::default();
        assert_eq!(table.default, "charts");
        assert_eq!(table.default_repository().unwrap().url, DEFAULT_REPO_URL);
        assert_eq!(table.names(), vec!["charts"]);
    }

    #[test]
    fn test_table_add_remove() {
        let mut table = RepositoryTable::default();

        table.add(Repository::new("mine", "git@example.com:me/charts.git")).unwrap();
        assert!(table.get("mine").is_some());
        assert!(matches!(
            table.add(Repository::new("mine", "https://other.com/x")),
            Err(RepoError::RepositoryAlreadyExists { .. })
        ));
        assert!(matches!(
            table.add(Repository::new("bad", "no-host-or-path")),
            Err(RepoError::InvalidRepositoryUrl { .. })
        ));

        let removed = table.remove("mine").unwrap();
        assert_eq!(removed.name, "mine");
        assert!(table.get("mine").is_none());
        assert!(matches!(
            table.remove("mine"),
            Err(RepoError::RepositoryNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_url_and_alias_lookup() {
        let mut table = RepositoryTable::default();
        table.add(Repository::new("mine", "git@example.com:me/charts.git")).unwrap();

        assert_eq!(table.resolve_url("mine"), "git@example.com:me/charts.git");
        assert_eq!(table.resolve_url("https://x.org/y"), "https://x.org/y");

        let found = table.alias_for("example.com/me/charts.git").unwrap();
        assert_eq!(found.name, "mine");
        assert!(table.alias_for("example.com/other.git").is_none());
    }

    #[test]
    fn test_split_qualified() {
        let table = RepositoryTable::default();
        assert_eq!(table.split_qualified("mine/redis"), ("mine", "redis"));
        assert_eq!(table.split_qualified("redis"), ("charts", "redis"));
    }

    #[test]
    fn test_table_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let home = Home::new(dir.path());

        let mut table = home.repositories().unwrap();
        assert_eq!(table, RepositoryTable::default());

        table.add(Repository::new("mine", "/srv/charts")).unwrap();
        table.default = "mine".to_string();
        table.save_to(&home.config_file()).unwrap();

        let loaded = home.repositories().unwrap();
        assert_eq!(loaded.default, "mine");
        assert_eq!(loaded.repositories.len(), 2);
    }

    #[test]
    fn test_home_layout() {
        let home = Home::new("/tmp/charter");
        assert_eq!(home.config_file(), PathBuf::from("/tmp/charter/config.yaml"));
        assert_eq!(home.workspace_charts(), PathBuf::from("/tmp/charter/workspace/charts"));
        assert_eq!(
            home.cached_chart("charts", "redis"),
            PathBuf::from("/tmp/charter/cache/charts/redis")
        );
    }
}
