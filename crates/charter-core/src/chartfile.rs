//! Chartfile definition and loading

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::version::{Constraint, parse_version};

/// File name of the chart metadata document
pub const CHARTFILE_NAME: &str = "Chart.yaml";

/// Chart metadata, as stored in `Chart.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chartfile {
    /// Chart name (required for dependency checks)
    #[serde(default)]
    pub name: String,

    /// Where this chart was fetched from; absent for locally authored charts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Origin>,

    /// Home URL
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub home: String,

    /// Source URLs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source: Vec<String>,

    /// Chart version (semver)
    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Maintainers, usually `Name <email>`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<String>,

    /// Free-form details
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,

    /// Hook name to command, run by external generators
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub preinstall: BTreeMap<String, String>,
}

/// Back-reference to the repository chart a workspace chart was fetched from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub repo: String,
}

/// A requirement on another chart
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Target chart name
    pub name: String,

    /// Version constraint (semver range)
    #[serde(default)]
    pub version: String,

    /// Repository alias or URL; empty matches any repository
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo: String,
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            repo: String::new(),
        }
    }

    /// Scope this dependency to a repository
    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = repo.into();
        self
    }

    /// Whether this dependency accepts charts from any repository
    #[inline]
    pub fn is_repo_wildcard(&self) -> bool {
        self.repo.trim().is_empty()
    }

    /// Parse the version constraint
    pub fn constraint(&self) -> Result<Constraint> {
        Constraint::parse(&self.version)
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_repo_wildcard() {
            write!(f, "{} {}", self.name, self.version)
        } else {
            write!(f, "{}/{} {}", self.repo, self.name, self.version)
        }
    }
}

impl Chartfile {
    /// Load a Chartfile from a `Chart.yaml` path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CoreError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load the Chartfile of a chart directory
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::load(dir.as_ref().join(CHARTFILE_NAME))
    }

    /// Parse a Chartfile from YAML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Write this Chartfile as YAML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the fields dependency resolution relies on
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::MissingField {
                field: "name".to_string(),
            });
        }
        if self.version.trim().is_empty() {
            return Err(CoreError::MissingField {
                field: "version".to_string(),
            });
        }
        parse_version(&self.version).map_err(|e| CoreError::InvalidChart {
            message: format!("version '{}' of chart '{}': {}", self.version, self.name, e),
        })?;
        for dep in &self.dependencies {
            dep.constraint()?;
        }
        Ok(())
    }

    /// Origin repository, if this chart was fetched
    pub fn origin_repo(&self) -> Option<&str> {
        self.from
            .as_ref()
            .map(|f| f.repo.as_str())
            .filter(|r| !r.is_empty())
    }

    /// Whether this chart was fetched from a repository
    #[inline]
    pub fn is_fetched(&self) -> bool {
        self.from.is_some()
    }
}
