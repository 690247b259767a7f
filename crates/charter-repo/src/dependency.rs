//! Dependency resolution against the workspace and repository caches
//!
//! A resolve pass walks a chart's dependency graph depth-first. Each edge is
//! keyed by `canonical-repo:name`; a key is recorded before its chart is
//! visited, so a graph with cycles still terminates. The root chart is
//! seeded under its own key and removed before returning.
//!
//! Absent or out-of-range dependencies are reported as [`Resolution`] data.
//! Only I/O failures abort a pass.

use charter_core::{Chartfile, Constraint, Dependency, parse_version};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::canonical::canonicalize;
use crate::config::{Home, RepositoryTable};
use crate::error::{RepoError, Result};

/// Key of a resolution: `repo:name`
pub fn resolution_key(repo: &str, name: &str) -> String {
    format!("{}:{}", repo, name)
}

/// Why a candidate chart does not satisfy a dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    Name { expected: String, actual: String },
    Repository { expected: String, actual: Option<String> },
    Version { version: String, constraint: String },
    InvalidConstraint { constraint: String, message: String },
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name { expected, actual } => {
                write!(f, "chart '{}' is not '{}'", actual, expected)
            }
            Self::Repository {
                expected,
                actual: Some(actual),
            } => write!(f, "chart comes from {} instead of {}", actual, expected),
            Self::Repository {
                expected,
                actual: None,
            } => write!(f, "chart has no origin repository, expected {}", expected),
            Self::Version {
                version,
                constraint,
            } => write!(f, "version {} does not satisfy {}", version, constraint),
            Self::InvalidConstraint {
                constraint,
                message,
            } => write!(f, "invalid constraint '{}': {}", constraint, message),
        }
    }
}

/// Check a candidate's version (or, failing that, its origin version)
pub fn version_matches(candidate: &Chartfile, constraint: &str) -> std::result::Result<(), Mismatch> {
    let parsed = Constraint::parse(constraint).map_err(|e| Mismatch::InvalidConstraint {
        constraint: constraint.to_string(),
        message: e.to_string(),
    })?;

    let origin_version = candidate.from.as_ref().map(|f| f.version.as_str());
    let in_range = std::iter::once(candidate.version.as_str())
        .chain(origin_version)
        .filter_map(|v| parse_version(v).ok())
        .any(|v| parsed.matches(&v));

    if in_range {
        Ok(())
    } else {
        Err(Mismatch::Version {
            version: candidate.version.clone(),
            constraint: constraint.to_string(),
        })
    }
}

/// Whether `candidate` satisfies `dep`: same name, same repository (unless
/// the dependency accepts any), and a version inside the constraint.
pub fn satisfies(
    candidate: &Chartfile,
    dep: &Dependency,
    table: &RepositoryTable,
) -> std::result::Result<(), Mismatch> {
    let origin_name = candidate.from.as_ref().map(|f| f.name.as_str());
    if candidate.name != dep.name && origin_name != Some(dep.name.as_str()) {
        return Err(Mismatch::Name {
            expected: dep.name.clone(),
            actual: candidate.name.clone(),
        });
    }

    if !dep.is_repo_wildcard() {
        let expected = canonicalize(table.resolve_url(&dep.repo)).ok();
        let actual = candidate.origin_repo().and_then(|r| canonicalize(r).ok());
        if expected.is_none() || expected != actual {
            return Err(Mismatch::Repository {
                expected: dep.repo.clone(),
                actual: candidate.origin_repo().map(str::to_string),
            });
        }
    }

    version_matches(candidate, &dep.version)
}

/// The verdict for one dependency edge
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Dependency chart name
    pub name: String,

    /// Canonical repository the dependency was looked up in
    pub repo: String,

    /// Version constraint of the first edge that reached this dependency
    pub constraint: String,

    /// The located chart, if any
    pub chartfile: Option<Chartfile>,

    /// Directory of the located chart
    pub path: Option<PathBuf>,

    pub found: bool,

    pub satisfies: bool,

    /// Why `satisfies` is false
    pub reason: Option<String>,

    /// Located in the workspace rather than only in a repository cache
    pub fetched: bool,
}

impl Resolution {
    fn missing(name: &str, repo: &str, constraint: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            repo: repo.to_string(),
            constraint: constraint.to_string(),
            chartfile: None,
            path: None,
            found: false,
            satisfies: false,
            reason: Some(reason.into()),
            fetched: false,
        }
    }

    pub fn key(&self) -> String {
        resolution_key(&self.repo, &self.name)
    }

    /// Version of the located chart
    pub fn version(&self) -> Option<&str> {
        self.chartfile.as_ref().map(|c| c.version.as_str())
    }

    /// Record a failed check; an earlier failure keeps its reason
    fn mark_unsatisfied(&mut self, reason: String) {
        if self.satisfies {
            self.satisfies = false;
            self.reason = Some(reason);
        }
    }
}

/// All dependencies discovered by one resolve pass, in discovery order
#[derive(Debug, Clone, Default)]
pub struct Resolutions {
    entries: IndexMap<String, Resolution>,
}

impl Resolutions {
    pub fn get(&self, key: &str) -> Option<&Resolution> {
        self.entries.get(key)
    }

    /// First resolution for a chart name, from any repository
    pub fn get_by_name(&self, name: &str) -> Option<&Resolution> {
        self.entries.values().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resolution> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Satisfied, but only present in a repository cache
    pub fn to_fetch(&self) -> impl Iterator<Item = &Resolution> {
        self.iter().filter(|r| r.found && r.satisfies && !r.fetched)
    }

    /// Satisfied by a chart already in the workspace
    pub fn satisfied(&self) -> impl Iterator<Item = &Resolution> {
        self.iter().filter(|r| r.found && r.satisfies && r.fetched)
    }

    /// Located, but out of range
    pub fn unsatisfied(&self) -> impl Iterator<Item = &Resolution> {
        self.iter().filter(|r| r.found && !r.satisfies)
    }

    /// Not located anywhere
    pub fn missing(&self) -> impl Iterator<Item = &Resolution> {
        self.iter().filter(|r| !r.found)
    }

    /// Whether every dependency is located and in range
    pub fn is_complete(&self) -> bool {
        self.iter().all(|r| r.found && r.satisfies)
    }
}

impl IntoIterator for Resolutions {
    type Item = Resolution;
    type IntoIter = indexmap::map::IntoValues<String, Resolution>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

/// State of one resolve pass
#[derive(Default)]
struct Context {
    entries: IndexMap<String, Resolution>,
    workspace: Option<Vec<(PathBuf, Chartfile)>>,
}

/// Resolves dependency graphs against a charter home
pub struct Resolver<'a> {
    home: &'a Home,
    table: &'a RepositoryTable,

    /// Canonical repository → alias
    aliases: HashMap<String, String>,
}

impl<'a> Resolver<'a> {
    /// Build a resolver; every configured repository URL must canonicalize
    pub fn new(home: &'a Home, table: &'a RepositoryTable) -> Result<Self> {
        let mut aliases = HashMap::new();
        for repo in &table.repositories {
            aliases.insert(repo.canonical()?, repo.name.clone());
        }

        Ok(Self {
            home,
            table,
            aliases,
        })
    }

    /// Resolve every transitive dependency of `root`
    ///
    /// `repo` is the alias or URL `root` originates from; empty means the
    /// configured default repository.
    pub fn resolve(&self, root: &Chartfile, repo: &str) -> Result<Resolutions> {
        let parent = if repo.trim().is_empty() {
            None
        } else {
            Some(self.table.resolve_url(repo).to_string())
        };
        let origin = self.origin_of(root, parent.as_deref());

        let root_name = root
            .from
            .as_ref()
            .map(|f| f.name.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(&root.name);
        let origin = origin.as_deref().map(canonicalize).transpose()?.unwrap_or_default();
        let self_key = resolution_key(&origin, root_name);

        let mut ctx = Context::default();
        ctx.entries.insert(
            self_key.clone(),
            Resolution {
                name: root_name.to_string(),
                repo: origin,
                constraint: String::new(),
                chartfile: Some(root.clone()),
                path: None,
                found: true,
                satisfies: true,
                reason: None,
                fetched: root.is_fetched(),
            },
        );

        self.visit(&mut ctx, root, parent.as_deref())?;

        ctx.entries.shift_remove(&self_key);
        tracing::debug!(chart = %root.name, dependencies = ctx.entries.len(), "resolved dependencies");

        Ok(Resolutions {
            entries: ctx.entries,
        })
    }

    /// Load `alias/chart` from its repository cache and resolve it
    pub fn resolve_qualified(&self, qualified: &str) -> Result<(Chartfile, Resolutions)> {
        let (alias, chart) = self.table.split_qualified(qualified);
        if self.table.get(alias).is_none() {
            return Err(RepoError::RepositoryNotFound {
                name: alias.to_string(),
            });
        }

        let root = match Chartfile::load_dir(self.home.cached_chart(alias, chart)) {
            Ok(cf) => cf,
            Err(e) if e.is_not_found() => {
                return Err(RepoError::ChartNotFound {
                    name: chart.to_string(),
                    repo: alias.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let resolutions = self.resolve(&root, alias)?;
        Ok((root, resolutions))
    }

    /// Repository a chart's unscoped dependencies come from
    ///
    /// `None` when nothing names one and the default alias is not configured.
    fn origin_of(&self, chart: &Chartfile, parent: Option<&str>) -> Option<String> {
        if let Some(own) = chart.origin_repo() {
            return Some(self.table.resolve_url(own).to_string());
        }
        if let Some(parent) = parent {
            return Some(parent.to_string());
        }
        self.table
            .default_repository()
            .ok()
            .map(|repo| repo.url.clone())
    }

    fn visit(&self, ctx: &mut Context, chart: &Chartfile, parent: Option<&str>) -> Result<()> {
        let origin = self.origin_of(chart, parent);

        for dep in &chart.dependencies {
            let repo_url = if !dep.is_repo_wildcard() {
                self.table.resolve_url(&dep.repo)
            } else if let Some(origin) = origin.as_deref() {
                origin
            } else {
                tracing::warn!(dependency = %dep.name, default = %self.table.default, "no repository to inherit");
                ctx.entries
                    .entry(resolution_key("", &dep.name))
                    .or_insert_with(|| {
                        Resolution::missing(
                            &dep.name,
                            "",
                            &dep.version,
                            "default repository is not configured",
                        )
                    });
                continue;
            };

            let repo = match canonicalize(repo_url) {
                Ok(repo) => repo,
                Err(e) => {
                    tracing::warn!(dependency = %dep.name, repo = repo_url, "unusable repository: {}", e);
                    let key = resolution_key(repo_url, &dep.name);
                    ctx.entries.entry(key).or_insert_with(|| {
                        Resolution::missing(&dep.name, repo_url, &dep.version, e.to_string())
                    });
                    continue;
                }
            };

            let key = resolution_key(&repo, &dep.name);
            if let Some(existing) = ctx.entries.get_mut(&key) {
                if let Some(candidate) = &existing.chartfile
                    && let Err(mismatch) = version_matches(candidate, &dep.version)
                {
                    existing.mark_unsatisfied(mismatch.to_string());
                }
                continue;
            }

            let mut resolution = self.locate(ctx, dep, &repo)?;
            if let Some(candidate) = &resolution.chartfile
                && let Err(mismatch) = version_matches(candidate, &dep.version)
            {
                resolution.mark_unsatisfied(mismatch.to_string());
            }

            tracing::debug!(
                dependency = %dep.name,
                repo = %repo,
                found = resolution.found,
                satisfies = resolution.satisfies,
                fetched = resolution.fetched,
                "resolved"
            );

            let next = resolution.chartfile.clone();
            ctx.entries.insert(key, resolution);

            if let Some(next) = next {
                self.visit(ctx, &next, origin.as_deref())?;
            }
        }

        Ok(())
    }

    /// Find a dependency in the workspace, then in its repository cache
    fn locate(&self, ctx: &mut Context, dep: &Dependency, repo: &str) -> Result<Resolution> {
        if ctx.workspace.is_none() {
            ctx.workspace = Some(load_charts(&self.home.workspace_charts())?);
        }
        let workspace = ctx.workspace.as_deref().unwrap_or_default();

        let fetched = workspace.iter().find(|(_, cf)| {
            cf.from.as_ref().is_some_and(|from| {
                from.name == dep.name && canonicalize(&from.repo).is_ok_and(|r| r == repo)
            })
        });

        if let Some((path, cf)) = fetched {
            return Ok(Resolution {
                name: dep.name.clone(),
                repo: repo.to_string(),
                constraint: dep.version.clone(),
                chartfile: Some(cf.clone()),
                path: Some(path.clone()),
                found: true,
                satisfies: true,
                reason: None,
                fetched: true,
            });
        }

        let Some(alias) = self.aliases.get(repo) else {
            return Ok(Resolution::missing(
                &dep.name,
                repo,
                &dep.version,
                "repository is not configured",
            ));
        };

        let dir = self.home.cached_chart(alias, &dep.name);
        match Chartfile::load_dir(&dir) {
            Ok(cf) => Ok(Resolution {
                name: dep.name.clone(),
                repo: repo.to_string(),
                constraint: dep.version.clone(),
                chartfile: Some(cf),
                path: Some(dir),
                found: true,
                satisfies: true,
                reason: None,
                fetched: false,
            }),
            Err(e) if e.is_not_found() => Ok(Resolution::missing(
                &dep.name,
                repo,
                &dep.version,
                format!("not found in workspace or repository '{}'", alias),
            )),
            Err(charter_core::CoreError::Io(e)) => Err(RepoError::Workspace { path: dir, source: e }),
            Err(e) => {
                tracing::warn!(chart = %dir.display(), "unreadable Chart.yaml: {}", e);
                Ok(Resolution::missing(&dep.name, repo, &dep.version, e.to_string()))
            }
        }
    }
}

/// Load the Chartfile of every chart directory directly under `dir`
///
/// A missing directory holds no charts. Entries without a readable
/// `Chart.yaml` are skipped.
pub fn load_charts(dir: &Path) -> Result<Vec<(PathBuf, Chartfile)>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(RepoError::Workspace {
                path: dir.to_path_buf(),
                source: e,
            });
        }
    };

    let mut charts = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| RepoError::Workspace {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        match Chartfile::load_dir(&path) {
            Ok(cf) => charts.push((path, cf)),
            Err(e) if e.is_not_found() => {}
            Err(e) => tracing::warn!(chart = %path.display(), "skipping chart: {}", e),
        }
    }

    charts.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(charts)
}

/// Declared dependencies that no chart under `installed_dir` satisfies
///
/// Does no repository lookups and does not recurse.
pub fn missing_dependencies(
    deps: &[Dependency],
    installed_dir: &Path,
    table: &RepositoryTable,
) -> Result<Vec<Dependency>> {
    let installed = load_charts(installed_dir)?;

    Ok(deps
        .iter()
        .filter(|dep| {
            !installed
                .iter()
                .any(|(_, cf)| satisfies(cf, dep, table).is_ok())
        })
        .cloned()
        .collect())
}
