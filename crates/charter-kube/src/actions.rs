//! Install and uninstall of a loaded chart
//!
//! Install annotates each manifest, dispatches it in [`INSTALL_ORDER`] and
//! stops at the first failure. Uninstall deletes in [`UNINSTALL_ORDER`] and
//! keeps going when a delete fails.
//!
//! [`INSTALL_ORDER`]: crate::order::INSTALL_ORDER
//! [`UNINSTALL_ORDER`]: crate::order::UNINSTALL_ORDER

use charter_core::{Chart, Dependency, Manifest};
use charter_repo::{Home, RepositoryTable, missing_dependencies};
use std::path::PathBuf;

use crate::annotations::{self, KEEP};
use crate::client::ClusterClient;
use crate::error::{KubeError, Result};
use crate::order::{install_order, uninstall_order};

/// Options for install
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Namespace for resources that do not declare one
    pub namespace: String,

    /// Install even when dependencies are not satisfied
    pub force: bool,
}

/// Options for uninstall
#[derive(Debug, Clone, Default)]
pub struct UninstallOptions {
    /// Namespace for resources that do not declare one
    pub namespace: String,
}

/// Summary of dispatched resources
#[derive(Debug, Clone, Default)]
pub struct OperationSummary {
    /// Successfully processed resources
    pub succeeded: Vec<String>,
    /// Failed resources with errors
    pub failed: Vec<(String, String)>,
    /// Client output, one entry per successful call
    pub outputs: Vec<String>,
}

impl OperationSummary {
    /// Check if all operations succeeded
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Get total count
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Format as human-readable summary
    pub fn summary(&self) -> String {
        let mut parts = Vec::with_capacity(2);
        if !self.succeeded.is_empty() {
            parts.push(format!("{} succeeded", self.succeeded.len()));
        }
        if !self.failed.is_empty() {
            parts.push(format!("{} failed", self.failed.len()));
        }
        if parts.is_empty() {
            "No resources processed".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Result of an install
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub summary: OperationSummary,

    /// Resources sent with `apply` because they carry the keep marker
    pub applied: Vec<String>,

    /// Dependencies that were not satisfied but ignored under `force`
    pub unsatisfied: Vec<Dependency>,
}

/// Result of an uninstall
pub type UninstallReport = OperationSummary;

/// Pre-install check that a chart's direct dependencies are installed
#[derive(Debug, Clone)]
pub struct DependencyGate<'a> {
    installed: PathBuf,
    table: &'a RepositoryTable,
}

impl<'a> DependencyGate<'a> {
    /// Check against the workspace charts of `home`
    pub fn new(home: &Home, table: &'a RepositoryTable) -> Self {
        Self {
            installed: home.workspace_charts(),
            table,
        }
    }

    /// Check against an arbitrary directory of installed charts
    pub fn with_installed_dir(installed: impl Into<PathBuf>, table: &'a RepositoryTable) -> Self {
        Self {
            installed: installed.into(),
            table,
        }
    }

    /// Unsatisfied dependencies; an error unless `force` is set
    pub fn check(&self, chart: &Chart, force: bool) -> Result<Vec<Dependency>> {
        let missing =
            missing_dependencies(&chart.chartfile.dependencies, &self.installed, self.table)?;
        if missing.is_empty() {
            return Ok(missing);
        }

        if !force {
            return Err(KubeError::UnsatisfiedDependencies {
                chart: chart.name().to_string(),
                dependencies: missing
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        for dep in &missing {
            tracing::warn!(chart = chart.name(), dependency = %dep, "installing with unsatisfied dependency");
        }
        Ok(missing)
    }
}

/// Namespace a manifest is dispatched to
fn target_namespace<'a>(manifest: &'a Manifest, default: &'a str) -> &'a str {
    manifest
        .reference()
        .namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .unwrap_or(default)
}

/// Install every manifest of `chart`, stopping at the first failure
pub fn install(
    client: &dyn ClusterClient,
    chart: &Chart,
    options: &InstallOptions,
    gate: Option<&DependencyGate<'_>>,
) -> Result<InstallReport> {
    let mut report = InstallReport::default();
    if let Some(gate) = gate {
        report.unsatisfied = gate.check(chart, options.force)?;
    }

    for manifest in install_order(&chart.manifests) {
        let target = manifest.reference().to_string();
        let extra = annotations::install_annotations(&chart.chartfile, &manifest.source_name());
        let annotated = manifest.with_annotations(&extra)?;
        let payload = annotated.document().to_yaml_string()?;
        let namespace = target_namespace(manifest, &options.namespace);

        let keep = annotated
            .annotation(KEEP)?
            .is_some_and(|v| annotations::is_keep(&v));
        let (operation, result) = if keep {
            ("apply", client.apply(payload.as_bytes(), namespace))
        } else {
            ("create", client.create(payload.as_bytes(), namespace))
        };

        match result {
            Ok(output) => {
                tracing::debug!(resource = %target, operation, "dispatched");
                if keep {
                    report.applied.push(target.clone());
                }
                report.summary.succeeded.push(target);
                report.summary.outputs.push(output);
            }
            Err(e) => {
                return Err(KubeError::Dispatch {
                    operation,
                    target,
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

/// Delete every manifest of `chart`; failures are logged and skipped
pub fn uninstall(
    client: &dyn ClusterClient,
    chart: &Chart,
    options: &UninstallOptions,
) -> UninstallReport {
    let mut summary = OperationSummary::default();

    for manifest in uninstall_order(&chart.manifests) {
        let target = manifest.reference().to_string();
        if manifest.name().is_empty() {
            tracing::warn!(file = %manifest.source_name(), kind = manifest.kind(), "resource has no name, not deleting");
            summary.failed.push((target, "missing metadata.name".to_string()));
            continue;
        }

        let namespace = target_namespace(manifest, &options.namespace);
        match client.delete(manifest.name(), manifest.kind(), namespace) {
            Ok(output) => {
                tracing::debug!(resource = %target, "deleted");
                summary.succeeded.push(target);
                summary.outputs.push(output);
            }
            Err(e) => {
                tracing::warn!(resource = %target, error = %e, "failed to delete");
                summary.failed.push((target, e.to_string()));
            }
        }
    }

    summary
}
