//! Kubernetes integration for Charter
//!
//! This crate drives a chart's manifests into a cluster:
//! - `client`: the [`ClusterClient`] seam, with kubectl and dry-run clients
//! - `order`: fixed install and uninstall kind orders
//! - `actions`: annotate, order and dispatch a loaded chart
//! - `annotations`: annotation keys written at install time

pub mod actions;
pub mod annotations;
pub mod client;
pub mod error;
pub mod order;

pub use actions::{
    DependencyGate, InstallOptions, InstallReport, OperationSummary, UninstallOptions,
    UninstallReport, install, uninstall,
};
pub use client::{ClusterCall, ClusterClient, DEFAULT_KUBECTL, DryRunClient, KubectlClient, Operation};
pub use error::{KubeError, Result};
pub use order::{INSTALL_ORDER, UNINSTALL_ORDER, install_order, uninstall_order};
