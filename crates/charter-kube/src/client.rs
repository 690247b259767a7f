//! Cluster clients
//!
//! The install/uninstall pipeline talks to a cluster only through
//! [`ClusterClient`]. [`KubectlClient`] shells out to `kubectl`;
//! [`DryRunClient`] records calls without touching a cluster.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Mutex, PoisonError};

use charter_core::{Document, Encoding};

use crate::error::{KubeError, Result};

/// The operations the pipeline needs from a cluster
///
/// `namespace` may be empty, in which case the client's default applies.
pub trait ClusterClient {
    /// Create the resources in `payload` (a YAML document)
    fn create(&self, payload: &[u8], namespace: &str) -> Result<String>;

    /// Create or update the resources in `payload`
    fn apply(&self, payload: &[u8], namespace: &str) -> Result<String>;

    /// Delete one named resource
    fn delete(&self, name: &str, kind: &str, namespace: &str) -> Result<String>;

    /// Describe the cluster the client is connected to
    fn cluster_info(&self) -> Result<String>;
}

/// Default kubectl binary
pub const DEFAULT_KUBECTL: &str = "kubectl";

/// Runs `kubectl` as a subprocess, feeding payloads on stdin
#[derive(Debug, Clone)]
pub struct KubectlClient {
    binary: PathBuf,
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
}

impl Default for KubectlClient {
    fn default() -> Self {
        Self::new(DEFAULT_KUBECTL)
    }
}

impl KubectlClient {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            kubeconfig: None,
            context: None,
        }
    }

    pub fn with_kubeconfig(mut self, kubeconfig: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(kubeconfig.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Full argument list for one invocation, global flags first
    fn args(&self, args: &[&str], namespace: &str) -> Vec<String> {
        let mut all = Vec::new();
        if let Some(kubeconfig) = &self.kubeconfig {
            all.push(format!("--kubeconfig={}", kubeconfig.display()));
        }
        if let Some(context) = &self.context {
            all.push(format!("--context={}", context));
        }
        all.extend(args.iter().map(|a| a.to_string()));
        if !namespace.is_empty() {
            all.push(format!("--namespace={}", namespace));
        }
        all
    }

    fn run(&self, args: Vec<String>, stdin: Option<&[u8]>) -> Result<String> {
        let command_line = format!("{} {}", self.binary.display(), args.join(" "));
        tracing::debug!(command = %command_line, "running kubectl");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| KubeError::Client {
                command: command_line.clone(),
                message: e.to_string(),
            })?;

        // The pipe is dropped, closing stdin, before waiting
        let written = match (stdin, child.stdin.take()) {
            (Some(payload), Some(mut pipe)) => pipe.write_all(payload),
            _ => Ok(()),
        };

        let output = child.wait_with_output()?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        match written {
            Err(e) => Err(KubeError::Client {
                command: command_line,
                message: failure_message(&stderr, &e.to_string()),
            }),
            Ok(()) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
            }
            Ok(()) => Err(KubeError::Client {
                command: command_line,
                message: failure_message(&stderr, &output.status.to_string()),
            }),
        }
    }
}

/// Prefer what the subprocess reported over our own view of the failure
fn failure_message(stderr: &str, fallback: &str) -> String {
    if stderr.is_empty() {
        fallback.to_string()
    } else {
        stderr.to_string()
    }
}

impl ClusterClient for KubectlClient {
    fn create(&self, payload: &[u8], namespace: &str) -> Result<String> {
        self.run(self.args(&["create", "-f", "-"], namespace), Some(payload))
    }

    fn apply(&self, payload: &[u8], namespace: &str) -> Result<String> {
        self.run(self.args(&["apply", "-f", "-"], namespace), Some(payload))
    }

    fn delete(&self, name: &str, kind: &str, namespace: &str) -> Result<String> {
        self.run(self.args(&["delete", kind, name], namespace), None)
    }

    fn cluster_info(&self) -> Result<String> {
        self.run(self.args(&["cluster-info"], ""), None)
    }
}

/// Kind of call made against a cluster client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Apply,
    Delete,
    ClusterInfo,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operation::Create => "create",
            Operation::Apply => "apply",
            Operation::Delete => "delete",
            Operation::ClusterInfo => "cluster-info",
        })
    }
}

/// One recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterCall {
    pub operation: Operation,
    /// `Kind/name`, empty for cluster-info
    pub target: String,
    pub namespace: String,
    /// YAML sent with create/apply
    pub payload: Option<String>,
}

impl std::fmt::Display for ClusterCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.operation)?;
        if !self.target.is_empty() {
            write!(f, " {}", self.target)?;
        }
        if !self.namespace.is_empty() {
            write!(f, " (namespace {})", self.namespace)?;
        }
        Ok(())
    }
}

/// Records every call instead of talking to a cluster
///
/// Individual calls can be made to fail with [`DryRunClient::fail_on`].
#[derive(Debug, Default)]
pub struct DryRunClient {
    calls: Mutex<Vec<ClusterCall>>,
    failures: Vec<(Operation, String)>,
}

impl DryRunClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `operation` on `target` (`Kind/name`)
    pub fn fail_on(mut self, operation: Operation, target: impl Into<String>) -> Self {
        self.failures.push((operation, target.into()));
        self
    }

    /// Calls recorded so far, in order
    pub fn calls(&self) -> Vec<ClusterCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Targets of the recorded calls, in order
    pub fn targets(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.target).collect()
    }

    fn record(&self, call: ClusterCall) -> Result<String> {
        let description = call.to_string();
        let fails = self
            .failures
            .iter()
            .any(|(op, target)| *op == call.operation && *target == call.target);
        let operation = call.operation;
        let target = call.target.clone();

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);

        if fails {
            return Err(KubeError::Client {
                command: format!("{} {}", operation, target),
                message: "injected failure".to_string(),
            });
        }
        Ok(format!("[dry-run] {}", description))
    }

    fn record_payload(&self, operation: Operation, payload: &[u8], namespace: &str) -> Result<String> {
        let document = Document::new(payload, Encoding::Yaml)?;
        self.record(ClusterCall {
            operation,
            target: document.reference().to_string(),
            namespace: namespace.to_string(),
            payload: Some(String::from_utf8_lossy(payload).into_owned()),
        })
    }
}

impl ClusterClient for DryRunClient {
    fn create(&self, payload: &[u8], namespace: &str) -> Result<String> {
        self.record_payload(Operation::Create, payload, namespace)
    }

    fn apply(&self, payload: &[u8], namespace: &str) -> Result<String> {
        self.record_payload(Operation::Apply, payload, namespace)
    }

    fn delete(&self, name: &str, kind: &str, namespace: &str) -> Result<String> {
        self.record(ClusterCall {
            operation: Operation::Delete,
            target: format!("{}/{}", kind, name),
            namespace: namespace.to_string(),
            payload: None,
        })
    }

    fn cluster_info(&self) -> Result<String> {
        self.record(ClusterCall {
            operation: Operation::ClusterInfo,
            target: String::new(),
            namespace: String::new(),
            payload: None,
        })
    }
}
