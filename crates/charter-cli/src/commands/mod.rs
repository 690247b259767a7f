//! Subcommand implementations

pub mod cluster_info;
pub mod dep;
pub mod inspect;
pub mod install;
pub mod repo;
pub mod uninstall;

use charter_kube::KubectlClient;
use charter_repo::Home;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// State shared by every subcommand
pub struct Context {
    pub home: Home,
    pub kubectl: KubectlClient,
}

impl Context {
    pub fn new(
        home: Option<PathBuf>,
        kubectl: PathBuf,
        kubeconfig: Option<PathBuf>,
        context: Option<String>,
    ) -> Result<Self> {
        let root = match home {
            Some(root) => root,
            None => Home::default_root()?,
        };
        tracing::debug!(home = %root.display(), "using charter home");

        let mut client = KubectlClient::new(kubectl);
        if let Some(kubeconfig) = kubeconfig {
            client = client.with_kubeconfig(kubeconfig);
        }
        if let Some(context) = context {
            client = client.with_context(context);
        }

        Ok(Self {
            home: Home::new(root),
            kubectl: client,
        })
    }

    /// An existing directory is used as-is, anything else names a workspace chart
    pub fn chart_dir(&self, chart: &str) -> PathBuf {
        let path = Path::new(chart);
        if path.is_dir() {
            path.to_path_buf()
        } else {
            self.home.workspace_charts().join(chart)
        }
    }
}
