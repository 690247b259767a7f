//! Charter CLI - a package manager for Kubernetes manifest charts

use charter_kube::DEFAULT_KUBECTL;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

use commands::Context;
use error::Result;

#[derive(Parser)]
#[command(name = "charter")]
#[command(version)]
#[command(about = "A package manager for Kubernetes manifest charts", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Charter home directory (repository table, workspace, caches)
    #[arg(long, global = true, env = "CHARTER_HOME")]
    home: Option<PathBuf>,

    /// kubectl binary used to reach the cluster
    #[arg(long, global = true, env = "KUBECTL", default_value = DEFAULT_KUBECTL)]
    kubectl: PathBuf,

    /// Path to the kubeconfig file
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    context: Option<String>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a chart's metadata, dependencies and manifests
    Inspect {
        /// Chart directory, or the name of a workspace chart
        chart: String,
    },

    /// Dependency commands
    Dep {
        #[command(subcommand)]
        command: DepCommands,
    },

    /// Install a chart's manifests into the cluster
    Install {
        /// Chart directory, or the name of a workspace chart
        chart: String,

        /// Target namespace
        #[arg(short, long, default_value = "")]
        namespace: String,

        /// Print what would be sent instead of contacting the cluster
        #[arg(long)]
        dry_run: bool,

        /// Install even if dependencies are not satisfied
        #[arg(long)]
        force: bool,
    },

    /// Delete a chart's resources from the cluster
    Uninstall {
        /// Chart directory, or the name of a workspace chart
        chart: String,

        /// Target namespace
        #[arg(short, long, default_value = "")]
        namespace: String,

        /// Print what would be deleted instead of contacting the cluster
        #[arg(long)]
        dry_run: bool,
    },

    /// Repository management
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },

    /// Show information about the cluster
    ClusterInfo,
}

#[derive(Subcommand)]
enum DepCommands {
    /// Resolve the full dependency graph of a chart
    Resolve {
        /// Chart directory, workspace chart name, or `alias/chart` from a repository cache
        chart: String,

        /// Repository unscoped dependencies come from
        #[arg(long)]
        repo: Option<String>,
    },

    /// Check that direct dependencies are installed in the workspace
    Check {
        /// Chart directory, or the name of a workspace chart
        chart: String,
    },
}

#[derive(Subcommand)]
enum RepoCommands {
    /// List configured repositories
    List,

    /// Add a repository
    Add {
        /// Repository alias
        name: String,

        /// Repository URL (git SSH, http(s) or local path)
        url: String,

        /// Make this the default repository
        #[arg(long)]
        default: bool,
    },

    /// Remove a repository
    Remove {
        /// Repository alias
        name: String,
    },
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CHARTER_LOG").unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Context::new(
        cli.home,
        cli.kubectl,
        cli.kubeconfig,
        cli.context,
    )?;

    match cli.command {
        Commands::Inspect { chart } => commands::inspect::run(&ctx, &chart),

        Commands::Dep { command } => match command {
            DepCommands::Resolve { chart, repo } => {
                commands::dep::resolve(&ctx, &chart, repo.as_deref())
            }
            DepCommands::Check { chart } => commands::dep::check(&ctx, &chart),
        },

        Commands::Install {
            chart,
            namespace,
            dry_run,
            force,
        } => commands::install::run(&ctx, &chart, &namespace, dry_run, force),

        Commands::Uninstall {
            chart,
            namespace,
            dry_run,
        } => commands::uninstall::run(&ctx, &chart, &namespace, dry_run),

        Commands::Repo { command } => match command {
            RepoCommands::List => commands::repo::list(&ctx),
            RepoCommands::Add { name, url, default } => {
                commands::repo::add(&ctx, &name, &url, default)
            }
            RepoCommands::Remove { name } => commands::repo::remove(&ctx, &name),
        },

        Commands::ClusterInfo => commands::cluster_info::run(&ctx),
    }
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_logging(cli.debug);

    let code = match run(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}
