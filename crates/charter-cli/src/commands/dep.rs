//! Dependency commands

use charter_core::Chartfile;
use charter_repo::{Resolution, Resolver, missing_dependencies};
use console::style;

use super::Context;
use crate::error::{CliError, Result};

fn describe(resolution: &Resolution) -> String {
    let version = resolution.version().unwrap_or("?");
    if resolution.constraint.is_empty() {
        format!("{} {} ({})", resolution.name, version, resolution.repo)
    } else {
        format!(
            "{} {} [{}] ({})",
            resolution.name, version, resolution.constraint, resolution.repo
        )
    }
}

/// Resolve and print the full dependency graph of a chart
pub fn resolve(ctx: &Context, chart: &str, repo: Option<&str>) -> Result<()> {
    let table = ctx.home.repositories()?;
    let resolver = Resolver::new(&ctx.home, &table)?;

    let dir = ctx.chart_dir(chart);
    let (root, resolutions) = if dir.is_dir() || !chart.contains('/') {
        let root = Chartfile::load_dir(&dir)?;
        let resolutions = resolver.resolve(&root, repo.unwrap_or_default())?;
        (root, resolutions)
    } else {
        resolver.resolve_qualified(chart)?
    };

    println!(
        "{} Dependencies of {} v{}",
        style("→").blue().bold(),
        root.name,
        root.version
    );

    if resolutions.is_empty() {
        println!("  (none)");
        return Ok(());
    }

    for r in resolutions.satisfied() {
        println!("  {} {}", style("✓").green().bold(), describe(r));
    }
    for r in resolutions.to_fetch() {
        println!(
            "  {} {} {}",
            style("↓").cyan().bold(),
            describe(r),
            style("needs fetching").dim()
        );
    }
    for r in resolutions.unsatisfied() {
        println!(
            "  {} {}: {}",
            style("✗").red().bold(),
            describe(r),
            r.reason.as_deref().unwrap_or("unsatisfied")
        );
    }
    for r in resolutions.missing() {
        println!(
            "  {} {} [{}] ({}): {}",
            style("?").yellow().bold(),
            r.name,
            r.constraint,
            r.repo,
            r.reason.as_deref().unwrap_or("not found")
        );
    }

    if resolutions.is_complete() {
        Ok(())
    } else {
        let broken = resolutions.unsatisfied().count() + resolutions.missing().count();
        Err(CliError::dependency_with_help(
            format!("{} of {} dependencies cannot be satisfied", broken, resolutions.len()),
            "Add the repositories they come from, or adjust the version constraints",
        ))
    }
}

/// Check that a chart's direct dependencies are present in the workspace
pub fn check(ctx: &Context, chart: &str) -> Result<()> {
    let table = ctx.home.repositories()?;
    let root = Chartfile::load_dir(ctx.chart_dir(chart))?;

    let missing = missing_dependencies(&root.dependencies, &ctx.home.workspace_charts(), &table)?;
    if missing.is_empty() {
        println!(
            "{} All {} dependencies of {} are installed",
            style("✓").green().bold(),
            root.dependencies.len(),
            root.name
        );
        return Ok(());
    }

    for dep in &missing {
        println!("  {} {}", style("✗").red().bold(), dep);
    }
    Err(CliError::dependency_with_help(
        format!(
            "{} is missing {}",
            root.name,
            missing
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        "Fetch the missing charts into the workspace",
    ))
}
