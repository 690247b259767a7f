//! Inspect command - show what a chart contains

use charter_core::{Chart, DecodePolicy, KindRegistry};
use console::style;

use super::Context;
use crate::error::Result;

pub fn run(ctx: &Context, chart: &str) -> Result<()> {
    let dir = ctx.chart_dir(chart);
    let chart = Chart::load_with(&dir, &KindRegistry::standard(), DecodePolicy::SkipInvalid)?;
    let cf = &chart.chartfile;

    println!(
        "{} {} v{}",
        style("Chart").cyan().bold(),
        cf.name,
        cf.version
    );
    if !cf.description.is_empty() {
        println!("  {}", cf.description);
    }
    println!();

    if !cf.home.is_empty() {
        println!("  {}: {}", style("Home").dim(), cf.home);
    }
    for source in &cf.source {
        println!("  {}: {}", style("Source").dim(), source);
    }
    for maintainer in &cf.maintainers {
        println!("  {}: {}", style("Maintainer").dim(), maintainer);
    }
    if let Some(from) = &cf.from {
        println!(
            "  {}: {} {} ({})",
            style("Fetched from").dim(),
            from.name,
            from.version,
            from.repo
        );
    }
    println!("  {}: {}", style("Path").dim(), chart.root.display());
    println!();

    if !cf.dependencies.is_empty() {
        println!("{}:", style("Dependencies").bold());
        for dep in &cf.dependencies {
            println!("  {}", dep);
        }
        println!();
    }

    println!(
        "{} ({}):",
        style("Manifests").bold(),
        chart.manifests.len()
    );
    let kinds = chart.kinds();
    let width = kinds.keys().map(String::len).max().unwrap_or(0);
    for (kind, count) in &kinds {
        println!("  {:<width$}  {}", kind, count, width = width);
    }

    if !chart.warnings.is_empty() {
        println!();
        println!("{}:", style("Warnings").yellow().bold());
        for warning in &chart.warnings {
            println!("  {} {}", style("⚠").yellow(), warning);
        }
    }

    Ok(())
}
