//! Uninstall command - best-effort removal of a chart's resources

use charter_core::Chart;
use charter_kube::{DryRunClient, UninstallOptions, UninstallReport, uninstall};
use console::style;

use super::Context;
use crate::error::Result;

pub fn run(ctx: &Context, chart: &str, namespace: &str, dry_run: bool) -> Result<()> {
    let chart = Chart::load(ctx.chart_dir(chart))?;
    let options = UninstallOptions {
        namespace: namespace.to_string(),
    };

    println!(
        "{} Uninstalling {} v{}",
        style("→").blue().bold(),
        chart.name(),
        chart.version()
    );

    let report = if dry_run {
        uninstall(&DryRunClient::new(), &chart, &options)
    } else {
        uninstall(&ctx.kubectl, &chart, &options)
    };

    print_report(&report);
    Ok(())
}

fn print_report(report: &UninstallReport) {
    for output in &report.outputs {
        println!("  {}", output);
    }
    for (target, error) in &report.failed {
        println!("  {} {}: {}", style("⚠").yellow(), target, error);
    }

    let symbol = if report.is_success() {
        style("✓").green().bold()
    } else {
        style("⚠").yellow().bold()
    };
    println!("{} {} resources: {}", symbol, report.total(), report.summary());
}
