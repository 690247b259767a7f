//! Install command

use charter_core::{Chart, Document, Encoding, encode_yaml_stream};
use charter_kube::{DependencyGate, DryRunClient, InstallOptions, InstallReport, install};
use console::style;

use super::Context;
use crate::error::Result;

pub fn run(ctx: &Context, chart: &str, namespace: &str, dry_run: bool, force: bool) -> Result<()> {
    let chart = Chart::load(ctx.chart_dir(chart))?;
    for warning in &chart.warnings {
        println!("{} {}", style("⚠").yellow(), warning);
    }

    let table = ctx.home.repositories()?;
    let gate = DependencyGate::new(&ctx.home, &table);
    let options = InstallOptions {
        namespace: namespace.to_string(),
        force,
    };

    println!(
        "{} Installing {} v{}",
        style("→").blue().bold(),
        chart.name(),
        chart.version()
    );

    let report = if dry_run {
        let client = DryRunClient::new();
        let report = install(&client, &chart, &options, Some(&gate))?;

        let documents = client
            .calls()
            .into_iter()
            .filter_map(|call| call.payload)
            .map(|payload| Document::new(payload, Encoding::Yaml))
            .collect::<charter_core::Result<Vec<_>>>()?;
        print!("{}", encode_yaml_stream(&documents)?);
        report
    } else {
        install(&ctx.kubectl, &chart, &options, Some(&gate))?
    };

    print_report(&report, dry_run);
    Ok(())
}

fn print_report(report: &InstallReport, dry_run: bool) {
    for dep in &report.unsatisfied {
        println!(
            "{} Installed without dependency {}",
            style("⚠").yellow(),
            dep
        );
    }

    if !dry_run {
        for output in &report.summary.outputs {
            println!("  {}", output);
        }
    }

    println!(
        "{} {} ({} applied){}",
        style("✓").green().bold(),
        report.summary.summary(),
        report.applied.len(),
        if dry_run { " [dry-run]" } else { "" }
    );
}
