//! Repository management commands

use charter_repo::{Repository, canonicalize};
use console::style;

use super::Context;
use crate::error::{CliError, Result};

/// List configured repositories
pub fn list(ctx: &Context) -> Result<()> {
    let table = ctx.home.repositories()?;

    if table.repositories.is_empty() {
        println!("No repositories configured.");
        println!();
        println!("Add one with: charter repo add <name> <url>");
        return Ok(());
    }

    let width = table.names().iter().map(|n| n.len()).max().unwrap_or(0);
    for repo in &table.repositories {
        let marker = if repo.name == table.default { "*" } else { " " };
        println!(
            "{} {:<width$}  {}",
            marker,
            repo.name,
            repo.url,
            width = width
        );
    }

    Ok(())
}

/// Add a repository
pub fn add(ctx: &Context, name: &str, url: &str, make_default: bool) -> Result<()> {
    let mut table = ctx.home.repositories()?;

    let canonical = canonicalize(url)?;
    if let Some(existing) = table.alias_for(&canonical) {
        return Err(CliError::repository(format!(
            "{} is already configured as '{}'",
            url, existing.name
        )));
    }

    table.add(Repository::new(name, url))?;
    if make_default {
        table.default = name.to_string();
    }
    table.save_to(&ctx.home.config_file())?;

    println!(
        "{} \"{}\" has been added to your repositories ({})",
        style("✓").green().bold(),
        name,
        canonical
    );
    Ok(())
}

/// Remove a repository
pub fn remove(ctx: &Context, name: &str) -> Result<()> {
    let mut table = ctx.home.repositories()?;

    if table.default == name {
        return Err(CliError::Repository {
            message: format!("'{}' is the default repository", name),
            help: Some("Make another repository the default first (repo add --default)".to_string()),
        });
    }

    table.remove(name)?;
    table.save_to(&ctx.home.config_file())?;

    println!(
        "{} \"{}\" has been removed from your repositories",
        style("✓").green().bold(),
        name
    );
    Ok(())
}
