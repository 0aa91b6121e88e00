//! `init`, `add` and `status` commands.

use super::render;
use super::Context;
use crate::config::ConfigFile;
use crate::model::LocalEnvironment;
use crate::source::dotenv::write_env_file;
use crate::source::FileSource;
use anyhow::{bail, Context as _, Result};
use std::path::Path;

/// Normalise a schema name: trimmed, upper-case
fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

pub(super) async fn init(ctx: &Context, from: Option<&Path>, force: bool) -> Result<()> {
    let config_path = ctx.config_path();
    if ConfigFile::exists(config_path) && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let mut config = ConfigFile::new();
    let mut imported = None;
    if let Some(path) = from {
        let source = FileSource::open(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        for name in source.entries().keys() {
            config.add_secret(name.as_str());
        }
        imported = Some(source);
    }

    ctx.save_config(&config).await?;
    println!("Created {}", config_path.display());

    // Seed .env.test from the imported file unless it already exists
    let mut bootstrapped = false;
    if let Some(source) = &imported {
        println!(
            "Imported {} secrets from {}",
            config.secrets.len(),
            source.path().display()
        );
        let test_file = LocalEnvironment::Test.env_file_name();
        let test_path = Path::new(&test_file);
        if source.path() != test_path && !test_path.exists() && !source.entries().is_empty() {
            match write_env_file(test_path, source.entries()).await {
                Ok(()) => bootstrapped = true,
                Err(e) => eprintln!("Warning: could not write {test_file}: {e:#}"),
            }
        }
        if bootstrapped {
            println!(
                "Bootstrapped {test_file} with values from {}",
                source.path().display()
            );
        }
    }

    println!("\nNext steps:");
    if bootstrapped {
        println!("  1. Add targets to {}", config_path.display());
        println!("  2. Run 'envsync status' to check authentication");
        println!("  3. Run 'envsync sync test' to sync to all targets");
    } else {
        println!("  1. Create .env.test and .env.live files with your secrets");
        println!("  2. Add targets to {} and set up authentication", config_path.display());
        println!("  3. Run 'envsync sync test --dry-run' to preview");
        println!("  4. Run 'envsync sync test' to apply");
    }

    Ok(())
}

pub(super) async fn add(ctx: &Context, names: &[String]) -> Result<()> {
    let mut config = if ConfigFile::exists(ctx.config_path()) {
        ctx.load_config().await?
    } else {
        ConfigFile::new()
    };

    let mut added = Vec::new();
    let mut skipped = Vec::new();
    for name in names.iter().map(|n| normalize_name(n)) {
        if name.is_empty() {
            continue;
        }
        if config.add_secret(name.as_str()) {
            added.push(name);
        } else {
            skipped.push(name);
        }
    }

    if !added.is_empty() {
        ctx.save_config(&config).await?;
        println!("Added: {}", added.join(", "));
    }
    if !skipped.is_empty() {
        println!("Already in schema: {}", skipped.join(", "));
    }
    if added.is_empty() && skipped.is_empty() {
        println!("No secrets added.");
    }
    Ok(())
}

pub(super) async fn status(ctx: &Context) -> Result<()> {
    let config = ctx.load_config().await?;

    println!("envsync status\n");

    println!("Secrets: {} in schema", config.secrets.len());
    for name in &config.secrets {
        println!("  {name}");
    }
    println!();

    let targets = config.targets();
    println!("Targets: {} configured", targets.len());

    let engine = ctx.engine();
    for target in &targets {
        let status = engine.check_auth(target);
        let info = target.platform().info();

        let project = target.project();
        let project = if project.is_empty() {
            String::new()
        } else {
            format!(" ({project})")
        };
        let tags = if info.write_only { " (write-only)" } else { "" };

        println!(
            "  {} [{}]{project}: {}{tags}",
            target.name,
            info.display_name,
            render::auth_summary(target, &status)
        );
        for (remote, local) in target.mapping.iter() {
            println!("    {remote} -> {local}");
        }
        if !target.filter.include.is_empty() {
            println!("    include: {}", target.filter.include.join(", "));
        }
        if !target.filter.exclude.is_empty() {
            println!("    exclude: {}", target.filter.exclude.join(", "));
        }
    }
    println!();

    Ok(())
}
