//! `pull` command.

use super::Context;
use crate::source::dotenv::{format_line, write_env_file};
use anyhow::{anyhow, bail, Context as _, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Keep only schema names; an empty schema keeps everything
fn restrict_to_schema(
    values: BTreeMap<String, String>,
    schema: &[String],
) -> (BTreeMap<String, String>, usize) {
    if schema.is_empty() {
        return (values, 0);
    }
    let total = values.len();
    let kept: BTreeMap<String, String> = values
        .into_iter()
        .filter(|(name, _)| schema.contains(name))
        .collect();
    let dropped = total - kept.len();
    (kept, dropped)
}

pub(super) async fn pull(
    ctx: &Context,
    target_name: &str,
    remote_env: &str,
    output: Option<&Path>,
    write_local: bool,
) -> Result<()> {
    let mut config = ctx.load_config().await?;
    let target = config.target(target_name)?;
    let platform = target.platform();

    let destination: Option<PathBuf> = if write_local {
        let local = target.mapping.map_to_local(remote_env).ok_or_else(|| {
            anyhow!(
                "no local environment mapped to '{remote_env}' for target '{target_name}'; \
                 add it to the target mapping or use --output"
            )
        })?;
        Some(PathBuf::from(local.env_file_name()))
    } else {
        output.map(Path::to_path_buf)
    };

    if platform.is_write_only() {
        bail!(
            "cannot pull from {target_name}: {} is a write-only platform (secret values cannot be read back)\n\n  \
             Use 'envsync sync' to push secrets to {target_name} instead",
            platform.info().display_name
        );
    }

    let engine = ctx.engine();
    let status = engine.check_auth(&target);
    if !status.authenticated {
        bail!(
            "not authenticated for {target_name}: {}",
            status.error.unwrap_or_default()
        );
    }

    eprintln!("Pulling from {target_name}/{remote_env}...");

    let values = engine.pull(&target, remote_env).await?;

    if values.is_empty() {
        eprintln!("No secrets found.");
        return Ok(());
    }

    let schema_was_empty = config.secrets.is_empty();
    let (values, dropped) = restrict_to_schema(values, &config.secrets);
    if dropped > 0 {
        eprintln!("Note: {dropped} secrets on remote not in your schema");
    }
    eprintln!("Found {} secrets", values.len());

    match &destination {
        Some(path) => {
            write_env_file(path, &values)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Written to {}", path.display());
        }
        None => {
            for (name, value) in &values {
                println!("{}", format_line(name, value));
            }
        }
    }

    if schema_was_empty {
        for name in values.keys() {
            config.add_secret(name.as_str());
        }
        match ctx.save_config(&config).await {
            Ok(()) => eprintln!("Added {} new secrets to schema", values.len()),
            Err(e) => eprintln!("Warning: could not update config: {e:#}"),
        }
    }

    Ok(())
}
