//! `sync` and `set` commands.

use super::render;
use super::Context;
use crate::config::ConfigFile;
use crate::model::{LocalEnvironment, Target};
use crate::source::dotenv::upsert_env_file;
use crate::source::{CombinedSource, EnvSource, FileSource, LocalSource};
use crate::sync::{ContinuationPolicy, SyncRun};
use anyhow::{bail, Context as _, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub(super) struct SyncArgs {
    pub env_or_file: Option<String>,
    pub env: Option<String>,
    pub from: Option<PathBuf>,
    pub no_file: bool,
    pub dry_run: bool,
    pub to: Vec<String>,
    pub strict: bool,
}

fn parse_env(value: &str) -> Result<LocalEnvironment> {
    value.parse().map_err(anyhow::Error::msg)
}

fn looks_like_path(arg: &str) -> bool {
    arg.contains('.') || arg.contains('/') || arg.contains(std::path::MAIN_SEPARATOR)
}

/// Work out the local environment and the source file for `sync`.
///
/// - `test` selects `.env.test` when that file exists
/// - `.env.test` (or any path) is the source file and the environment is
///   inferred from its name
/// - `--env` and `--from` take precedence over inference
/// - `--no-file` stops the `.env.<env>` lookup, so values come from the
///   process environment
pub fn resolve_env_and_file(
    env_or_file: Option<&str>,
    env_flag: Option<&str>,
    from: Option<&Path>,
    no_file: bool,
    exists: impl Fn(&Path) -> bool,
) -> Result<(LocalEnvironment, Option<PathBuf>)> {
    let mut env = env_flag.map(str::to_string);
    let mut file = from.map(Path::to_path_buf);

    if let Some(arg) = env_or_file {
        if looks_like_path(arg) {
            if file.is_none() {
                file = Some(PathBuf::from(arg));
            }
            if env.is_none() {
                env = infer_env_from_filename(arg);
            }
        } else if env.is_none() {
            env = Some(arg.to_string());
        }
    }

    let Some(env) = env else {
        bail!("environment required: envsync sync <test|live> or envsync sync .env.<env>");
    };
    let env = parse_env(&env)?;

    if file.is_none() && !no_file {
        let candidate = PathBuf::from(env.env_file_name());
        if exists(&candidate) {
            file = Some(candidate);
        }
    }

    Ok((env, file))
}

/// Environment name from an env file name: `.env.test`, `test.env`, `env.test`
#[must_use]
pub fn infer_env_from_filename(filename: &str) -> Option<String> {
    let path = Path::new(filename);
    let base = path.file_name()?.to_str()?;

    if let Some(env) = base.strip_prefix(".env.") {
        return Some(env.to_string()).filter(|e| !e.is_empty());
    }

    let stem = path.file_stem()?.to_str()?;
    let extension = path.extension().and_then(|e| e.to_str());
    let inferred = if extension == Some("env") {
        stem
    } else if let Some(rest) = stem.strip_prefix("env.") {
        rest
    } else {
        extension.unwrap_or_default()
    };
    Some(inferred.to_string()).filter(|e| !e.is_empty())
}

/// Parse `NAME=VALUE` arguments. Names and values are trimmed; later
/// duplicates win.
pub fn parse_assignments(args: &[String]) -> Result<BTreeMap<String, String>> {
    let mut values = BTreeMap::new();
    for arg in args {
        let Some((name, value)) = arg.split_once('=') else {
            bail!("invalid format {arg:?}: expected NAME=VALUE");
        };
        let name = name.trim();
        if name.is_empty() {
            bail!("invalid format {arg:?}: name cannot be empty");
        }
        values.insert(name.to_string(), value.trim().to_string());
    }
    Ok(values)
}

fn select_targets(config: &ConfigFile, names: &[String]) -> Result<Vec<Target>> {
    if names.is_empty() {
        return Ok(config.targets());
    }
    names
        .iter()
        .map(|name| config.target(name.trim()).map_err(anyhow::Error::from))
        .collect()
}

pub(super) async fn sync(ctx: &Context, args: &SyncArgs) -> Result<()> {
    let (env, file) = resolve_env_and_file(
        args.env_or_file.as_deref(),
        args.env.as_deref(),
        args.from.as_deref(),
        args.no_file,
        Path::exists,
    )?;
    debug!(environment = %env, file = ?file, "Resolved sync source");

    let config = ctx.load_config().await?;
    let targets = select_targets(&config, &args.to)?;

    let source: Arc<dyn LocalSource> = match &file {
        Some(path) => Arc::new(
            FileSource::open(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => Arc::new(EnvSource::new()),
    };

    let policy = if args.strict {
        ContinuationPolicy::Strict
    } else {
        ContinuationPolicy::Lenient
    };

    let run = SyncRun::new(config.secrets.clone(), source, targets, env)
        .dry_run(args.dry_run)
        .policy(policy);
    run_and_report(ctx, run).await
}

pub(super) async fn set(
    ctx: &Context,
    assignments: &[String],
    env: &str,
    dry_run: bool,
) -> Result<()> {
    let values = parse_assignments(assignments)?;
    let env = parse_env(env)?;
    let mut config = ctx.load_config().await?;

    let added: Vec<String> = values
        .keys()
        .filter(|name| !config.has_secret(name))
        .cloned()
        .collect();
    for name in &added {
        config.add_secret(name.as_str());
    }

    let env_file = PathBuf::from(env.env_file_name());
    let source: Arc<dyn LocalSource> = if dry_run {
        // Nothing is written: overlay the new values on the current file
        let mut sources: Vec<Box<dyn LocalSource>> = vec![Box::new(values.clone())];
        if env_file.exists() {
            sources.push(Box::new(FileSource::open(&env_file).await?));
        }
        Arc::new(CombinedSource::new(sources))
    } else {
        if !added.is_empty() {
            ctx.save_config(&config).await?;
            println!("Added to config: {}", added.join(", "));
        }
        upsert_env_file(&env_file, &values)
            .await
            .with_context(|| format!("Failed to write to {}", env_file.display()))?;
        println!("Updated {}\n", env_file.display());
        Arc::new(FileSource::open(&env_file).await?)
    };

    let run = SyncRun::new(config.secrets.clone(), source, config.targets(), env).dry_run(dry_run);
    run_and_report(ctx, run).await
}

/// Auth check, run, then per-pass output and a summary. Fails when anything failed.
async fn run_and_report(ctx: &Context, run: SyncRun) -> Result<()> {
    if run.secret_names.is_empty() {
        println!("No secrets defined in config.");
        return Ok(());
    }
    if run.targets.is_empty() {
        println!("No targets configured.");
        return Ok(());
    }

    let orchestrator = ctx.orchestrator();

    println!("Checking authentication...");
    for target in &run.targets {
        let status = orchestrator.engine().check_auth(target);
        println!("{}", render::auth_line(target, &status));
    }

    println!();
    println!("Syncing secrets...");
    println!("Source: {}", run.source.describe());
    println!("Environment: {}\n", run.local_env);

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });
    let result = orchestrator.run(&run, &cancel).await;
    watcher.abort();
    let report = result?;

    for name in &report.unmapped {
        println!("{name}: no mapping for {} environment", report.local_env);
    }
    if report.passes.is_empty() {
        println!("No environment mappings found for '{}'", report.local_env);
        return Ok(());
    }
    for pass in &report.passes {
        print!("{}", render::pass(pass));
    }

    println!();
    println!("{}", render::summary(&report));

    if report.was_cancelled() {
        bail!("sync cancelled");
    }
    if report.has_failures() {
        bail!("sync finished with failures");
    }
    Ok(())
}
