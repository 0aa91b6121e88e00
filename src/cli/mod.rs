//! # envsync CLI
//!
//! Command-line interface over the config file, the sync engine and the
//! orchestrator.
//!
//! ## Usage
//!
//! ```bash
//! # Create envsync.yaml, importing names from an existing env file
//! envsync init --from .env
//!
//! # Track more names
//! envsync add API_KEY DATABASE_URL
//!
//! # Preview, then push .env.test to every target mapped to `test`
//! envsync sync test --dry-run
//! envsync sync test
//!
//! # Set a value locally and push it everywhere
//! envsync set STRIPE_KEY=sk_test_xxx
//!
//! # Pull production values from a target
//! envsync pull web --env production --output .env.live
//!
//! # Schema, targets and authentication
//! envsync status
//! ```

use crate::auth::CredentialResolver;
use crate::config::{ConfigFile, RuntimeConfig};
use crate::provider::PlatformRegistry;
use crate::sync::{Orchestrator, SyncEngine};
use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod pull;
mod render;
mod schema;
mod sync;

pub use sync::{infer_env_from_filename, parse_assignments, resolve_env_and_file};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_GIT_HASH"),
    ", built ",
    env!("BUILD_DATETIME"),
    ")"
);

/// Keep secret names in sync between local env files and deployment platforms
#[derive(Debug, Parser)]
#[command(name = "envsync", version = VERSION, about, long_about = None)]
#[command(after_help = "\
Examples:
  envsync sync test --dry-run
  envsync sync .env.live --to web,backend
  envsync pull web --env production --write-local
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, global = true, env = "ENVSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Debug logging for envsync
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a new config file
    Init {
        /// Env file to import secret names from
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Add secret name(s) to the schema
    Add {
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,
    },
    /// Write values to the local env file and sync them to all targets
    Set {
        #[arg(value_name = "NAME=VALUE", required = true)]
        assignments: Vec<String>,

        /// Local environment (test or live)
        #[arg(short, long, default_value = "test")]
        env: String,

        /// Preview without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Sync secrets from an env file (or environment variables) to targets
    Sync {
        /// Environment name (`test`, `live`) or env file (`.env.test`)
        #[arg(value_name = "ENV_OR_FILE")]
        env_or_file: Option<String>,

        /// Environment to sync (overrides inference)
        #[arg(short, long)]
        env: Option<String>,

        /// Source env file (overrides inference)
        #[arg(short, long, value_name = "FILE")]
        from: Option<PathBuf>,

        /// Read values from environment variables instead of a file
        #[arg(long)]
        no_file: bool,

        /// Preview changes without applying
        #[arg(long)]
        dry_run: bool,

        /// Target(s) to sync to (default: all)
        #[arg(short = 't', long = "to", value_delimiter = ',', value_name = "TARGET")]
        to: Vec<String>,

        /// Skip remaining targets after the first failure
        #[arg(long)]
        strict: bool,
    },
    /// Pull secrets from a target
    Pull {
        #[arg(value_name = "TARGET")]
        target: String,

        /// Remote environment to pull from (e.g. production, development)
        #[arg(short, long)]
        env: String,

        /// Output file (default: print to stdout)
        #[arg(short, long, value_name = "FILE", conflicts_with = "write_local")]
        output: Option<PathBuf>,

        /// Write to the env file of the local environment mapped to --env
        #[arg(long)]
        write_local: bool,
    },
    /// Show schema, targets and authentication status
    Status,
}

/// Per-invocation settings shared by the command handlers
#[derive(Debug, Clone)]
pub(crate) struct Context {
    pub config_path: PathBuf,
    pub runtime: RuntimeConfig,
}

impl Context {
    fn new(cli: &Cli, runtime: RuntimeConfig) -> Self {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| runtime.config_path.clone());
        Self {
            config_path,
            runtime,
        }
    }

    pub fn registry(&self) -> PlatformRegistry {
        PlatformRegistry::new(CredentialResolver::new(), self.runtime.http_timeout())
    }

    pub fn engine(&self) -> SyncEngine {
        SyncEngine::new(self.registry())
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.engine())
    }

    pub async fn load_config(&self) -> Result<ConfigFile> {
        ConfigFile::load(&self.config_path)
            .await
            .with_context(|| format!("Failed to load config from {}", self.config_path.display()))
    }

    pub async fn save_config(&self, config: &ConfigFile) -> Result<()> {
        config
            .save(&self.config_path)
            .await
            .with_context(|| format!("Failed to save config to {}", self.config_path.display()))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// Run one parsed command line
pub async fn run(cli: Cli, runtime: RuntimeConfig) -> Result<()> {
    let ctx = Context::new(&cli, runtime);

    match cli.command {
        Commands::Init { from, force } => schema::init(&ctx, from.as_deref(), force).await,
        Commands::Add { names } => schema::add(&ctx, &names).await,
        Commands::Status => schema::status(&ctx).await,
        Commands::Set {
            assignments,
            env,
            dry_run,
        } => sync::set(&ctx, &assignments, &env, dry_run).await,
        Commands::Sync {
            env_or_file,
            env,
            from,
            no_file,
            dry_run,
            to,
            strict,
        } => {
            let args = sync::SyncArgs {
                env_or_file,
                env,
                from,
                no_file,
                dry_run,
                to,
                strict,
            };
            sync::sync(&ctx, &args).await
        }
        Commands::Pull {
            target,
            env,
            output,
            write_local,
        } => pull::pull(&ctx, &target, &env, output.as_deref(), write_local).await,
    }
}
