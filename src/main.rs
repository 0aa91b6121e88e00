//! # envsync
//!
//! Command-line entry point. See [`envsync::cli`] for the commands.

use anyhow::Result;
use clap::Parser;
use envsync::cli::{self, Cli};
use envsync::config::RuntimeConfig;
use envsync::observability::init_logging;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let runtime = RuntimeConfig::from_env();
    init_logging(&runtime, cli.verbose);
    debug!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("BUILD_GIT_HASH"),
        "Starting envsync"
    );

    cli::run(cli, runtime).await
}
