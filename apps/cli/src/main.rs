//! dbhive command-line interface.
//!
//! Loads a topology file into the process-wide manager, then lists or
//! checks the databases it declares.

mod cli;
mod commands;
mod logging;

use anyhow::Context as _;
use clap::Parser;
use dbhive_db::{Topology, default_manager};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format);

    let Some(path) = cli.config.as_deref() else {
        anyhow::bail!("no topology file given; pass --config or set DBHIVE_CONFIG");
    };
    let topology = Topology::load(path)
        .await
        .with_context(|| format!("failed to load {}", path.display()))?;

    let manager = default_manager();
    topology.apply(manager).context("failed to register topology")?;
    tracing::debug!(groups = manager.len(), "Topology registered");

    let mut stdout = std::io::stdout();
    match cli.command {
        Command::List { format } => commands::list(manager, format, &mut stdout),
        Command::Check { group, timeout } => {
            commands::check(manager, group.as_deref(), timeout, &mut stdout).await
        }
    }
}
