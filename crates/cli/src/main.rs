// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tg - barriers and resource restraints for pipeline steps

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{barrier, restraint};
use output::OutputFormat;
use std::path::{Path, PathBuf};
use tg_core::CoordinationConfig;
use tg_storage::JsonStore;

#[derive(Parser)]
#[command(
    name = "tg",
    version,
    about = "tg - coordinate pipeline steps with barriers and resource restraints"
)]
struct Cli {
    /// Store directory shared by every orchestrator instance
    #[arg(long, global = true, default_value = ".tollgate")]
    store: PathBuf,

    /// Coordination configuration file
    #[arg(long, global = true, default_value = "tollgate.toml")]
    config: PathBuf,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Barrier management
    #[command(subcommand)]
    Barrier(barrier::BarrierCommand),
    /// Resource restraint permits
    #[command(subcommand)]
    Restraint(restraint::RestraintCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();

    let store = JsonStore::open(&cli.store)
        .with_context(|| format!("opening store at {}", cli.store.display()))?;

    match cli.command {
        Commands::Barrier(command) => {
            // Barriers only need the wait hints, which have defaults
            let config = if cli.config.exists() {
                load_config(&cli.config)?
            } else {
                CoordinationConfig::default()
            };
            barrier::handle(command, store, &config, cli.format).await
        }
        Commands::Restraint(command) => {
            let config = load_config(&cli.config)?;
            restraint::handle(command, store, config, cli.format)
        }
    }
}

fn load_config(path: &Path) -> Result<CoordinationConfig> {
    CoordinationConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
