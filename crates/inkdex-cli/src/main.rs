mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

const LOG_FILTER_ENV: &str = "INKDEX_LOG";

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    commands::run_from_root(&cli.root, cli.config.as_deref(), cli.command)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
