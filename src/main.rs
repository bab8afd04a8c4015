//! mcp-harness - integration test driver for stdio tool servers
//!
//! Launches a tool server as a subprocess, drives it over line-delimited
//! JSON-RPC and reports which tools behave as expected.

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use harness::common::{config::Config, logging};
use harness::{cli, commands};

#[derive(Parser)]
#[command(name = "mcp-harness", about = "Integration test driver for stdio tool servers")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Also write logs to a file; without a path, the default log location
    #[arg(long, global = true, value_name = "PATH", num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let log_file = match cli.log_file {
        Some(Some(path)) => Some(path),
        Some(None) => logging::default_log_path(),
        None => config.logging.file.clone(),
    };
    if let Some(path) = logging::init(log_file.as_deref()) {
        tracing::debug!("Logging to {}", path.display());
    }

    if let Err(e) = cli::dispatch(cli.command, config).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
