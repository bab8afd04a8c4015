//! CLI command definitions
//!
//! Defines the clap commands for the harness CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::common::config::ServerConfig;

/// How to launch the tool server; every flag overrides the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
    /// Program that starts the tool server (e.g. npx, node, ./server)
    #[arg(long)]
    pub server_cmd: Option<String>,

    /// Argument for the server program; repeat for several
    #[arg(long = "server-arg", allow_hyphen_values = true)]
    pub server_args: Vec<String>,

    /// Working directory for the server
    #[arg(long)]
    pub server_cwd: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Slow down browser actions by this many milliseconds
    #[arg(long, value_name = "MS")]
    pub slow_mo: Option<u64>,

    /// Time to wait after spawning before the first request
    #[arg(long, value_name = "MS")]
    pub warmup_ms: Option<u64>,
}

impl ServerArgs {
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(cmd) = &self.server_cmd {
            config.command = cmd.clone();
            config.args = self.server_args.clone();
        } else if !self.server_args.is_empty() {
            config.args = self.server_args.clone();
        }
        if let Some(cwd) = &self.server_cwd {
            config.cwd = Some(cwd.clone());
        }
        if self.headed {
            config.headed = true;
        }
        if let Some(ms) = self.slow_mo {
            config.slow_mo_ms = ms;
        }
        if let Some(ms) = self.warmup_ms {
            config.warmup_ms = ms;
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a suite against the tool server
    Run {
        /// YAML suite file (default: the built-in suite)
        suite: Option<PathBuf>,

        #[command(flatten)]
        server: ServerArgs,

        /// Leave created resources in place instead of deleting them
        #[arg(long)]
        keep: bool,

        /// Per-call timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Print the report as JSON instead of colored text
        #[arg(long)]
        json: bool,

        /// Show the raw response of every test
        #[arg(long, short)]
        verbose: bool,
    },

    /// Print the test plan without running anything
    Plan {
        /// YAML suite file (default: the built-in suite)
        suite: Option<PathBuf>,
    },

    /// Print every test as a tool call that can be replayed by hand
    Commands {
        /// YAML suite file (default: the built-in suite)
        suite: Option<PathBuf>,

        /// Prefix placed before each tool name
        #[arg(long)]
        prefix: Option<String>,
    },

    /// List the tools the server exposes
    Tools {
        #[command(flatten)]
        server: ServerArgs,
    },
}
