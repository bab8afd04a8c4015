//! CLI command handling
//!
//! Dispatches CLI commands and formats output.

use std::path::Path;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::mcp::ToolClient;
use crate::testing::{self, builtin, report, ResourceManager, ResourceNamer, RunOptions, Suite};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, mut config: Config) -> Result<()> {
    match command {
        Commands::Run {
            suite,
            server,
            keep,
            timeout,
            json,
            verbose,
        } => {
            server.apply(&mut config.server);
            if keep {
                config.resources.keep = true;
            }
            if let Some(secs) = timeout {
                config.timeouts.call_secs = secs;
            }

            let namer = ResourceNamer::random();
            let suite = load_suite(suite.as_deref(), &namer)?;
            let manager = ResourceManager::new(namer, config.resources.keep);
            let options = RunOptions {
                call_timeout: config.call_timeout(),
            };

            let mut client = ToolClient::new(config.server.clone());
            client.start().await?;

            if !json {
                report::print_header(&suite);
            }
            let outcome =
                testing::run_with_session(&manager, &mut client, &suite, &options, move |result| {
                    if !json {
                        report::print_result(result, verbose);
                    }
                })
                .await;

            client.stop().await?;
            let run = outcome?;

            if json {
                println!("{}", report::to_json(&run)?);
            } else {
                report::print_summary(&run);
            }

            let failed = run.summary().failed;
            if failed > 0 {
                return Err(Error::TestsFailed(failed));
            }
            Ok(())
        }

        Commands::Plan { suite } => {
            let suite = load_suite(suite.as_deref(), &ResourceNamer::random())?;
            report::print_plan(&suite);
            Ok(())
        }

        Commands::Commands { suite, prefix } => {
            let suite = load_suite(suite.as_deref(), &ResourceNamer::random())?;
            let prefix = prefix.unwrap_or(config.replay.prefix);
            report::print_commands(&suite, &prefix);
            Ok(())
        }

        Commands::Tools { server } => {
            server.apply(&mut config.server);

            let mut client = ToolClient::new(config.server.clone());
            client.start().await?;
            let tools = client.list_tools(config.call_timeout()).await;
            client.stop().await?;
            let tools = tools?;

            if tools.is_empty() {
                println!("No tools exposed");
                return Ok(());
            }
            println!("{}", "Tools:".cyan());
            for tool in tools {
                match tool.description.as_deref() {
                    Some(desc) if !desc.is_empty() => {
                        println!("  {} - {}", tool.name.white().bold(), desc.dimmed())
                    }
                    _ => println!("  {}", tool.name.white().bold()),
                }
            }
            Ok(())
        }
    }
}

/// The suite at `path`, or the built-in suite
fn load_suite(path: Option<&Path>, namer: &ResourceNamer) -> Result<Suite> {
    match path {
        Some(path) => Suite::load(path, namer),
        None => builtin::generated(namer),
    }
}
