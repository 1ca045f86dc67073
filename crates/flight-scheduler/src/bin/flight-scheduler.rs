use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use flight_scheduler::common::arraydef::RangeExpansion;
use flight_scheduler::common::config::ControllerConfig;
use flight_scheduler::common::setup::setup_logging;
use flight_scheduler::server::state::ControllerState;

#[derive(Parser)]
#[command(author, version = flight_scheduler::SCHEDULER_VERSION, about)]
struct RootOptions {
    /// Enables more detailed log output
    #[arg(long, global = true, env = "FLIGHT_SCHEDULER_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    subcmd: SubCommand,
}

#[derive(Subcommand)]
enum SubCommand {
    /// Prints the indices an array expression expands to
    Expand {
        /// Expression such as `1-4,8,10-12`
        expression: String,
    },
    /// Loads a controller configuration and validates its partitions
    CheckConfig {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        path: PathBuf,
    },
}

fn command_expand(expression: &str) -> anyhow::Result<()> {
    let range = RangeExpansion::parse(expression);
    if let Some(error) = range.error() {
        anyhow::bail!("Invalid array expression\n{error}");
    }
    log::debug!("{range} expands to {} index(es)", range.len());
    let indices: Vec<String> = range.iter().map(|index| index.to_string()).collect();
    println!("{}", indices.join("\n"));
    Ok(())
}

fn command_check_config(path: &Path) -> anyhow::Result<()> {
    let config = ControllerConfig::load(path)?;
    let state = ControllerState::from_config(&config)?;
    for partition in state.partitions() {
        log::info!(
            "Partition {}{}: {} node(s)",
            partition.name(),
            if partition.is_default() { " (default)" } else { "" },
            partition.nodes().len()
        );
    }
    if state.default_partition().is_none() {
        log::warn!("No partition is marked as default");
    }
    log::info!("Configuration {} is valid", path.display());
    Ok(())
}

fn main() -> flight_scheduler::Result<()> {
    let opts = RootOptions::parse();
    setup_logging(opts.debug);

    let result = match opts.subcmd {
        SubCommand::Expand { expression } => command_expand(&expression),
        SubCommand::CheckConfig { path } => command_check_config(&path),
    };

    if let Err(e) = result {
        log::error!("{e:?}");
        std::process::exit(1);
    }

    Ok(())
}
