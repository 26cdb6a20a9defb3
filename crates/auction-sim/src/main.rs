//! auction-sim: run auction placement experiments.
//!
//! # Usage
//!
//! ```text
//! auction-sim init-config --output sim.toml
//! auction-sim run --config sim.toml --algorithm reserve_n_best --seed 7
//! auction-sim run --remote-auctioneers 4 --instances 500
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod cluster;
mod commands;

#[derive(Parser)]
#[command(
    name = "auction-sim",
    about = "Simulate decentralized auction placement",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Place a generated workload by auction and print the report.
    Run(commands::run::RunArgs),
    /// Print the default simulation config, or write it to a file.
    InitConfig {
        /// Where to write the config (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,auction=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Run(args) => commands::run::run(args).await,
        Command::InitConfig { output, force } => {
            commands::init_config::init_config(output.as_deref(), force)
        }
    }
}
