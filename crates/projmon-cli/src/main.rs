//! `projmon`: poll projector status over serial and forward it to InfluxDB.
//!
//! Configuration comes from the environment (`INFLUXDB_URL`, `INFLUXDB_ORG`,
//! `INFLUXDB_BUCKET`, `INFLUXDB_TOKEN` plus optional `PROJMON_*` overrides)
//! and the flags below. Log verbosity follows `RUST_LOG`.

mod cli;
mod console;
mod poll;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stderr keeps stdout clean for `once`
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.into_command() {
        Commands::Run(args) => poll::run(args).await,
        Commands::Once(args) => poll::once(args).await,
        Commands::Console { port } => console::run(&port).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
