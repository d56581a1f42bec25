//! claw-logsink binary entrypoint.
//!
//! Replays a set of records through a log sink on stdout and shuts it down.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use claw_logsink::cli::Cli;
use claw_logsink::writer;

fn main() -> ExitCode {
    // Diagnostics go to stderr; rendered records own stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(claw_logsink::cli::run(&cli, writer::stdout())) {
        Ok(report) => {
            if report.stats.failed > 0 {
                eprintln!("{} record(s) could not be written", report.stats.failed);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
