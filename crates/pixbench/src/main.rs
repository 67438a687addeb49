//! pixbench: run an image filter pipeline through process and thread
//! pools and measure how each scales.
//!
//! # Usage
//!
//! ```text
//! pixbench run --input images/ --workers 4 --method mp
//! pixbench sweep --input images/ --count 50,100 --workers 1,2,4,8 --runs 3
//! pixbench saturation --input images/ --workers 8
//! pixbench steps --image images/cat.jpg --output steps/
//! pixbench plot --raw results/benchmark_results.csv
//! ```
//!
//! Tables go to stdout; logs go to stderr.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;
mod commands;
mod error;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::Layer;

use cli::{Cli, Commands, LogFormat};
use error::CliError;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    let result = match &cli.command {
        Commands::Run(args) => commands::run(&cli, args),
        Commands::Sweep(args) => commands::sweep(&cli, args),
        Commands::Saturation(args) => commands::saturation(&cli, args),
        Commands::Steps(args) => commands::steps(&cli, args),
        Commands::Plot(args) => commands::plot(args),
        Commands::Worker(args) => commands::worker(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Install a stderr subscriber. `RUST_LOG` overrides `-v`; `-q` wins over
/// both.
fn init_logging(cli: &Cli) -> Result<(), CliError> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else {
        let default_level = match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    let fmt_layer = match cli.log_format {
        LogFormat::Json => fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .with_thread_names(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().with_writer(std::io::stderr).pretty().boxed(),
        LogFormat::Compact => fmt::layer()
            .with_writer(std::io::stderr)
            .compact()
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}
