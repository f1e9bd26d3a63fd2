mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::Cli;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    info!(
        "🚀 MCSAlign CLI v{} starting up.",
        env!("CARGO_PKG_VERSION")
    );
    debug!("Full CLI arguments parsed: {:?}", &cli);

    if let Some(num_threads) = cli.threads {
        info!(
            "Setting Rayon global thread pool to {} threads.",
            num_threads
        );
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| {
                CliError::Other(anyhow::anyhow!("Failed to build global thread pool: {}", e))
            })?;
    }

    let progress = if cli.quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };

    match commands::align::run(&cli, &progress) {
        Ok(summary) => {
            info!(
                candidates = summary.candidates,
                aligned = summary.aligned_candidates,
                placements = summary.placements,
                "✅ Alignment completed successfully."
            );
            if !cli.quiet {
                println!(
                    "✅ Aligned {} of {} candidate(s); {} placement(s) written to: {}",
                    summary.aligned_candidates,
                    summary.candidates,
                    summary.placements,
                    cli.output.display()
                );
            }
            Ok(())
        }
        Err(e) => {
            error!("❌ Command failed: {}", e);
            Err(e)
        }
    }
}
