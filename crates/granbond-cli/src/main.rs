mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run_app(cli) {
        error!("granbond failed: {}", e);
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app(cli: Cli) -> Result<()> {
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;
    install_panic_report()?;

    info!("granbond v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    if let Some(threads) = cli.threads {
        configure_thread_pool(threads)?;
    }

    dispatch(cli.command)?;
    info!("✅ Command completed successfully.");
    println!("✅ Command completed successfully.");
    Ok(())
}

/// Routes panics through the log so they also reach `--log-file`.
fn install_panic_report() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));
    Ok(())
}

/// Sizes the global rayon pool used by formation and row evaluation.
fn configure_thread_pool(threads: usize) -> Result<()> {
    if threads == 0 {
        return Err(CliError::Argument(
            "--threads must be at least 1".to_string(),
        ));
    }
    info!(threads, "Configuring rayon global thread pool.");
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to build global thread pool: {}", e)))
}

fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Validate(args) => {
            debug!("Dispatching to 'validate'.");
            commands::validate::run(args)
        }
        Commands::Evaluate(args) => {
            debug!("Dispatching to 'evaluate'.");
            commands::evaluate::run(args)
        }
        Commands::Restart(args) => {
            debug!("Dispatching to 'restart'.");
            commands::restart::run(args)
        }
    }
}
