//! Tenant cleaner CLI entrypoint.
//!
//! This is the main entrypoint for the tenant-cleaner command-line tool.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tenant_cleaner::cli::{Cli, OutputFormatter};
use tenant_cleaner::config::{self, Configuration, LogFormat, LogSpec};
use tenant_cleaner::error::Result;
use tenant_cleaner::openstack::OpenStackManagerFactory;
use tenant_cleaner::runner::Runner;
use tenant_cleaner::tracking::{LocalTracker, Tracker};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Timeout of each `OpenStack` API request.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Configuration errors are fatal before any run starts
    let configuration = match config::load(&cli.config) {
        Ok(configuration) => configuration,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&configuration.general.log, cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli, configuration)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `-v` forces debug output; otherwise `RUST_LOG` wins over the configured level.
fn init_logging(log: &LogSpec, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&log.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };

    match log.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli, configuration: Configuration) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    let tracker = LocalTracker::open(&configuration.general.tracking_database).await?;
    info!(
        "Using {} tracking database at {}",
        tracker.backend_type(),
        tracker.path().display()
    );

    let factory = OpenStackManagerFactory::new(Duration::from_secs(REQUEST_TIMEOUT_SECS));
    let period = configuration.general.run_every;
    let mut runner = Runner::new(configuration, Arc::new(factory), Arc::new(tracker));

    if cli.single_run {
        let summary = runner.run_once(cli.dry_run).await?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", formatter.format_summary(&summary))?;
        stdout.flush()?;
    } else {
        info!("Running every {period:?}, press Ctrl-C to stop");
        runner
            .run_periodically(period, cli.dry_run, shutdown_signal())
            .await?;
    }

    Ok(())
}

/// Completes when the process is asked to stop.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C, running until killed: {e}");
        std::future::pending::<()>().await;
    }
}
