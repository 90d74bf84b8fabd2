//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `starttls_check` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - Ctrl-C handling and exit codes
//!
//! All core functionality is implemented in the library crate.

use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use starttls_check::initialization::{init_crypto_provider, init_logger_with};
use starttls_check::{run_batch_scan, run_checks, run_validation, Cli, Command, ScanOptions};

/// Exit code when `check` finds at least one failing domain.
const EXIT_DOMAINS_FAILED: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists), e.g. CONNECTION_POOL_SIZE
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = cli.config();

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    // Initialize crypto provider for TLS operations
    init_crypto_provider();

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Received Ctrl-C, shutting down");
                shutdown.cancel();
            }
        });
    }

    let outcome = match cli.command {
        Command::Check {
            domains,
            policy_list,
        } => run_checks(&config, &domains, policy_list.as_deref())
            .await
            .map(|failed| if failed > 0 { EXIT_DOMAINS_FAILED } else { 0 }),
        Command::Scan {
            file,
            column,
            has_headers,
            output,
            source,
        } => {
            let options = ScanOptions {
                file,
                column,
                has_headers,
                output,
                source,
            };
            run_batch_scan(&config, &options, shutdown).await.map(|_| 0)
        }
        Command::Validate {
            policies,
            interval_seconds,
            name,
        } => run_validation(
            &config,
            &policies,
            &name,
            Duration::from_secs(interval_seconds),
            shutdown,
        )
        .await
        .map(|()| 0),
    };

    match outcome {
        Ok(0) => Ok(()),
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("starttls_check error: {:#}", e);
            process::exit(1);
        }
    }
}
