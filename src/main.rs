//! snapstat - top PostgreSQL queries over a sampling interval
//!
//! Captures `pg_stat_statements` twice, `INTERVAL` seconds apart, diffs the
//! two snapshots per statement and prints the top-N statements ranked by
//! blocks read over the window.

mod capability;
mod cli;
mod config;
mod error;
mod executor;
mod output;
mod snapshot;

use crate::cli::Cli;
use crate::config::ConnectionConfig;
use crate::error::{SnapError, SnapResult};
use crate::executor::{create_pool, PostgresExecutor};
use crate::output::render_table;
use crate::snapshot::SnapshotOrchestrator;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_INTERVAL_SECS: u64 = 10;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    init_tracing(args.debug);

    match run(args).await {
        Ok(()) => {}
        Err(SnapError::Cancelled) => {
            info!("Terminated.");
            std::process::exit(1);
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}

async fn run(args: Cli) -> SnapResult<()> {
    let config = ConnectionConfig::load(&args)?;
    let pool = create_pool(&config)?;
    let executor = PostgresExecutor::connect(&pool).await?;
    let orchestrator = SnapshotOrchestrator::new(&executor);

    if args.reset {
        info!("Resetting statistics.");
        return orchestrator.reset().await;
    }

    let interval = match args.interval {
        Some(secs) => Duration::from_secs(secs),
        None => {
            info!("Interval is {DEFAULT_INTERVAL_SECS} seconds.");
            Duration::from_secs(DEFAULT_INTERVAL_SECS)
        }
    };

    // A Ctrl-C anywhere in the run, including the sampling wait, cancels
    // the whole operation; no partial result is printed.
    let table = tokio::select! {
        result = orchestrator.run(interval, args.top) => result?,
        _ = tokio::signal::ctrl_c() => return Err(SnapError::Cancelled),
    };

    print!("{}", render_table(&table));
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing(debug: bool) {
    let env_filter = if debug {
        EnvFilter::new("snapstat=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .without_time()
                .compact(),
        )
        .init();
}
