//! Command-line surface
//!
//! Argument-parsing failures exit with code 2 (clap's default), runtime
//! failures with 1.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "snapstat",
    version,
    about = "Top PostgreSQL queries over a sampling interval",
    long_about = "Samples pg_stat_statements twice across a sampling interval, \
diffs the two snapshots per statement and prints the top-N statements ranked \
by blocks read."
)]
pub struct Cli {
    /// Host name of the postgres server
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port number of the postgres server
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// User name to connect
    #[arg(short = 'U', long)]
    pub username: Option<String>,

    /// Database name to connect
    #[arg(short = 'd', long)]
    pub dbname: Option<String>,

    /// Number of queries to be listed
    #[arg(short = 't', long, value_name = "NUMBER")]
    pub top: Option<u32>,

    /// Reset statistics instead of sampling
    #[arg(short = 'R', long)]
    pub reset: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Sampling interval in seconds
    #[arg(value_name = "INTERVAL")]
    pub interval: Option<u64>,
}
