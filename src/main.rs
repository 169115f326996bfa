//! Ledger Engine CLI
//!
//! Replays a CSV of money-movement commands and prints the final account
//! balances as CSV.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --accounts accounts.csv commands.csv > balances.csv
//! cargo run -- --strategy sync --accounts accounts.csv commands.csv > balances.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 --accounts accounts.csv commands.csv
//! cargo run -- --accounts accounts.csv --ledger-out ledger.csv commands.csv
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` (default `info`) to change verbosity.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (file not found, malformed accounts file, invalid configuration, etc.)

use rust_ledger_engine::cli;
use rust_ledger_engine::strategy;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();
    let job = args.to_job();

    // Balances go to stdout
    let mut output = std::io::stdout();
    if let Err(e) = strategy::replay(&job, &mut output) {
        error!(code = e.code(), "{}", e);
        process::exit(1);
    }
}
