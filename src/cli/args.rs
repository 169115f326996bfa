use crate::config::EngineConfig;
use crate::strategy::{BatchConfig, ReplayJob};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Replay deposit, withdrawal and transfer commands against a ledger
#[derive(Parser, Debug)]
#[command(name = "ledger-engine")]
#[command(about = "Replay money-movement commands and print final balances", long_about = None)]
pub struct CliArgs {
    /// Command CSV file path
    #[arg(value_name = "COMMANDS", help = "Path to the command CSV file")]
    pub commands_file: PathBuf,

    /// Opening accounts CSV file path
    #[arg(
        long = "accounts",
        value_name = "FILE",
        help = "CSV of accounts to open before replay (number,holder,balance)"
    )]
    pub accounts_file: Option<PathBuf>,

    /// Processing strategy to use for replay
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for concurrent batches"
    )]
    pub strategy: StrategyType,

    /// Number of commands per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of commands per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrent command groups (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of command groups executing concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Account lock wait timeout in milliseconds
    #[arg(
        long = "lock-timeout-ms",
        value_name = "MS",
        help = "How long an operation waits for an account lock (default: 5000, env: LEDGER_LOCK_TIMEOUT_MS)"
    )]
    pub lock_timeout_ms: Option<u64>,

    /// Ledger output file path
    #[arg(
        long = "ledger-out",
        value_name = "FILE",
        help = "Write every ledger row to this CSV file"
    )]
    pub ledger_out: Option<PathBuf>,
}

/// Available processing strategies for command replay
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments, falling back to defaults
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Engine configuration from the environment, with CLI overrides applied
    pub fn to_engine_config(&self) -> EngineConfig {
        let config = EngineConfig::from_env();
        match self.lock_timeout_ms {
            Some(ms) => config.with_lock_timeout(Duration::from_millis(ms)),
            None => config,
        }
    }

    pub fn to_job(&self) -> ReplayJob {
        ReplayJob {
            commands: self.commands_file.clone(),
            accounts: self.accounts_file.clone(),
            strategy: self.strategy.clone(),
            batch: self.to_batch_config(),
            engine: self.to_engine_config(),
            ledger_out: self.ledger_out.clone(),
        }
    }
}
