//! End-to-end replay job
//!
//! Opens the accounts listed in an accounts file, replays a command file with
//! the chosen strategy and writes the final account states (and optionally
//! the full ledger) as CSV.

use crate::cli::StrategyType;
use crate::config::EngineConfig;
use crate::core::{AccountService, AccountStore, Clock, LedgerStore, SystemClock, TransactionEngine};
use crate::io::csv_format::{opening_balance, write_accounts_csv, write_ledger_csv};
use crate::io::sync_reader::read_account_records;
use crate::strategy::{create_strategy, BatchConfig, ReplaySummary};
use crate::types::LedgerError;
use rust_decimal::Decimal;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Everything one replay run needs
#[derive(Debug, Clone)]
pub struct ReplayJob {
    pub commands: PathBuf,
    pub accounts: Option<PathBuf>,
    pub strategy: StrategyType,
    pub batch: BatchConfig,
    pub engine: EngineConfig,
    pub ledger_out: Option<PathBuf>,
}

impl ReplayJob {
    pub fn new(commands: impl Into<PathBuf>) -> Self {
        Self {
            commands: commands.into(),
            accounts: None,
            strategy: StrategyType::Async,
            batch: BatchConfig::default(),
            engine: EngineConfig::default(),
            ledger_out: None,
        }
    }
}

/// Register every account in `path` and apply its opening balance as a deposit
///
/// Returns the number of accounts opened.
///
/// # Errors
///
/// Any malformed row, invalid or duplicate account aborts the run.
pub fn open_accounts(engine: &TransactionEngine, path: &Path) -> Result<usize, LedgerError> {
    let service = AccountService::new(Arc::clone(engine.accounts()));
    let records = read_account_records(path)?;

    for record in &records {
        let balance = opening_balance(record)?;
        service.create_account(&record.number, &record.holder)?;
        if balance > Decimal::ZERO {
            engine.deposit(&record.number, balance, None)?;
        }
    }

    Ok(records.len())
}

/// Run a replay job, writing final balances to `output`
pub fn replay(job: &ReplayJob, output: &mut dyn Write) -> Result<ReplaySummary, LedgerError> {
    replay_with_clock(job, Arc::new(SystemClock), output)
}

/// Run a replay job with daily limits evaluated against `clock`
pub fn replay_with_clock(
    job: &ReplayJob,
    clock: Arc<dyn Clock>,
    output: &mut dyn Write,
) -> Result<ReplaySummary, LedgerError> {
    job.engine.validate()?;
    let engine = TransactionEngine::in_memory_with_clock(&job.engine, clock);

    if let Some(accounts) = &job.accounts {
        let opened = open_accounts(&engine, accounts)?;
        info!(opened, path = %accounts.display(), "accounts opened");
    }

    let strategy = create_strategy(job.strategy.clone(), Some(job.batch.clone()));
    let summary = strategy.process(&engine, &job.commands)?;
    info!(
        applied = summary.applied,
        rejected = summary.rejected,
        malformed = summary.malformed,
        "replay finished"
    );

    write_accounts_csv(&engine.accounts().find_all(), output)?;

    if let Some(path) = &job.ledger_out {
        let mut file = BufWriter::new(std::fs::File::create(path)?);
        write_ledger_csv(&engine.ledger().find_all(), &mut file)?;
        file.flush()?;
    }

    Ok(summary)
}
