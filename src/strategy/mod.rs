//! Processing strategy module for command replay
//!
//! This module defines the Strategy pattern for replaying a command file
//! through the transaction engine. Different processing implementations
//! (sequential, concurrent batch) can be selected at runtime; both produce the
//! same final balances for the same input.

use crate::cli::StrategyType;
use crate::core::TransactionEngine;
use crate::types::{LedgerEntry, LedgerError};
use std::path::Path;

pub mod r#async;
pub mod replay;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use replay::{open_accounts, replay, replay_with_clock, ReplayJob};
pub use sync::SyncProcessingStrategy;

/// Counts of what happened to each command row
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Commands that committed (or replayed an earlier result)
    pub applied: usize,

    /// Well-formed commands the engine rejected
    pub rejected: usize,

    /// Rows that could not be parsed into a command
    pub malformed: usize,
}

impl ReplaySummary {
    pub fn record(&mut self, result: &Result<LedgerEntry, LedgerError>) {
        match result {
            Ok(_) => self.applied += 1,
            Err(_) => self.rejected += 1,
        }
    }
}

/// Processing strategy trait for command replay
pub trait ProcessingStrategy: Send + Sync {
    /// Replay every command in `input_path` through `engine`
    ///
    /// Rejected and malformed commands are logged and counted; processing
    /// continues with the next command.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal problems: the input file cannot be
    /// opened or read, or the runtime cannot be started.
    fn process(&self, engine: &TransactionEngine, input_path: &Path) -> Result<ReplaySummary, LedgerError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Optional configuration for async batch processing (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}
