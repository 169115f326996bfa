//! Synchronous processing strategy
//!
//! Replays commands one at a time, in file order, on the calling thread.
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Command execution to `TransactionEngine`
//!
//! Memory usage stays constant in the size of the command file: rows are
//! streamed, never collected.

use crate::core::TransactionEngine;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{ProcessingStrategy, ReplaySummary};
use crate::types::LedgerError;
use std::path::Path;
use tracing::warn;

/// Synchronous processing strategy
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(&self, engine: &TransactionEngine, input_path: &Path) -> Result<ReplaySummary, LedgerError> {
        let mut reader = SyncReader::new(input_path)?;
        let mut summary = ReplaySummary::default();

        while let Some(next) = reader.next() {
            let command = match next {
                Ok(command) => command,
                Err(e) => {
                    warn!(error = %e, "skipping malformed command");
                    summary.malformed += 1;
                    continue;
                }
            };

            let result = engine.execute(&command);
            if let Err(e) = &result {
                warn!(
                    line = reader.line(),
                    command = command.kind(),
                    code = e.code(),
                    error = %e,
                    "command rejected"
                );
            }
            summary.record(&result);
        }

        Ok(summary)
    }
}
