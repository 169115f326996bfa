//! Asynchronous batch processing strategy
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (account partitioning + blocking pool)
//!         └── TransactionEngine (shared, thread-safe)
//! ```
//!
//! Batches are processed one after another so commands on the same account
//! keep file order across batch boundaries. Within a batch, groups of commands
//! that share no account run in parallel.

use crate::core::{BatchProcessor, TransactionEngine};
use crate::io::async_reader::AsyncReader;
use crate::strategy::{ProcessingStrategy, ReplaySummary};
use crate::types::LedgerError;
use std::path::Path;
use tracing::warn;

/// Configuration for batch processing
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of commands per batch
    pub batch_size: usize,
    /// Maximum number of command groups executing at once
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig, replacing zero values with defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(batch_size, default = default.batch_size, "invalid batch size, using default");
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "invalid concurrency, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(&self, engine: &TransactionEngine, input_path: &Path) -> Result<ReplaySummary, LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .max_blocking_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| LedgerError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(async {
            let processor = BatchProcessor::new(engine.clone());

            let file = tokio::fs::File::open(input_path).await.map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => LedgerError::FileNotFound {
                    path: input_path.display().to_string(),
                },
                _ => LedgerError::IoError {
                    message: format!("Failed to open file '{}': {}", input_path.display(), e),
                },
            })?;

            // Wrap tokio file in a compatibility layer for csv-async
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);
            let mut summary = ReplaySummary::default();

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for outcome in processor.process_batch(batch).await {
                    if let Err(e) = &outcome.result {
                        warn!(
                            command = outcome.command.kind(),
                            code = e.code(),
                            error = %e,
                            "command rejected"
                        );
                    }
                    summary.record(&outcome.result);
                }
            }

            summary.malformed = reader.skipped();
            Ok(summary)
        })
    }
}
