//! Asynchronous CSV reader with batch interface
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of TransactionCommands
//!                  ↓
//!           csv_format module
//!           (CommandRecord, convert_command_record)
//! ```

use crate::io::csv_format::{convert_command_record, CommandRecord};
use crate::types::TransactionCommand;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous command reader
///
/// Malformed rows are logged and skipped; `skipped()` counts them.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    skipped: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            skipped: 0,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Read up to `batch_size` commands
    ///
    /// Returns an empty vector at end of input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<TransactionCommand> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CommandRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(record)) => match convert_command_record(record) {
                    Ok(command) => batch.push(command),
                    Err(e) => {
                        warn!(error = %e, "skipping malformed command");
                        self.skipped += 1;
                    }
                },
                Some(Err(e)) => {
                    warn!(error = %e, "skipping unreadable CSV row");
                    self.skipped += 1;
                }
                None => break,
            }
        }

        batch
    }
}
