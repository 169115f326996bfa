//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over commands from a CSV file, plus a reader
//! for the opening-accounts file. Delegates CSV format concerns to the
//! csv_format module.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual record errors are yielded as `ParseError` items carrying the
//!   line number, so callers can skip them and continue

use crate::io::csv_format::{convert_command_record, AccountRecord, CommandRecord};
use crate::types::{LedgerError, TransactionCommand};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

pub(crate) fn open(path: &Path) -> Result<File, LedgerError> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LedgerError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => LedgerError::IoError {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        },
    })
}

fn csv_reader(file: File) -> csv::Reader<File> {
    ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .buffer_capacity(8 * 1024)
        .from_reader(file)
}

/// Synchronous command reader
///
/// Yields one `Result<TransactionCommand, LedgerError>` per data row.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl SyncReader {
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        Ok(Self {
            reader: csv_reader(open(path)?),
            line_num: 1,
        })
    }

    /// Line number of the most recently yielded row (the header is line 1)
    pub fn line(&self) -> u64 {
        self.line_num
    }
}

impl Iterator for SyncReader {
    type Item = Result<TransactionCommand, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CommandRecord>();
        let next = deserializer.next()?;
        self.line_num += 1;

        let line = Some(self.line_num);
        Some(match next {
            Ok(record) => convert_command_record(record).map_err(|e| LedgerError::ParseError {
                line,
                message: e.to_string(),
            }),
            Err(e) => Err(LedgerError::ParseError {
                line,
                message: e.to_string(),
            }),
        })
    }
}

/// Read every row of an opening-accounts file
///
/// Unlike commands, a malformed account row is fatal: replaying commands
/// against a partially opened set of accounts would be meaningless.
pub fn read_account_records(path: &Path) -> Result<Vec<AccountRecord>, LedgerError> {
    let mut reader = csv_reader(open(path)?);
    let mut records = Vec::new();
    for record in reader.deserialize::<AccountRecord>() {
        records.push(record?);
    }
    Ok(records)
}
