//! Types module
//!
//! Contains core data structures used throughout the engine.
//! This module organizes types into logical submodules:
//! - `account`: Account rows and references
//! - `transaction`: Ledger entries and transaction commands
//! - `page`: Paging for history reads
//! - `error`: Error types for the ledger engine

pub mod account;
pub mod error;
pub mod page;
pub mod transaction;

pub use account::{Account, AccountId, AccountRef};
pub use error::{ErrorKind, LedgerError};
pub use page::{Page, PageRequest, DEFAULT_PAGE_SIZE};
pub use transaction::{
    EntryId, LedgerEntry, NewLedgerEntry, TransactionCommand, TransactionStatus, TransactionType,
};
