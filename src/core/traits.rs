//! Core traits for account storage and ledger storage
//!
//! The engine is generic over these contracts so a durable backend can replace
//! the in-memory stores without touching the orchestration code.

use crate::types::{
    Account, AccountId, LedgerEntry, LedgerError, NewLedgerEntry, Page, PageRequest,
    TransactionStatus, TransactionType,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::ops::DerefMut;

/// Trait for account row storage
///
/// Provides plain lookups plus an exclusive, lock-scoped lookup. Money movements
/// only ever mutate an account through the guard returned by
/// [`AccountStore::lock_by_number`].
pub trait AccountStore: Send + Sync {
    /// Exclusive guard over one account row; the lock is released on drop
    type Lock: DerefMut<Target = Account>;

    /// Get a snapshot of an account by id
    fn find_by_id(&self, id: AccountId) -> Option<Account>;

    /// Get a snapshot of an account by number
    fn find_by_number(&self, number: &str) -> Option<Account>;

    /// Acquire the exclusive lock on an account row
    ///
    /// Blocks until the lock is granted or the store's lock-wait timeout elapses.
    ///
    /// # Errors
    ///
    /// * `AccountNotFound` if no account has this number
    /// * `LockTimeout` if the lock was not granted in time
    fn lock_by_number(&self, number: &str) -> Result<Self::Lock, LedgerError>;

    fn exists_by_number(&self, number: &str) -> bool;

    /// Insert or update an account
    ///
    /// An account with id 0 is inserted and receives a fresh id. Any other
    /// account is an optimistic update: it only applies if the stored version
    /// still matches, and the stored version is then incremented.
    ///
    /// # Errors
    ///
    /// * `DuplicateAccountNumber` on insert when the number is taken
    /// * `VersionConflict` on update against a stale version
    /// * `AccountNotFound` on update of an unknown id
    fn save(&self, account: Account) -> Result<Account, LedgerError>;

    /// Remove an account row
    ///
    /// Does not take the row lock; callers that need to inspect the row first
    /// hold its guard across the call.
    fn delete(&self, id: AccountId) -> Result<(), LedgerError>;

    /// Get snapshots of all accounts, sorted by number
    fn find_all(&self) -> Vec<Account>;
}

/// Trait for the append-only ledger
pub trait LedgerStore: Send + Sync {
    /// Append one entry
    ///
    /// # Errors
    ///
    /// `DuplicateIdempotencyKey` if the entry's key is already recorded.
    fn append(&self, entry: NewLedgerEntry, created_at: DateTime<Utc>) -> Result<LedgerEntry, LedgerError>;

    /// Append several entries atomically
    ///
    /// Either every entry is stored with consecutive ids or none is. The key
    /// uniqueness check covers both the stored rows and the batch itself.
    fn append_all(
        &self,
        entries: Vec<NewLedgerEntry>,
        created_at: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, LedgerError>;

    fn find_by_idempotency_key(&self, key: &str) -> Option<LedgerEntry>;

    /// Sum the amounts of `owner`'s rows of one type and status created in `[start, end)`
    fn sum_amount(
        &self,
        owner: AccountId,
        tx_type: TransactionType,
        status: TransactionStatus,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Decimal;

    /// Page through `owner`'s rows, newest first (created_at desc, then id desc)
    fn page_by_owner(&self, owner: AccountId, request: PageRequest) -> Page<LedgerEntry>;

    /// Get all rows in append order
    fn find_all(&self) -> Vec<LedgerEntry>;
}
