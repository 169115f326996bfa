//! In-memory account store with per-row exclusive locks
//!
//! # Design
//!
//! Rows live in a `DashMap` keyed by account number, each behind its own
//! `Arc<parking_lot::Mutex<Account>>`. The map's internal sharding keeps lookups
//! of different accounts from contending, while the per-row mutex is the
//! exclusive lock money movements hold for their whole unit of work. A guard
//! owns an `Arc` to its row, so it outlives any map reference and can be held
//! across other store calls.

use super::traits::AccountStore;
use crate::types::{Account, AccountId, LedgerError};
use dashmap::DashMap;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

type Row = Arc<Mutex<Account>>;

/// Exclusive guard over one account row
pub struct AccountLock {
    guard: ArcMutexGuard<RawMutex, Account>,
}

impl Deref for AccountLock {
    type Target = Account;

    fn deref(&self) -> &Account {
        &self.guard
    }
}

impl DerefMut for AccountLock {
    fn deref_mut(&mut self) -> &mut Account {
        &mut self.guard
    }
}

impl std::fmt::Debug for AccountLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AccountLock").field(&*self.guard).finish()
    }
}

/// Thread-safe account store
#[derive(Debug)]
pub struct InMemoryAccountStore {
    /// Rows by account number
    rows: DashMap<String, Row>,

    /// Account number by id
    ids: DashMap<AccountId, String>,

    next_id: AtomicU64,

    /// Maximum wait for a row lock
    lock_timeout: Duration,
}

impl InMemoryAccountStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            rows: DashMap::new(),
            ids: DashMap::new(),
            next_id: AtomicU64::new(1),
            lock_timeout,
        }
    }

    fn row(&self, number: &str) -> Option<Row> {
        self.rows.get(number).map(|row| Arc::clone(&row))
    }

    fn acquire(&self, number: &str, row: &Row) -> Result<ArcMutexGuard<RawMutex, Account>, LedgerError> {
        row.try_lock_arc_for(self.lock_timeout).ok_or_else(|| {
            LedgerError::lock_timeout(number, self.lock_timeout.as_millis() as u64)
        })
    }

    fn insert(&self, mut account: Account) -> Result<Account, LedgerError> {
        let mut inserted = false;
        let row = self
            .rows
            .entry(account.number.clone())
            .or_insert_with(|| {
                inserted = true;
                account.id = self.next_id.fetch_add(1, Ordering::SeqCst);
                Arc::new(Mutex::new(account.clone()))
            })
            .clone();

        if !inserted {
            return Err(LedgerError::duplicate_account_number(&account.number));
        }

        let stored = row.lock().clone();
        self.ids.insert(stored.id, stored.number.clone());
        debug!(account = %stored.number, id = stored.id, "account inserted");
        Ok(stored)
    }

    fn update(&self, account: Account) -> Result<Account, LedgerError> {
        let number = self
            .ids
            .get(&account.id)
            .map(|number| number.clone())
            .ok_or_else(|| LedgerError::account_id_not_found(account.id))?;
        let row = self
            .row(&number)
            .ok_or_else(|| LedgerError::account_id_not_found(account.id))?;

        let mut guard = self.acquire(&number, &row)?;
        if guard.version != account.version {
            return Err(LedgerError::version_conflict(
                &number,
                account.version,
                guard.version,
            ));
        }

        let version = guard.version + 1;
        *guard = Account {
            number,
            version,
            ..account
        };
        Ok(guard.clone())
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_LOCK_TIMEOUT)
    }
}

impl AccountStore for InMemoryAccountStore {
    type Lock = AccountLock;

    fn find_by_id(&self, id: AccountId) -> Option<Account> {
        let number = self.ids.get(&id).map(|number| number.clone())?;
        self.find_by_number(&number)
    }

    fn find_by_number(&self, number: &str) -> Option<Account> {
        self.row(number).map(|row| row.lock().clone())
    }

    fn lock_by_number(&self, number: &str) -> Result<AccountLock, LedgerError> {
        let row = self
            .row(number)
            .ok_or_else(|| LedgerError::account_not_found(number))?;
        let guard = self.acquire(number, &row)?;

        // A delete may have unmapped the row while we waited on it
        let still_mapped = self
            .rows
            .get(number)
            .is_some_and(|current| Arc::ptr_eq(current.value(), &row));
        if !still_mapped {
            return Err(LedgerError::account_not_found(number));
        }

        debug!(account = number, "account lock acquired");
        Ok(AccountLock { guard })
    }

    fn exists_by_number(&self, number: &str) -> bool {
        self.rows.get(number).is_some()
    }

    fn save(&self, account: Account) -> Result<Account, LedgerError> {
        if account.id == 0 {
            self.insert(account)
        } else {
            self.update(account)
        }
    }

    fn delete(&self, id: AccountId) -> Result<(), LedgerError> {
        let (_, number) = self
            .ids
            .remove(&id)
            .ok_or_else(|| LedgerError::account_id_not_found(id))?;
        self.rows.remove(&number);
        debug!(account = %number, id, "account deleted");
        Ok(())
    }

    fn find_all(&self) -> Vec<Account> {
        let rows: Vec<Row> = self.rows.iter().map(|row| Arc::clone(row.value())).collect();
        let mut accounts: Vec<Account> = rows.iter().map(|row| row.lock().clone()).collect();
        accounts.sort_by(|a, b| a.number.cmp(&b.number));
        accounts
    }
}
