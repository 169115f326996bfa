//! Transactional scope for one engine operation
//!
//! A [`UnitOfWork`] holds the exclusive locks of every account an operation
//! touches, works on staged copies of those accounts and collects the ledger
//! rows to append. [`UnitOfWork::commit`] appends the rows and then publishes
//! the staged balances into the locked rows. Dropping an uncommitted unit
//! discards everything staged; the locks are released either way.

use super::traits::{AccountStore, LedgerStore};
use crate::types::{Account, LedgerEntry, LedgerError, NewLedgerEntry};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Index of a locked account inside a unit of work
pub type Slot = usize;

pub struct UnitOfWork<'a, A: AccountStore, L: LedgerStore> {
    accounts: &'a A,
    ledger: &'a L,

    /// Held row locks, in acquisition order
    locks: Vec<A::Lock>,

    /// Working copies, one per lock
    staged: Vec<Account>,

    entries: Vec<NewLedgerEntry>,
    committed: bool,
}

impl<'a, A: AccountStore, L: LedgerStore> UnitOfWork<'a, A, L> {
    pub fn begin(accounts: &'a A, ledger: &'a L) -> Self {
        Self {
            accounts,
            ledger,
            locks: Vec::with_capacity(2),
            staged: Vec::with_capacity(2),
            entries: Vec::with_capacity(2),
            committed: false,
        }
    }

    /// Lock an account for the rest of this unit
    ///
    /// Locking an account this unit already holds returns its existing slot.
    pub fn lock(&mut self, number: &str) -> Result<Slot, LedgerError> {
        if let Some(slot) = self.staged.iter().position(|a| a.number == number) {
            return Ok(slot);
        }

        let lock = self.accounts.lock_by_number(number)?;
        self.staged.push((*lock).clone());
        self.locks.push(lock);
        Ok(self.locks.len() - 1)
    }

    /// Lock two distinct accounts in ascending account-number order
    ///
    /// Every unit that needs both accounts acquires them in the same order,
    /// so two units can never each hold one and wait for the other. Slots
    /// come back in argument order.
    pub fn lock_pair(&mut self, a: &str, b: &str) -> Result<(Slot, Slot), LedgerError> {
        if a <= b {
            let first = self.lock(a)?;
            let second = self.lock(b)?;
            Ok((first, second))
        } else {
            let second = self.lock(b)?;
            let first = self.lock(a)?;
            Ok((first, second))
        }
    }

    pub fn account(&self, slot: Slot) -> &Account {
        &self.staged[slot]
    }

    pub fn account_mut(&mut self, slot: Slot) -> &mut Account {
        &mut self.staged[slot]
    }

    /// Stage a ledger row for append at commit
    pub fn record(&mut self, entry: NewLedgerEntry) {
        self.entries.push(entry);
    }

    /// Append the staged rows, then publish the staged accounts
    ///
    /// If the append fails nothing is published and the unit rolls back on drop.
    pub fn commit(mut self, at: DateTime<Utc>) -> Result<Vec<LedgerEntry>, LedgerError> {
        let entries = std::mem::take(&mut self.entries);
        let stored = self.ledger.append_all(entries, at)?;

        for (lock, staged) in self.locks.iter_mut().zip(self.staged.iter_mut()) {
            if staged.version != lock.version {
                staged.updated_at = at;
            }
            **lock = staged.clone();
        }

        self.committed = true;
        Ok(stored)
    }
}

impl<A: AccountStore, L: LedgerStore> Drop for UnitOfWork<'_, A, L> {
    fn drop(&mut self) {
        if !self.committed && !self.locks.is_empty() {
            debug!(
                accounts = ?self.staged.iter().map(|a| a.number.as_str()).collect::<Vec<_>>(),
                "unit of work rolled back"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account_store::InMemoryAccountStore;
    use crate::core::ledger_store::InMemoryLedgerStore;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn stores() -> (InMemoryAccountStore, InMemoryLedgerStore) {
        let accounts = InMemoryAccountStore::new(Duration::from_millis(50));
        accounts.save(Account::new("1111111111", "Alice")).unwrap();
        accounts.save(Account::new("2222222222", "Bob")).unwrap();
        (accounts, InMemoryLedgerStore::new())
    }

    #[test]
    fn test_commit_publishes_staged_balance() {
        let (accounts, ledger) = stores();

        let mut uow = UnitOfWork::begin(&accounts, &ledger);
        let slot = uow.lock("1111111111").unwrap();
        uow.account_mut(slot).credit(dec!(100)).unwrap();
        let entry = NewLedgerEntry::deposit(uow.account(slot), dec!(100), None);
        uow.record(entry);
        let stored = uow.commit(Utc::now()).unwrap();

        assert_eq!(stored.len(), 1);
        let account = accounts.find_by_number("1111111111").unwrap();
        assert_eq!(account.balance, dec!(100));
        assert_eq!(account.version, 1);
    }

    #[test]
    fn test_drop_without_commit_discards_changes() {
        let (accounts, ledger) = stores();

        {
            let mut uow = UnitOfWork::begin(&accounts, &ledger);
            let slot = uow.lock("1111111111").unwrap();
            uow.account_mut(slot).credit(dec!(100)).unwrap();
        }

        assert_eq!(accounts.find_by_number("1111111111").unwrap().balance, dec!(0));
        assert!(accounts.lock_by_number("1111111111").is_ok());
    }

    #[test]
    fn test_failed_append_publishes_nothing() {
        let (accounts, ledger) = stores();
        let alice = accounts.find_by_number("1111111111").unwrap();
        ledger
            .append(NewLedgerEntry::deposit(&alice, dec!(1), Some("taken")), Utc::now())
            .unwrap();

        let mut uow = UnitOfWork::begin(&accounts, &ledger);
        let slot = uow.lock("1111111111").unwrap();
        uow.account_mut(slot).credit(dec!(100)).unwrap();
        let entry = NewLedgerEntry::deposit(uow.account(slot), dec!(100), Some("taken"));
        uow.record(entry);

        assert!(uow.commit(Utc::now()).is_err());
        assert_eq!(accounts.find_by_number("1111111111").unwrap().balance, dec!(0));
    }

    #[test]
    fn test_lock_pair_returns_caller_order() {
        let (accounts, ledger) = stores();

        let mut uow = UnitOfWork::begin(&accounts, &ledger);
        let (from, to) = uow.lock_pair("2222222222", "1111111111").unwrap();

        assert_eq!(uow.account(from).number, "2222222222");
        assert_eq!(uow.account(to).number, "1111111111");
    }

    #[test]
    fn test_relocking_reuses_slot() {
        let (accounts, ledger) = stores();

        let mut uow = UnitOfWork::begin(&accounts, &ledger);
        let first = uow.lock("1111111111").unwrap();
        let again = uow.lock("1111111111").unwrap();

        assert_eq!(first, again);
    }
}
