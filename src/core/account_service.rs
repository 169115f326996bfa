//! Account provisioning
//!
//! Creating, reading and removing accounts. Balances are never set here; they
//! only change through the transaction engine.

use super::account_store::InMemoryAccountStore;
use super::traits::AccountStore;
use crate::types::{Account, AccountId, LedgerError};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};

const NUMBER_DIGITS: std::ops::RangeInclusive<usize> = 10..=20;
const HOLDER_CHARS: std::ops::RangeInclusive<usize> = 2..=50;

/// Account provisioning service
pub struct AccountService<A = InMemoryAccountStore> {
    accounts: Arc<A>,
}

impl<A> Clone for AccountService<A> {
    fn clone(&self) -> Self {
        Self {
            accounts: Arc::clone(&self.accounts),
        }
    }
}

impl<A: AccountStore> AccountService<A> {
    pub fn new(accounts: Arc<A>) -> Self {
        Self { accounts }
    }

    /// Register a new account with a zero balance
    ///
    /// # Errors
    ///
    /// * `InvalidInput` if the number is not 10-20 digits or the holder is not 2-50 characters
    /// * `DuplicateAccountNumber` if the number is already registered
    #[instrument(level = "debug", skip(self))]
    pub fn create_account(&self, number: &str, holder: &str) -> Result<Account, LedgerError> {
        validate_number(number)?;
        let holder = holder.trim();
        if !HOLDER_CHARS.contains(&holder.chars().count()) {
            return Err(LedgerError::invalid_input(
                "holder",
                "must be between 2 and 50 characters",
            ));
        }

        if self.accounts.exists_by_number(number) {
            return Err(LedgerError::duplicate_account_number(number));
        }

        // the store re-checks uniqueness on insert
        let account = self.accounts.save(Account::new(number, holder))?;
        info!(account = number, id = account.id, "account created");
        Ok(account)
    }

    pub fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.accounts
            .find_by_id(id)
            .ok_or_else(|| LedgerError::account_id_not_found(id))
    }

    pub fn get_account_by_number(&self, number: &str) -> Result<Account, LedgerError> {
        self.accounts
            .find_by_number(number)
            .ok_or_else(|| LedgerError::account_not_found(number))
    }

    pub fn list_accounts(&self) -> Vec<Account> {
        self.accounts.find_all()
    }

    /// Remove an empty account
    ///
    /// The row lock is held across the balance check and the removal, so a
    /// concurrent deposit either lands first (and blocks the delete) or finds
    /// the account gone.
    ///
    /// # Errors
    ///
    /// * `AccountNotFound` if no account has this id
    /// * `AccountHasBalance` if the balance is above zero
    /// * `LockTimeout` if the row stays locked past the wait timeout
    #[instrument(level = "debug", skip(self))]
    pub fn delete_account(&self, id: AccountId) -> Result<(), LedgerError> {
        let number = self.get_account(id)?.number;
        let lock = self.accounts.lock_by_number(&number)?;

        if lock.balance > Decimal::ZERO {
            return Err(LedgerError::account_has_balance(&number, lock.balance));
        }

        self.accounts.delete(lock.id)?;
        drop(lock);
        info!(account = %number, id, "account deleted");
        Ok(())
    }
}

fn validate_number(number: &str) -> Result<(), LedgerError> {
    let all_digits = !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit());
    if !all_digits || !NUMBER_DIGITS.contains(&number.len()) {
        return Err(LedgerError::invalid_input(
            "account_number",
            "must be 10 to 20 digits",
        ));
    }
    Ok(())
}
