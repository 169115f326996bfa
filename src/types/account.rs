//! Account-related types for the ledger engine
//!
//! This module defines the Account row and the lightweight reference
//! ledger entries use to point at accounts.

use super::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Store-assigned account identifier
///
/// Zero means "not yet stored".
pub type AccountId = u64;

/// Account balance row
///
/// The balance is the only field mutated by money movements, and only by the
/// holder of the row's exclusive lock. Every mutation bumps `version`.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Store-assigned identifier
    pub id: AccountId,

    /// Unique account number (10-20 digits)
    pub number: String,

    /// Account holder name
    pub holder: String,

    /// Current balance, never negative after a committed operation
    pub balance: Decimal,

    /// Monotonic mutation counter for optimistic conflict detection
    pub version: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create an unsaved account with a zero balance
    ///
    /// # Arguments
    ///
    /// * `number` - The account number
    /// * `holder` - The account holder name
    ///
    /// # Returns
    ///
    /// A new Account with:
    /// - id = 0 (assigned by the store on save)
    /// - balance = 0.00
    /// - version = 0
    pub fn new(number: impl Into<String>, holder: impl Into<String>) -> Self {
        let now = Utc::now();
        Account {
            id: 0,
            number: number.into(),
            holder: holder.into(),
            balance: Decimal::new(0, 2),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add funds to the balance
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the balance cannot represent the result.
    /// The account is left untouched on error.
    pub fn credit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("credit", &self.number))?;
        self.version += 1;
        Ok(())
    }

    /// Remove funds from the balance
    ///
    /// The balance check happens before any mutation, so a rejected debit
    /// leaves the account untouched.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientBalance` if `amount` exceeds the balance.
    pub fn debit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if self.balance < amount {
            return Err(LedgerError::insufficient_balance(
                &self.number,
                self.balance,
                amount,
            ));
        }
        self.balance -= amount;
        self.version += 1;
        Ok(())
    }

    pub fn reference(&self) -> AccountRef {
        AccountRef {
            id: self.id,
            number: self.number.clone(),
        }
    }
}

/// Reference from a ledger entry to an account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AccountRef {
    pub id: AccountId,
    pub number: String,
}
