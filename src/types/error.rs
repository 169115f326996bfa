//! Error types for the ledger engine
//!
//! Every failure the engine can report is a variant of [`LedgerError`]. Each variant
//! carries a stable machine-checkable code (see [`LedgerError::code`]) and a readable
//! message, and is classified by [`ErrorKind`].
//!
//! # Error Categories
//!
//! - **Business errors**: Account not found, insufficient balance, daily limits, etc.
//!   Raised synchronously and never retried inside the engine.
//! - **Unavailable errors**: Lock-wait timeouts and store conflicts. Safe to retry by
//!   re-issuing the same request with its original idempotency key.
//! - **I/O errors**: File and CSV problems in the replay surface.

use rust_decimal::Decimal;
use thiserror::Error;

/// Broad classification of a [`LedgerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Expected business-rule rejection
    Business,
    /// Infrastructure failure that is safe to retry
    Unavailable,
    /// File or format problem outside the engine
    Io,
}

/// Main error type for the ledger engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// No account matches the given number or id
    #[error("Account {account} not found")]
    AccountNotFound {
        /// Account number, or `#id` for id lookups
        account: String,
    },

    /// An account with this number already exists
    #[error("Account number {number} is already registered")]
    DuplicateAccountNumber { number: String },

    /// Accounts holding funds cannot be deleted
    #[error("Account {number} still holds a balance of {balance}")]
    AccountHasBalance { number: String, balance: Decimal },

    /// Balance does not cover the requested debit
    #[error("Insufficient balance in account {account}: balance {balance}, required {required}")]
    InsufficientBalance {
        account: String,
        balance: Decimal,
        required: Decimal,
    },

    /// Withdrawal would push the day's total past the limit
    #[error("Daily withdrawal limit exceeded for account {account}: used {used}, requested {requested}, limit {limit}")]
    DailyWithdrawalLimitExceeded {
        account: String,
        used: Decimal,
        requested: Decimal,
        limit: Decimal,
    },

    /// Transfer would push the day's outgoing total past the limit
    #[error("Daily transfer limit exceeded for account {account}: used {used}, requested {requested}, limit {limit}")]
    DailyTransferLimitExceeded {
        account: String,
        used: Decimal,
        requested: Decimal,
        limit: Decimal,
    },

    /// Sender and receiver are the same account
    #[error("Cannot transfer from account {account} to itself")]
    SameAccountTransfer { account: String },

    /// Amount is not positive or has more than two decimal places
    #[error("Invalid amount {amount}")]
    InvalidAmount { amount: Decimal },

    /// Malformed request field
    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    /// Decimal arithmetic would overflow
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow { operation: String, account: String },

    /// The account row lock was not granted in time
    #[error("Timed out after {waited_ms}ms waiting for the lock on account {account}")]
    LockTimeout { account: String, waited_ms: u64 },

    /// The ledger already holds a row with this idempotency key
    #[error("Idempotency key '{key}' is already recorded")]
    DuplicateIdempotencyKey { key: String },

    /// Optimistic update against a stale account version
    #[error("Account {account} was modified concurrently: expected version {expected}, found {actual}")]
    VersionConflict {
        account: String,
        expected: u64,
        actual: u64,
    },

    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// I/O error while reading or writing files
    #[error("I/O error: {message}")]
    IoError { message: String },

    /// CSV parsing error
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError { line: Option<u64>, message: String },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    /// Stable code for callers that map errors to transport statuses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::AccountNotFound { .. } => "A001",
            LedgerError::DuplicateAccountNumber { .. } => "A002",
            LedgerError::AccountHasBalance { .. } => "A003",
            LedgerError::InsufficientBalance { .. } => "T001",
            LedgerError::DailyWithdrawalLimitExceeded { .. } => "T002",
            LedgerError::DailyTransferLimitExceeded { .. } => "T003",
            LedgerError::InvalidAmount { .. } => "T004",
            LedgerError::SameAccountTransfer { .. } => "T005",
            LedgerError::ArithmeticOverflow { .. } => "T006",
            LedgerError::InvalidInput { .. } => "C001",
            LedgerError::FileNotFound { .. } => "C002",
            LedgerError::IoError { .. } => "C003",
            LedgerError::ParseError { .. } => "C004",
            LedgerError::LockTimeout { .. } => "S001",
            LedgerError::DuplicateIdempotencyKey { .. } => "S002",
            LedgerError::VersionConflict { .. } => "S003",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::LockTimeout { .. }
            | LedgerError::DuplicateIdempotencyKey { .. }
            | LedgerError::VersionConflict { .. } => ErrorKind::Unavailable,
            LedgerError::FileNotFound { .. }
            | LedgerError::IoError { .. }
            | LedgerError::ParseError { .. } => ErrorKind::Io,
            _ => ErrorKind::Business,
        }
    }

    /// Whether re-issuing the same request (same idempotency key) may succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Unavailable
    }
}

// Helper functions for creating common errors

impl LedgerError {
    pub fn account_not_found(number: &str) -> Self {
        LedgerError::AccountNotFound {
            account: number.to_string(),
        }
    }

    pub fn account_id_not_found(id: u64) -> Self {
        LedgerError::AccountNotFound {
            account: format!("#{}", id),
        }
    }

    pub fn duplicate_account_number(number: &str) -> Self {
        LedgerError::DuplicateAccountNumber {
            number: number.to_string(),
        }
    }

    pub fn account_has_balance(number: &str, balance: Decimal) -> Self {
        LedgerError::AccountHasBalance {
            number: number.to_string(),
            balance,
        }
    }

    pub fn insufficient_balance(account: &str, balance: Decimal, required: Decimal) -> Self {
        LedgerError::InsufficientBalance {
            account: account.to_string(),
            balance,
            required,
        }
    }

    pub fn daily_withdrawal_limit_exceeded(
        account: &str,
        used: Decimal,
        requested: Decimal,
        limit: Decimal,
    ) -> Self {
        LedgerError::DailyWithdrawalLimitExceeded {
            account: account.to_string(),
            used,
            requested,
            limit,
        }
    }

    pub fn daily_transfer_limit_exceeded(
        account: &str,
        used: Decimal,
        requested: Decimal,
        limit: Decimal,
    ) -> Self {
        LedgerError::DailyTransferLimitExceeded {
            account: account.to_string(),
            used,
            requested,
            limit,
        }
    }

    pub fn same_account_transfer(account: &str) -> Self {
        LedgerError::SameAccountTransfer {
            account: account.to_string(),
        }
    }

    pub fn invalid_amount(amount: Decimal) -> Self {
        LedgerError::InvalidAmount { amount }
    }

    pub fn invalid_input(field: &str, message: impl Into<String>) -> Self {
        LedgerError::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn arithmetic_overflow(operation: &str, account: &str) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account: account.to_string(),
        }
    }

    pub fn lock_timeout(account: &str, waited_ms: u64) -> Self {
        LedgerError::LockTimeout {
            account: account.to_string(),
            waited_ms,
        }
    }

    pub fn duplicate_idempotency_key(key: &str) -> Self {
        LedgerError::DuplicateIdempotencyKey {
            key: key.to_string(),
        }
    }

    pub fn version_conflict(account: &str, expected: u64, actual: u64) -> Self {
        LedgerError::VersionConflict {
            account: account.to_string(),
            expected,
            actual,
        }
    }
}
