//! Transaction-related types for the ledger engine
//!
//! This module defines ledger entry types, the rows the ledger stores, and the
//! command union the engine dispatches on.

use super::account::{Account, AccountRef};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Ledger entry identifier
///
/// Assigned by the ledger store in append order, starting at 1.
pub type EntryId = u64;

/// Kind of money movement, from the owner account's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Funds credited to the owner
    Deposit,

    /// Funds debited from the owner
    Withdrawal,

    /// Sender side of a transfer, carries the fee
    TransferOut,

    /// Receiver side of a transfer
    TransferIn,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::TransferOut => "TRANSFER_OUT",
            TransactionType::TransferIn => "TRANSFER_IN",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger entry status
///
/// The engine only ever commits `Success` rows; the other states exist for
/// rows written by other producers sharing the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Success => "SUCCESS",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Committed, immutable ledger row
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub tx_type: TransactionType,

    /// Moved amount, always positive
    pub amount: Decimal,

    /// Transfer fee, present only on `TransferOut` rows
    pub fee: Option<Decimal>,

    /// Account whose ledger this row belongs to
    pub owner: AccountRef,

    pub from_account: Option<AccountRef>,
    pub to_account: Option<AccountRef>,

    /// Owner balance right after this movement
    pub balance_after: Decimal,

    pub status: TransactionStatus,

    /// Caller-supplied retry token, globally unique when present
    pub idempotency_key: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Ledger row staged for append
///
/// Built from the post-mutation account state so `balance_after` is a
/// snapshot of the balance the commit will publish.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub fee: Option<Decimal>,
    pub owner: AccountRef,
    pub from_account: Option<AccountRef>,
    pub to_account: Option<AccountRef>,
    pub balance_after: Decimal,
    pub status: TransactionStatus,
    pub idempotency_key: Option<String>,
}

impl NewLedgerEntry {
    pub fn deposit(account: &Account, amount: Decimal, idempotency_key: Option<&str>) -> Self {
        NewLedgerEntry {
            tx_type: TransactionType::Deposit,
            amount,
            fee: None,
            owner: account.reference(),
            from_account: None,
            to_account: Some(account.reference()),
            balance_after: account.balance,
            status: TransactionStatus::Success,
            idempotency_key: idempotency_key.map(str::to_string),
        }
    }

    pub fn withdrawal(account: &Account, amount: Decimal, idempotency_key: Option<&str>) -> Self {
        NewLedgerEntry {
            tx_type: TransactionType::Withdrawal,
            amount,
            fee: None,
            owner: account.reference(),
            from_account: Some(account.reference()),
            to_account: None,
            balance_after: account.balance,
            status: TransactionStatus::Success,
            idempotency_key: idempotency_key.map(str::to_string),
        }
    }

    /// Sender-side transfer row; carries the fee and the request key
    pub fn transfer_out(
        sender: &Account,
        receiver: &Account,
        amount: Decimal,
        fee: Decimal,
        idempotency_key: Option<&str>,
    ) -> Self {
        NewLedgerEntry {
            tx_type: TransactionType::TransferOut,
            amount,
            fee: Some(fee),
            owner: sender.reference(),
            from_account: Some(sender.reference()),
            to_account: Some(receiver.reference()),
            balance_after: sender.balance,
            status: TransactionStatus::Success,
            idempotency_key: idempotency_key.map(str::to_string),
        }
    }

    /// Receiver-side transfer row; no fee and no key
    pub fn transfer_in(sender: &Account, receiver: &Account, amount: Decimal) -> Self {
        NewLedgerEntry {
            tx_type: TransactionType::TransferIn,
            amount,
            fee: None,
            owner: receiver.reference(),
            from_account: Some(sender.reference()),
            to_account: Some(receiver.reference()),
            balance_after: receiver.balance,
            status: TransactionStatus::Success,
            idempotency_key: None,
        }
    }

    pub fn into_entry(self, id: EntryId, created_at: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            id,
            tx_type: self.tx_type,
            amount: self.amount,
            fee: self.fee,
            owner: self.owner,
            from_account: self.from_account,
            to_account: self.to_account,
            balance_after: self.balance_after,
            status: self.status,
            idempotency_key: self.idempotency_key,
            created_at,
        }
    }
}

/// Money-movement request, one variant per operation kind
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionCommand {
    Deposit {
        account: String,
        amount: Decimal,
        idempotency_key: Option<String>,
    },
    Withdraw {
        account: String,
        amount: Decimal,
        idempotency_key: Option<String>,
    },
    Transfer {
        from: String,
        to: String,
        amount: Decimal,
        idempotency_key: Option<String>,
    },
}

impl TransactionCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            TransactionCommand::Deposit { .. } => "deposit",
            TransactionCommand::Withdraw { .. } => "withdraw",
            TransactionCommand::Transfer { .. } => "transfer",
        }
    }

    /// Account numbers this command touches
    pub fn accounts(&self) -> Vec<&str> {
        match self {
            TransactionCommand::Deposit { account, .. }
            | TransactionCommand::Withdraw { account, .. } => vec![account.as_str()],
            TransactionCommand::Transfer { from, to, .. } => vec![from.as_str(), to.as_str()],
        }
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        match self {
            TransactionCommand::Deposit {
                idempotency_key, ..
            }
            | TransactionCommand::Withdraw {
                idempotency_key, ..
            }
            | TransactionCommand::Transfer {
                idempotency_key, ..
            } => idempotency_key.as_deref(),
        }
    }
}
