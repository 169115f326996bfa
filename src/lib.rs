//! Rust Ledger Engine Library
//! # Overview
//!
//! This library provides a money-movement transaction engine over account
//! balances and an append-only ledger, plus a CSV replay front end with a
//! sequential and a concurrent strategy.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, LedgerEntry, TransactionCommand, errors)
//! - [`config`] - Limits, fee rate, lock timeout
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - Deposit, withdrawal and transfer orchestration
//!   - [`core::limits`] - Daily limits and transfer fees
//!   - [`core::unit_of_work`] - Row locks, staged mutations, atomic commit
//!   - [`core::account_store`] / [`core::ledger_store`] - In-memory stores
//!   - [`core::account_service`] - Account provisioning
//! - [`io`] - CSV reading and writing
//! - [`strategy`] - Replay strategies
//! - [`cli`] - CLI arguments parsing
//!
//! # Operations
//!
//! - **Deposit**: Credit funds to an account
//! - **Withdraw**: Debit funds, subject to a 1,000,000 daily limit
//! - **Transfer**: Move funds between two accounts; the sender also pays a 1% fee
//!   (truncated) and is subject to a 3,000,000 daily limit
//!
//! Every operation may carry an idempotency key. Repeating a key returns the
//! ledger row recorded the first time, without moving money again.

pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use config::{EngineConfig, LimitPolicy};
pub use core::{AccountService, AccountStore, LedgerStore, TransactionEngine};
pub use io::{write_accounts_csv, write_ledger_csv};
pub use types::{
    Account, AccountId, LedgerEntry, LedgerError, Page, PageRequest, TransactionCommand,
    TransactionStatus, TransactionType,
};
