//! Core business logic module
//!
//! This module contains the ledger engine components:
//! - `traits` - Account and ledger store contracts
//! - `account_store` / `ledger_store` - In-memory store implementations
//! - `clock` - Injectable wall clock
//! - `limits` - Daily limit evaluation and transfer fees
//! - `idempotency` - Replay of already recorded requests
//! - `unit_of_work` - Lock-holding transactional scope for one operation
//! - `engine` - Deposit, withdrawal and transfer orchestration
//! - `account_service` - Account provisioning
//! - `batch_processor` - Concurrent replay of command batches

pub mod account_service;
pub mod account_store;
pub mod batch_processor;
pub mod clock;
pub mod engine;
pub mod idempotency;
pub mod ledger_store;
pub mod limits;
pub mod traits;
pub mod unit_of_work;

pub use account_service::AccountService;
pub use account_store::{AccountLock, InMemoryAccountStore};
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::TransactionEngine;
pub use idempotency::IdempotencyGuard;
pub use ledger_store::InMemoryLedgerStore;
pub use limits::{transfer_fee, DailyWindow, LimitEvaluator};
pub use traits::{AccountStore, LedgerStore};
pub use unit_of_work::UnitOfWork;
