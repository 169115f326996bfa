//! Transaction engine
//!
//! This module provides the TransactionEngine that executes deposits,
//! withdrawals and transfers against the account and ledger stores.
//!
//! Every operation runs the same fixed pipeline:
//! 1. amount validation (and the same-account check for transfers)
//! 2. idempotent replay of an already recorded key
//! 3. exclusive locks on the touched accounts, in account-number order, then
//!    the replay check again so a same-key request that committed while we
//!    waited is returned instead of re-run
//! 4. daily limit, fee and balance checks against the locked rows
//! 5. staged balance mutation and ledger rows, committed as one unit
//!
//! A failure at any step after locking drops the unit of work, which discards
//! the staged changes and releases the locks.

use super::account_store::InMemoryAccountStore;
use super::clock::{Clock, SystemClock};
use super::idempotency::IdempotencyGuard;
use super::ledger_store::InMemoryLedgerStore;
use super::limits::LimitEvaluator;
use super::traits::{AccountStore, LedgerStore};
use super::unit_of_work::UnitOfWork;
use crate::config::{EngineConfig, LimitPolicy};
use crate::types::{
    AccountId, LedgerEntry, LedgerError, NewLedgerEntry, Page, PageRequest, TransactionCommand,
    DEFAULT_PAGE_SIZE,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};

/// Money-movement engine
///
/// Cheap to clone; clones share the same stores. Safe to call from many
/// threads at once.
pub struct TransactionEngine<A = InMemoryAccountStore, L = InMemoryLedgerStore> {
    accounts: Arc<A>,
    ledger: Arc<L>,
    limits: Arc<LimitEvaluator<L>>,
    idempotency: Arc<IdempotencyGuard<L>>,
    clock: Arc<dyn Clock>,

    /// Page size for history reads that give none
    page_size: usize,
}

impl<A, L> Clone for TransactionEngine<A, L> {
    fn clone(&self) -> Self {
        Self {
            accounts: Arc::clone(&self.accounts),
            ledger: Arc::clone(&self.ledger),
            limits: Arc::clone(&self.limits),
            idempotency: Arc::clone(&self.idempotency),
            clock: Arc::clone(&self.clock),
            page_size: self.page_size,
        }
    }
}

impl TransactionEngine {
    /// Create an engine over fresh in-memory stores and the system clock
    pub fn in_memory(config: &EngineConfig) -> Self {
        Self::in_memory_with_clock(config, Arc::new(SystemClock))
    }

    pub fn in_memory_with_clock(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(InMemoryAccountStore::new(config.lock_timeout)),
            Arc::new(InMemoryLedgerStore::new()),
            clock,
            config.limits,
        )
        .with_page_size(config.default_page_size)
    }
}

impl<A: AccountStore, L: LedgerStore> TransactionEngine<A, L> {
    pub fn new(accounts: Arc<A>, ledger: Arc<L>, clock: Arc<dyn Clock>, policy: LimitPolicy) -> Self {
        Self {
            limits: Arc::new(LimitEvaluator::new(Arc::clone(&ledger), Arc::clone(&clock), policy)),
            idempotency: Arc::new(IdempotencyGuard::new(Arc::clone(&ledger))),
            accounts,
            ledger,
            clock,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Page size used when a history read gives none
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn accounts(&self) -> &Arc<A> {
        &self.accounts
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Run any command kind
    pub fn execute(&self, command: &TransactionCommand) -> Result<LedgerEntry, LedgerError> {
        match command {
            TransactionCommand::Deposit {
                account,
                amount,
                idempotency_key,
            } => self.deposit(account, *amount, idempotency_key.as_deref()),
            TransactionCommand::Withdraw {
                account,
                amount,
                idempotency_key,
            } => self.withdraw(account, *amount, idempotency_key.as_deref()),
            TransactionCommand::Transfer {
                from,
                to,
                amount,
                idempotency_key,
            } => self.transfer(from, to, *amount, idempotency_key.as_deref()),
        }
    }

    /// Credit funds to an account
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` if the amount is not positive or has more than two decimals
    /// * `AccountNotFound` if the account does not exist
    /// * `LockTimeout` if the account stays locked past the wait timeout
    #[instrument(level = "debug", skip(self))]
    pub fn deposit(
        &self,
        account_number: &str,
        amount: Decimal,
        idempotency_key: Option<&str>,
    ) -> Result<LedgerEntry, LedgerError> {
        validate_amount(amount)?;
        let key = validate_key(idempotency_key)?;
        if let Some(recorded) = self.idempotency.replay(key) {
            return Ok(recorded);
        }

        let mut uow = UnitOfWork::begin(&*self.accounts, &*self.ledger);
        let slot = uow.lock(account_number)?;
        if let Some(recorded) = self.idempotency.replay(key) {
            return Ok(recorded);
        }

        uow.account_mut(slot).credit(amount)?;
        let entry = NewLedgerEntry::deposit(uow.account(slot), amount, key);
        uow.record(entry);

        let stored = self.commit(uow)?;
        info!(
            account = account_number,
            %amount,
            balance = %stored.balance_after,
            entry_id = stored.id,
            "deposit committed"
        );
        Ok(stored)
    }

    /// Debit funds from an account
    ///
    /// The daily limit is checked before the balance.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount`, `AccountNotFound`, `LockTimeout` as for deposits
    /// * `DailyWithdrawalLimitExceeded` if today's withdrawals would pass the limit
    /// * `InsufficientBalance` if the balance does not cover the amount
    #[instrument(level = "debug", skip(self))]
    pub fn withdraw(
        &self,
        account_number: &str,
        amount: Decimal,
        idempotency_key: Option<&str>,
    ) -> Result<LedgerEntry, LedgerError> {
        validate_amount(amount)?;
        let key = validate_key(idempotency_key)?;
        if let Some(recorded) = self.idempotency.replay(key) {
            return Ok(recorded);
        }

        let mut uow = UnitOfWork::begin(&*self.accounts, &*self.ledger);
        let slot = uow.lock(account_number)?;
        if let Some(recorded) = self.idempotency.replay(key) {
            return Ok(recorded);
        }

        self.limits.check_withdrawal(uow.account(slot), amount)?;
        uow.account_mut(slot).debit(amount)?;
        let entry = NewLedgerEntry::withdrawal(uow.account(slot), amount, key);
        uow.record(entry);

        let stored = self.commit(uow)?;
        info!(
            account = account_number,
            %amount,
            balance = %stored.balance_after,
            entry_id = stored.id,
            "withdrawal committed"
        );
        Ok(stored)
    }

    /// Move funds between two accounts
    ///
    /// The sender pays `amount` plus the truncated fee; the receiver gets
    /// `amount`. Returns the sender-side row; the receiver-side row is appended
    /// in the same commit.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` if the amount is not positive or has more than two decimals
    /// * `SameAccountTransfer` if both numbers are equal, before any lookup
    /// * `AccountNotFound` if either account does not exist
    /// * `LockTimeout` if either account stays locked past the wait timeout
    /// * `DailyTransferLimitExceeded` if the sender's transfers today would pass the limit
    /// * `InsufficientBalance` if the sender cannot cover amount plus fee
    #[instrument(level = "debug", skip(self))]
    pub fn transfer(
        &self,
        from_number: &str,
        to_number: &str,
        amount: Decimal,
        idempotency_key: Option<&str>,
    ) -> Result<LedgerEntry, LedgerError> {
        validate_amount(amount)?;
        if from_number == to_number {
            return Err(LedgerError::same_account_transfer(from_number));
        }
        let key = validate_key(idempotency_key)?;
        if let Some(recorded) = self.idempotency.replay(key) {
            return Ok(recorded);
        }

        let mut uow = UnitOfWork::begin(&*self.accounts, &*self.ledger);
        let (from, to) = uow.lock_pair(from_number, to_number)?;
        if let Some(recorded) = self.idempotency.replay(key) {
            return Ok(recorded);
        }

        self.limits.check_transfer(uow.account(from), amount)?;
        let fee = self.limits.transfer_fee(uow.account(from), amount)?;
        let total = amount
            .checked_add(fee)
            .ok_or_else(|| LedgerError::arithmetic_overflow("transfer", from_number))?;

        uow.account_mut(from).debit(total)?;
        uow.account_mut(to).credit(amount)?;

        let out = NewLedgerEntry::transfer_out(uow.account(from), uow.account(to), amount, fee, key);
        let inn = NewLedgerEntry::transfer_in(uow.account(from), uow.account(to), amount);
        uow.record(out);
        uow.record(inn);

        let stored = self.commit(uow)?;
        info!(
            from = from_number,
            to = to_number,
            %amount,
            %fee,
            entry_id = stored.id,
            "transfer committed"
        );
        Ok(stored)
    }

    /// Ledger rows owned by an account, newest first
    ///
    /// `page` is 0-based; without a `size` the engine's configured page size
    /// applies.
    ///
    /// # Errors
    ///
    /// * `InvalidInput` if `size` is zero
    /// * `AccountNotFound` if no account has this id
    pub fn history_by_account(
        &self,
        account_id: AccountId,
        page: usize,
        size: Option<usize>,
    ) -> Result<Page<LedgerEntry>, LedgerError> {
        let request = self.page_request(page, size)?;
        let account = self
            .accounts
            .find_by_id(account_id)
            .ok_or_else(|| LedgerError::account_id_not_found(account_id))?;
        Ok(self.ledger.page_by_owner(account.id, request))
    }

    pub fn history_by_account_number(
        &self,
        account_number: &str,
        page: usize,
        size: Option<usize>,
    ) -> Result<Page<LedgerEntry>, LedgerError> {
        let request = self.page_request(page, size)?;
        let account = self
            .accounts
            .find_by_number(account_number)
            .ok_or_else(|| LedgerError::account_not_found(account_number))?;
        Ok(self.ledger.page_by_owner(account.id, request))
    }

    fn page_request(&self, page: usize, size: Option<usize>) -> Result<PageRequest, LedgerError> {
        PageRequest::new(page, size.unwrap_or(self.page_size))
    }

    /// Commit a unit and return its first row
    ///
    /// A key collision at append time means a concurrent request with the same
    /// key committed first; its row is returned instead.
    fn commit(&self, uow: UnitOfWork<'_, A, L>) -> Result<LedgerEntry, LedgerError> {
        let now = self.clock.now();
        match uow.commit(now) {
            Ok(entries) => entries
                .into_iter()
                .next()
                .ok_or_else(|| LedgerError::invalid_input("ledger", "operation recorded no entries")),
            Err(LedgerError::DuplicateIdempotencyKey { key }) => self
                .idempotency
                .replay(Some(&key))
                .ok_or_else(|| LedgerError::duplicate_idempotency_key(&key)),
            Err(e) => Err(e),
        }
    }
}

/// Reject non-positive amounts and sub-cent precision
fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO || amount.normalize().scale() > 2 {
        return Err(LedgerError::invalid_amount(amount));
    }
    Ok(())
}

fn validate_key(key: Option<&str>) -> Result<Option<&str>, LedgerError> {
    match key {
        Some(k) if k.trim().is_empty() => Err(LedgerError::invalid_input(
            "idempotency_key",
            "must not be blank",
        )),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::types::{Account, TransactionType};
    use chrono::DateTime;
    use rstest::{fixture, rstest};
    use rust_decimal_macros::dec;

    const ALICE: &str = "1111111111";
    const BOB: &str = "2222222222";

    struct Harness {
        engine: TransactionEngine,
        clock: Arc<ManualClock>,
    }

    impl Harness {
        fn balance(&self, number: &str) -> Decimal {
            self.engine.accounts().find_by_number(number).unwrap().balance
        }

        fn open(&self, number: &str, balance: Decimal) {
            self.engine
                .accounts()
                .save(Account::new(number, "holder"))
                .unwrap();
            if balance > Decimal::ZERO {
                self.engine.deposit(number, balance, None).unwrap();
            }
        }
    }

    #[fixture]
    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::new(
            DateTime::parse_from_rfc3339("2026-03-01T10:00:00+09:00").unwrap(),
        ));
        let engine = TransactionEngine::in_memory_with_clock(
            &EngineConfig::default(),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        Harness { engine, clock }
    }

    #[rstest]
    fn test_deposit_credits_and_records(harness: Harness) {
        harness.open(ALICE, dec!(0));

        let entry = harness.engine.deposit(ALICE, dec!(100000), Some("dep-1")).unwrap();

        assert_eq!(entry.tx_type, TransactionType::Deposit);
        assert_eq!(entry.balance_after, dec!(100000));
        assert_eq!(harness.balance(ALICE), dec!(100000));
        assert_eq!(harness.engine.ledger().len(), 1);
    }

    #[rstest]
    #[case::zero(dec!(0))]
    #[case::negative(dec!(-5))]
    #[case::sub_cent(dec!(1.001))]
    fn test_invalid_amounts_rejected(harness: Harness, #[case] amount: Decimal) {
        harness.open(ALICE, dec!(1000));

        assert_eq!(
            harness.engine.deposit(ALICE, amount, None),
            Err(LedgerError::invalid_amount(amount))
        );
        assert_eq!(
            harness.engine.withdraw(ALICE, amount, None),
            Err(LedgerError::invalid_amount(amount))
        );
        assert_eq!(harness.balance(ALICE), dec!(1000));
    }

    #[rstest]
    fn test_trailing_zeros_are_not_sub_cent(harness: Harness) {
        harness.open(ALICE, dec!(0));
        assert!(harness.engine.deposit(ALICE, dec!(10.5000), None).is_ok());
    }

    #[rstest]
    fn test_unknown_account(harness: Harness) {
        assert_eq!(
            harness.engine.deposit("9999999999", dec!(1), None),
            Err(LedgerError::account_not_found("9999999999"))
        );
    }

    #[rstest]
    fn test_withdraw_insufficient_balance_leaves_state(harness: Harness) {
        harness.open(ALICE, dec!(500));

        let result = harness.engine.withdraw(ALICE, dec!(500.01), None);

        assert_eq!(
            result,
            Err(LedgerError::insufficient_balance(ALICE, dec!(500), dec!(500.01)))
        );
        assert_eq!(harness.balance(ALICE), dec!(500));
        assert_eq!(harness.engine.ledger().len(), 1);
    }

    #[rstest]
    fn test_withdraw_limit_checked_before_balance(harness: Harness) {
        harness.open(ALICE, dec!(10));

        let result = harness.engine.withdraw(ALICE, dec!(1000000.01), None);

        assert!(matches!(
            result,
            Err(LedgerError::DailyWithdrawalLimitExceeded { .. })
        ));
    }

    #[rstest]
    fn test_daily_withdrawal_boundary(harness: Harness) {
        harness.open(ALICE, dec!(2000000));

        harness.engine.withdraw(ALICE, dec!(600000), None).unwrap();
        harness.engine.withdraw(ALICE, dec!(400000), None).unwrap();
        let over = harness.engine.withdraw(ALICE, dec!(0.01), None);

        assert!(matches!(
            over,
            Err(LedgerError::DailyWithdrawalLimitExceeded { .. })
        ));

        harness.clock.advance(chrono::Duration::days(1));
        assert!(harness.engine.withdraw(ALICE, dec!(1000000), None).is_ok());
        assert_eq!(harness.balance(ALICE), dec!(0));
    }

    #[rstest]
    fn test_transfer_moves_amount_and_fee(harness: Harness) {
        harness.open(ALICE, dec!(500000));
        harness.open(BOB, dec!(100000));

        let out = harness.engine.transfer(ALICE, BOB, dec!(100000), Some("t-1")).unwrap();

        assert_eq!(out.tx_type, TransactionType::TransferOut);
        assert_eq!(out.fee, Some(dec!(1000)));
        assert_eq!(out.balance_after, dec!(399000));
        assert_eq!(harness.balance(ALICE), dec!(399000));
        assert_eq!(harness.balance(BOB), dec!(200000));

        let rows = harness.engine.ledger().find_all();
        let inn = rows.last().unwrap();
        assert_eq!(inn.tx_type, TransactionType::TransferIn);
        assert_eq!(inn.id, out.id + 1);
        assert_eq!(inn.balance_after, dec!(200000));
        assert_eq!(inn.idempotency_key, None);
    }

    #[rstest]
    fn test_transfer_fee_counts_against_balance(harness: Harness) {
        harness.open(ALICE, dec!(100000));
        harness.open(BOB, dec!(0));

        let result = harness.engine.transfer(ALICE, BOB, dec!(100000), None);

        assert_eq!(
            result,
            Err(LedgerError::insufficient_balance(ALICE, dec!(100000), dec!(101000)))
        );
        assert_eq!(harness.balance(ALICE), dec!(100000));
        assert_eq!(harness.balance(BOB), dec!(0));
    }

    #[rstest]
    fn test_transfer_to_self_rejected_before_lookup(harness: Harness) {
        let result = harness.engine.transfer("9999999999", "9999999999", dec!(1), None);

        assert_eq!(result, Err(LedgerError::same_account_transfer("9999999999")));
    }

    #[rstest]
    fn test_transfer_to_missing_account_rolls_back(harness: Harness) {
        harness.open(ALICE, dec!(1000));

        let result = harness.engine.transfer(ALICE, "9999999999", dec!(10), None);

        assert_eq!(result, Err(LedgerError::account_not_found("9999999999")));
        assert_eq!(harness.balance(ALICE), dec!(1000));
    }

    #[rstest]
    fn test_transfer_limit(harness: Harness) {
        harness.open(ALICE, dec!(10000000));
        harness.open(BOB, dec!(0));

        harness.engine.transfer(ALICE, BOB, dec!(3000000), None).unwrap();
        let result = harness.engine.transfer(ALICE, BOB, dec!(1), None);

        assert!(matches!(
            result,
            Err(LedgerError::DailyTransferLimitExceeded { .. })
        ));
    }

    #[rstest]
    fn test_repeated_key_replays_first_result(harness: Harness) {
        harness.open(ALICE, dec!(1000000));

        let first = harness.engine.withdraw(ALICE, dec!(1000), Some("w-1")).unwrap();
        let second = harness.engine.withdraw(ALICE, dec!(1000), Some("w-1")).unwrap();

        assert_eq!(first, second);
        assert_eq!(harness.balance(ALICE), dec!(999000));
    }

    #[rstest]
    fn test_blank_key_rejected(harness: Harness) {
        harness.open(ALICE, dec!(0));
        assert!(matches!(
            harness.engine.deposit(ALICE, dec!(1), Some("  ")),
            Err(LedgerError::InvalidInput { .. })
        ));
    }

    #[rstest]
    fn test_execute_dispatches_commands(harness: Harness) {
        harness.open(ALICE, dec!(0));
        harness.open(BOB, dec!(0));

        let commands = [
            TransactionCommand::Deposit {
                account: ALICE.to_string(),
                amount: dec!(5000),
                idempotency_key: None,
            },
            TransactionCommand::Transfer {
                from: ALICE.to_string(),
                to: BOB.to_string(),
                amount: dec!(1000),
                idempotency_key: None,
            },
            TransactionCommand::Withdraw {
                account: BOB.to_string(),
                amount: dec!(500),
                idempotency_key: None,
            },
        ];
        for command in &commands {
            harness.engine.execute(command).unwrap();
        }

        assert_eq!(harness.balance(ALICE), dec!(3990));
        assert_eq!(harness.balance(BOB), dec!(500));
    }

    #[rstest]
    fn test_history_pages_newest_first(harness: Harness) {
        harness.open(ALICE, dec!(0));
        for i in 1..=25 {
            harness.engine.deposit(ALICE, Decimal::from(i), None).unwrap();
            harness.clock.advance(chrono::Duration::seconds(1));
        }
        let id = harness.engine.accounts().find_by_number(ALICE).unwrap().id;

        let first = harness.engine.history_by_account(id, 0, None).unwrap();
        let second = harness
            .engine
            .history_by_account_number(ALICE, 1, Some(20))
            .unwrap();

        assert_eq!(first.total_elements, 25);
        assert_eq!(first.content.len(), 20);
        assert_eq!(first.content[0].amount, dec!(25));
        assert_eq!(second.content.len(), 5);
        assert_eq!(second.content[4].amount, dec!(1));
    }

    #[rstest]
    fn test_history_of_unknown_account(harness: Harness) {
        assert_eq!(
            harness.engine.history_by_account(42, 0, None),
            Err(LedgerError::account_id_not_found(42))
        );
    }

    #[rstest]
    fn test_history_uses_configured_page_size() {
        let config = EngineConfig {
            default_page_size: 3,
            ..EngineConfig::default()
        };
        let engine = TransactionEngine::in_memory(&config);
        engine.accounts().save(Account::new(ALICE, "holder")).unwrap();
        for i in 1..=5 {
            engine.deposit(ALICE, Decimal::from(i), None).unwrap();
        }

        let page = engine.history_by_account_number(ALICE, 0, None).unwrap();
        assert_eq!(page.content.len(), 3);
        assert_eq!(page.size(), 3);
        assert_eq!(page.total_pages(), 2);

        let explicit = engine.history_by_account_number(ALICE, 0, Some(10)).unwrap();
        assert_eq!(explicit.content.len(), 5);

        assert!(matches!(
            engine.history_by_account_number(ALICE, 0, Some(0)),
            Err(LedgerError::InvalidInput { .. })
        ));
    }
}
