//! Daily limit evaluation and transfer fees
//!
//! Daily totals are never cached: every check sums the owner's ledger rows in
//! the current local day. Callers hold the account's row lock while checking,
//! so no other operation on that account can commit between the sum and the
//! mutation it guards.

use super::clock::Clock;
use super::traits::LedgerStore;
use crate::config::LimitPolicy;
use crate::types::{Account, LedgerError, TransactionStatus, TransactionType};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Half-open `[start, end)` span covering one local calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DailyWindow {
    /// Window of the local calendar day that contains `at`
    ///
    /// Both midnights are resolved in `at`'s timezone, so a day that crosses
    /// a DST transition is 23 or 25 hours long.
    pub fn containing<Tz: TimeZone>(at: DateTime<Tz>) -> Self {
        let tz = at.timezone();
        let today = at.date_naive();
        let start = local_midnight(&tz, today);
        let end = today
            .succ_opt()
            .map(|tomorrow| local_midnight(&tz, tomorrow))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// First instant of `date` in `tz`
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        // midnight fell into a DST gap: the day starts where the gap opens
        .or_else(|| {
            tz.from_local_datetime(&(midnight - Duration::hours(1)))
                .earliest()
                .map(|before| before + Duration::hours(1))
        })
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

/// Transfer fee: `amount * rate`, truncated toward zero to a whole unit
///
/// Returns `None` if the product cannot be represented.
pub fn transfer_fee(amount: Decimal, rate: Decimal) -> Option<Decimal> {
    amount.checked_mul(rate).map(|fee| fee.trunc())
}

/// Checks requests against the per-account daily limits
pub struct LimitEvaluator<L> {
    ledger: Arc<L>,
    clock: Arc<dyn Clock>,
    policy: LimitPolicy,
}

impl<L: LedgerStore> LimitEvaluator<L> {
    pub fn new(ledger: Arc<L>, clock: Arc<dyn Clock>, policy: LimitPolicy) -> Self {
        Self {
            ledger,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &LimitPolicy {
        &self.policy
    }

    /// Current local day, recomputed on every call
    pub fn window(&self) -> DailyWindow {
        self.clock.today()
    }

    /// Sum of the account's successful rows of `tx_type` in the current day
    pub fn daily_total(&self, account: &Account, tx_type: TransactionType) -> Decimal {
        let window = self.window();
        self.ledger.sum_amount(
            account.id,
            tx_type,
            TransactionStatus::Success,
            window.start,
            window.end,
        )
    }

    /// # Errors
    ///
    /// `DailyWithdrawalLimitExceeded` if today's withdrawals plus `amount` would exceed the limit.
    pub fn check_withdrawal(&self, account: &Account, amount: Decimal) -> Result<(), LedgerError> {
        let used = self.daily_total(account, TransactionType::Withdrawal);
        let limit = self.policy.withdrawal_daily_limit;
        if exceeds(used, amount, limit) {
            return Err(LedgerError::daily_withdrawal_limit_exceeded(
                &account.number,
                used,
                amount,
                limit,
            ));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `DailyTransferLimitExceeded` if today's outgoing transfers plus `amount` would exceed the limit.
    /// The fee does not count toward the limit.
    pub fn check_transfer(&self, account: &Account, amount: Decimal) -> Result<(), LedgerError> {
        let used = self.daily_total(account, TransactionType::TransferOut);
        let limit = self.policy.transfer_daily_limit;
        if exceeds(used, amount, limit) {
            return Err(LedgerError::daily_transfer_limit_exceeded(
                &account.number,
                used,
                amount,
                limit,
            ));
        }
        Ok(())
    }

    /// Fee the sender pays on top of `amount`
    pub fn transfer_fee(&self, sender: &Account, amount: Decimal) -> Result<Decimal, LedgerError> {
        transfer_fee(amount, self.policy.transfer_fee_rate)
            .ok_or_else(|| LedgerError::arithmetic_overflow("transfer fee", &sender.number))
    }
}

fn exceeds(used: Decimal, amount: Decimal, limit: Decimal) -> bool {
    // an unrepresentable total is certainly over any limit
    used.checked_add(amount).is_none_or(|total| total > limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::ledger_store::InMemoryLedgerStore;
    use crate::types::NewLedgerEntry;
    use chrono::FixedOffset;
    use chrono_tz::America::New_York;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    fn account() -> Account {
        let mut account = Account::new("1111111111", "Alice");
        account.id = 1;
        account
    }

    #[rstest]
    #[case(dec!(12345), dec!(123))]
    #[case(dec!(100000), dec!(1000))]
    #[case(dec!(1), dec!(0))]
    #[case(dec!(199.99), dec!(1))]
    #[case(dec!(99.99), dec!(0))]
    fn test_transfer_fee_truncates(#[case] amount: Decimal, #[case] fee: Decimal) {
        assert_eq!(transfer_fee(amount, dec!(0.01)).unwrap(), fee);
    }

    #[test]
    fn test_window_uses_local_midnight() {
        let window = DailyWindow::containing(at("2026-03-01T08:30:00+09:00"));

        assert_eq!(window.start.to_rfc3339(), "2026-02-28T15:00:00+00:00");
        assert_eq!(window.end.to_rfc3339(), "2026-03-01T15:00:00+00:00");
        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));
    }

    #[rstest]
    #[case::spring_forward((2026, 3, 8), "2026-03-08T05:00:00+00:00", "2026-03-09T04:00:00+00:00", 23)]
    #[case::fall_back((2026, 11, 1), "2026-11-01T04:00:00+00:00", "2026-11-02T05:00:00+00:00", 25)]
    #[case::plain_day((2026, 6, 15), "2026-06-15T04:00:00+00:00", "2026-06-16T04:00:00+00:00", 24)]
    fn test_window_follows_dst(
        #[case] date: (i32, u32, u32),
        #[case] start: &str,
        #[case] end: &str,
        #[case] hours: i64,
    ) {
        let (year, month, day) = date;
        let noon = New_York.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap();

        let window = DailyWindow::containing(noon);

        assert_eq!(window.start.to_rfc3339(), start);
        assert_eq!(window.end.to_rfc3339(), end);
        assert_eq!(window.end - window.start, Duration::hours(hours));
    }

    #[test]
    fn test_previous_evening_not_counted_on_dst_day() {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let clock = Arc::new(ManualClock::new(
            New_York.with_ymd_and_hms(2026, 3, 7, 23, 30, 0).unwrap(),
        ));
        let evaluator = LimitEvaluator::new(
            Arc::clone(&ledger),
            Arc::clone(&clock) as Arc<dyn Clock>,
            LimitPolicy::default(),
        );
        let account = account();

        ledger
            .append(
                NewLedgerEntry::withdrawal(&account, dec!(1000000), None),
                clock.now(),
            )
            .unwrap();
        clock.set(New_York.with_ymd_and_hms(2026, 3, 8, 10, 0, 0).unwrap());

        assert_eq!(evaluator.daily_total(&account, TransactionType::Withdrawal), Decimal::ZERO);
        assert!(evaluator.check_withdrawal(&account, dec!(1000000)).is_ok());
    }

    #[test]
    fn test_withdrawal_limit_is_inclusive() {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let clock = Arc::new(ManualClock::new(at("2026-03-01T12:00:00+00:00")));
        let evaluator = LimitEvaluator::new(Arc::clone(&ledger), clock, LimitPolicy::default());
        let account = account();

        ledger
            .append(
                NewLedgerEntry::withdrawal(&account, dec!(600000), None),
                evaluator.window().start,
            )
            .unwrap();

        assert!(evaluator.check_withdrawal(&account, dec!(400000)).is_ok());
        assert_eq!(
            evaluator.check_withdrawal(&account, dec!(400000.01)),
            Err(LedgerError::daily_withdrawal_limit_exceeded(
                "1111111111",
                dec!(600000),
                dec!(400000.01),
                dec!(1000000)
            ))
        );
    }

    #[test]
    fn test_limit_resets_after_midnight() {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let clock = Arc::new(ManualClock::new(at("2026-03-01T23:59:59+09:00")));
        let evaluator = LimitEvaluator::new(
            Arc::clone(&ledger),
            Arc::clone(&clock) as Arc<dyn Clock>,
            LimitPolicy::default(),
        );
        let account = account();

        ledger
            .append(
                NewLedgerEntry::withdrawal(&account, dec!(1000000), None),
                clock.now(),
            )
            .unwrap();
        assert!(evaluator.check_withdrawal(&account, dec!(1)).is_err());

        clock.advance(Duration::seconds(1));

        assert_eq!(evaluator.daily_total(&account, TransactionType::Withdrawal), Decimal::ZERO);
        assert!(evaluator.check_withdrawal(&account, dec!(1000000)).is_ok());
    }

    #[test]
    fn test_transfer_limit_counts_only_outgoing_rows() {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let clock = Arc::new(ManualClock::new(at("2026-03-01T12:00:00+00:00")));
        let evaluator = LimitEvaluator::new(Arc::clone(&ledger), clock, LimitPolicy::default());
        let account = account();
        let mut other = Account::new("2222222222", "Bob");
        other.id = 2;
        let now = evaluator.window().start;

        ledger
            .append(NewLedgerEntry::transfer_out(&account, &other, dec!(2500000), dec!(25000), None), now)
            .unwrap();
        ledger
            .append(NewLedgerEntry::transfer_in(&other, &account, dec!(2500000)), now)
            .unwrap();

        assert!(evaluator.check_transfer(&account, dec!(500000)).is_ok());
        assert!(matches!(
            evaluator.check_transfer(&account, dec!(500001)),
            Err(LedgerError::DailyTransferLimitExceeded { .. })
        ));
    }
}
