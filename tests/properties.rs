//! Property tests for fees and balance invariants

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use rust_ledger_engine::core::transfer_fee;
use rust_ledger_engine::{
    AccountService, AccountStore, EngineConfig, LedgerStore, TransactionCommand, TransactionEngine,
    TransactionType,
};
use std::sync::Arc;

const ACCOUNTS: [&str; 3] = ["1111111111", "2222222222", "3333333333"];

/// Amount in cents, 0.01 ..= 10,000,000.00
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..=1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn command() -> impl Strategy<Value = TransactionCommand> {
    let account = prop::sample::select(ACCOUNTS.to_vec()).prop_map(str::to_string);
    prop_oneof![
        (account.clone(), amount()).prop_map(|(account, amount)| TransactionCommand::Deposit {
            account,
            amount,
            idempotency_key: None,
        }),
        (account.clone(), amount()).prop_map(|(account, amount)| TransactionCommand::Withdraw {
            account,
            amount,
            idempotency_key: None,
        }),
        (account.clone(), account, amount()).prop_map(|(from, to, amount)| {
            TransactionCommand::Transfer {
                from,
                to,
                amount,
                idempotency_key: None,
            }
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    /// Property: the fee is the whole-unit part of 1% of the amount.
    #[test]
    fn fee_is_truncated_one_percent(amount in amount()) {
        let fee = transfer_fee(amount, dec!(0.01)).unwrap();
        let exact = amount * dec!(0.01);

        prop_assert_eq!(fee.fract(), Decimal::ZERO);
        prop_assert!(fee <= exact);
        prop_assert!(exact - fee < Decimal::ONE);
    }

    /// Property: for any command sequence, no balance goes negative and
    /// deposits minus withdrawals minus fees equals the total held.
    #[test]
    fn balances_stay_non_negative_and_conserved(
        commands in prop::collection::vec(command(), 1..40)
    ) {
        let engine = TransactionEngine::in_memory(&EngineConfig::default());
        let service = AccountService::new(Arc::clone(engine.accounts()));
        for number in ACCOUNTS {
            service.create_account(number, "holder").unwrap();
        }

        for command in &commands {
            let _ = engine.execute(command);
        }

        let held: Decimal = engine.accounts().find_all().iter().map(|a| a.balance).sum();
        for account in engine.accounts().find_all() {
            prop_assert!(account.balance >= Decimal::ZERO);
        }

        let mut expected = Decimal::ZERO;
        for entry in engine.ledger().find_all() {
            match entry.tx_type {
                TransactionType::Deposit => expected += entry.amount,
                TransactionType::Withdrawal => expected -= entry.amount,
                TransactionType::TransferOut => {
                    expected -= entry.fee.unwrap_or_default()
                }
                TransactionType::TransferIn => {}
            }
        }
        prop_assert_eq!(held, expected);
    }
}
