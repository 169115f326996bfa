//! CSV format handling for command records, opening accounts and output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CommandRecord / AccountRecord structures for deserialization
//! - Conversion from CSV records to domain types
//! - Account and ledger output serialization
//!
//! Conversion functions are pure (no I/O) for easy testing.

use crate::types::{Account, LedgerEntry, LedgerError, TransactionCommand};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// Command CSV row
///
/// Columns: `type, account, counterparty, amount, key`. `counterparty` is the
/// receiving account of a transfer and empty otherwise; `key` is the optional
/// idempotency key.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CommandRecord {
    #[serde(rename = "type")]
    pub tx_type: String,
    pub account: String,
    pub counterparty: Option<String>,
    pub amount: Option<String>,
    pub key: Option<String>,
}

/// Opening account CSV row
///
/// Columns: `number, holder, balance`. A non-empty balance is applied as an
/// opening deposit.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AccountRecord {
    pub number: String,
    pub holder: String,
    pub balance: Option<String>,
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.trim().is_empty())
}

/// Parse a decimal amount column
pub fn parse_amount(field: &str, raw: &str) -> Result<Decimal, LedgerError> {
    Decimal::from_str(raw.trim())
        .map_err(|_| LedgerError::invalid_input(field, format!("'{}' is not a decimal amount", raw)))
}

/// Convert a CommandRecord to a TransactionCommand
///
/// The type column is case-insensitive. `withdrawal` is accepted as an alias
/// of `withdraw`.
///
/// # Errors
///
/// `InvalidInput` if the type is unknown, the amount is missing or malformed,
/// or a transfer has no counterparty.
pub fn convert_command_record(record: CommandRecord) -> Result<TransactionCommand, LedgerError> {
    let amount = non_empty(record.amount)
        .ok_or_else(|| LedgerError::invalid_input("amount", "amount is required"))?;
    let amount = parse_amount("amount", &amount)?;
    let idempotency_key = non_empty(record.key);

    match record.tx_type.to_lowercase().as_str() {
        "deposit" => Ok(TransactionCommand::Deposit {
            account: record.account,
            amount,
            idempotency_key,
        }),
        "withdraw" | "withdrawal" => Ok(TransactionCommand::Withdraw {
            account: record.account,
            amount,
            idempotency_key,
        }),
        "transfer" => {
            let to = non_empty(record.counterparty).ok_or_else(|| {
                LedgerError::invalid_input("counterparty", "transfer requires a counterparty")
            })?;
            Ok(TransactionCommand::Transfer {
                from: record.account,
                to,
                amount,
                idempotency_key,
            })
        }
        other => Err(LedgerError::invalid_input(
            "type",
            format!("unknown command type '{}'", other),
        )),
    }
}

/// Opening balance of an account row, zero when the column is empty
pub fn opening_balance(record: &AccountRecord) -> Result<Decimal, LedgerError> {
    match non_empty(record.balance.clone()) {
        Some(raw) => parse_amount("balance", &raw),
        None => Ok(Decimal::ZERO),
    }
}

/// Write account states to CSV format
///
/// Columns: `number, holder, balance, version`, sorted by account number,
/// balances with two decimals.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["number", "holder", "balance", "version"])?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by(|a, b| a.number.cmp(&b.number));

    for account in sorted_accounts {
        writer.write_record(&[
            account.number,
            account.holder,
            format!("{:.2}", account.balance),
            account.version.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write ledger rows to CSV format, in the given order
///
/// Columns: `id, type, owner, from, to, amount, fee, balance_after, status, key`.
/// Account columns hold account numbers; absent values are empty.
pub fn write_ledger_csv(entries: &[LedgerEntry], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record([
        "id",
        "type",
        "owner",
        "from",
        "to",
        "amount",
        "fee",
        "balance_after",
        "status",
        "key",
    ])?;

    for entry in entries {
        writer.write_record(&[
            entry.id.to_string(),
            entry.tx_type.to_string(),
            entry.owner.number.clone(),
            entry.from_account.as_ref().map(|a| a.number.clone()).unwrap_or_default(),
            entry.to_account.as_ref().map(|a| a.number.clone()).unwrap_or_default(),
            format!("{:.2}", entry.amount),
            entry.fee.map(|fee| format!("{:.2}", fee)).unwrap_or_default(),
            format!("{:.2}", entry.balance_after),
            entry.status.to_string(),
            entry.idempotency_key.clone().unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
