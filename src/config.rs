//! Engine configuration.

use crate::types::{LedgerError, DEFAULT_PAGE_SIZE};
use rust_decimal::Decimal;
use std::time::Duration;

/// Maximum total withdrawn per account per local calendar day.
pub const WITHDRAWAL_DAILY_LIMIT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Maximum total transferred out per account per local calendar day.
pub const TRANSFER_DAILY_LIMIT: Decimal = Decimal::from_parts(3_000_000, 0, 0, false, 0);

/// Transfer fee rate (1%), applied before truncation.
pub const TRANSFER_FEE_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Default wait for an account row lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Daily limits and fee rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitPolicy {
    pub withdrawal_daily_limit: Decimal,
    pub transfer_daily_limit: Decimal,
    pub transfer_fee_rate: Decimal,
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self {
            withdrawal_daily_limit: WITHDRAWAL_DAILY_LIMIT,
            transfer_daily_limit: TRANSFER_DAILY_LIMIT,
            transfer_fee_rate: TRANSFER_FEE_RATE,
        }
    }
}

/// Main engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long an operation waits for an account lock before failing.
    pub lock_timeout: Duration,
    /// Limits and fee rate.
    pub limits: LimitPolicy,
    /// Page size for history reads without an explicit size.
    pub default_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            limits: LimitPolicy::default(),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(timeout) = std::env::var("LEDGER_LOCK_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                config.lock_timeout = Duration::from_millis(ms);
            }
        }

        if let Ok(size) = std::env::var("LEDGER_PAGE_SIZE") {
            if let Ok(size) = size.parse() {
                config.default_page_size = size;
            }
        }

        config
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.lock_timeout.is_zero() {
            return Err(LedgerError::invalid_input(
                "lock_timeout",
                "lock timeout must be greater than zero",
            ));
        }

        if self.default_page_size == 0 {
            return Err(LedgerError::invalid_input(
                "default_page_size",
                "page size must be at least 1",
            ));
        }

        let limits = &self.limits;
        if limits.withdrawal_daily_limit <= Decimal::ZERO || limits.transfer_daily_limit <= Decimal::ZERO {
            return Err(LedgerError::invalid_input(
                "limits",
                "daily limits must be positive",
            ));
        }

        if limits.transfer_fee_rate < Decimal::ZERO || limits.transfer_fee_rate >= Decimal::ONE {
            return Err(LedgerError::invalid_input(
                "transfer_fee_rate",
                "fee rate must be in [0, 1)",
            ));
        }

        Ok(())
    }
}
