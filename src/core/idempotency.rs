//! Idempotent replay of repeated requests

use super::traits::LedgerStore;
use crate::types::LedgerEntry;
use std::sync::Arc;
use tracing::debug;

/// Looks up the row an earlier request with the same key produced
///
/// The pre-check is a fast path only. Two requests with the same key can both
/// miss it; the ledger's insert-time uniqueness check then rejects the loser,
/// which replays the winner's row through [`IdempotencyGuard::replay`] again.
pub struct IdempotencyGuard<L> {
    ledger: Arc<L>,
}

impl<L: LedgerStore> IdempotencyGuard<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Stored row for `key`, if any request with this key has committed
    ///
    /// The row is returned as recorded, whatever operation kind produced it.
    pub fn replay(&self, key: Option<&str>) -> Option<LedgerEntry> {
        let key = key?;
        let entry = self.ledger.find_by_idempotency_key(key)?;
        debug!(key, entry_id = entry.id, "replaying recorded result");
        Some(entry)
    }
}
