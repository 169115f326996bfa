//! In-memory append-only ledger
//!
//! All rows live in one vector guarded by a `parking_lot::RwLock`, with side
//! indexes by owner and by idempotency key. Appends take the write lock, so
//! the key uniqueness check and the insert happen as one step.

use super::traits::LedgerStore;
use crate::types::{
    AccountId, EntryId, LedgerEntry, LedgerError, NewLedgerEntry, Page, PageRequest,
    TransactionStatus, TransactionType,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Default)]
struct LedgerLog {
    entries: Vec<LedgerEntry>,

    /// Positions in `entries` per owner account, in append order
    by_owner: HashMap<AccountId, Vec<usize>>,

    /// Position in `entries` per idempotency key
    by_key: HashMap<String, usize>,
}

impl LedgerLog {
    fn next_id(&self) -> EntryId {
        self.entries.len() as EntryId + 1
    }

    fn check_keys(&self, entries: &[NewLedgerEntry]) -> Result<(), LedgerError> {
        let mut batch_keys = HashSet::new();
        for key in entries.iter().filter_map(|e| e.idempotency_key.as_deref()) {
            if self.by_key.contains_key(key) || !batch_keys.insert(key) {
                return Err(LedgerError::duplicate_idempotency_key(key));
            }
        }
        Ok(())
    }

    fn push(&mut self, entry: LedgerEntry) {
        let position = self.entries.len();
        self.by_owner.entry(entry.owner.id).or_default().push(position);
        if let Some(key) = &entry.idempotency_key {
            self.by_key.insert(key.clone(), position);
        }
        self.entries.push(entry);
    }
}

/// Thread-safe ledger store
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    log: RwLock<LedgerLog>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.log.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append(&self, entry: NewLedgerEntry, created_at: DateTime<Utc>) -> Result<LedgerEntry, LedgerError> {
        let mut log = self.log.write();
        log.check_keys(std::slice::from_ref(&entry))?;

        let stored = entry.into_entry(log.next_id(), created_at);
        log.push(stored.clone());
        Ok(stored)
    }

    fn append_all(
        &self,
        entries: Vec<NewLedgerEntry>,
        created_at: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut log = self.log.write();
        log.check_keys(&entries)?;

        let mut stored = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = entry.into_entry(log.next_id(), created_at);
            log.push(entry.clone());
            stored.push(entry);
        }

        debug!(count = stored.len(), "ledger entries appended");
        Ok(stored)
    }

    fn find_by_idempotency_key(&self, key: &str) -> Option<LedgerEntry> {
        let log = self.log.read();
        log.by_key
            .get(key)
            .map(|&position| log.entries[position].clone())
    }

    fn sum_amount(
        &self,
        owner: AccountId,
        tx_type: TransactionType,
        status: TransactionStatus,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Decimal {
        let log = self.log.read();
        let Some(positions) = log.by_owner.get(&owner) else {
            return Decimal::ZERO;
        };

        positions
            .iter()
            .map(|&position| &log.entries[position])
            .filter(|entry| {
                entry.tx_type == tx_type
                    && entry.status == status
                    && entry.created_at >= start
                    && entry.created_at < end
            })
            .map(|entry| entry.amount)
            .sum()
    }

    fn page_by_owner(&self, owner: AccountId, request: PageRequest) -> Page<LedgerEntry> {
        let log = self.log.read();
        let mut owned: Vec<&LedgerEntry> = log
            .by_owner
            .get(&owner)
            .map(|positions| positions.iter().map(|&p| &log.entries[p]).collect())
            .unwrap_or_default();

        owned.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = owned.len();
        let content = owned
            .into_iter()
            .skip(request.offset())
            .take(request.size())
            .cloned()
            .collect();

        Page::new(content, request, total)
    }

    fn find_all(&self) -> Vec<LedgerEntry> {
        self.log.read().entries.clone()
    }
}
