//! Batch processing with account-based partitioning
//!
//! A batch of commands is split into groups that share no account and no
//! idempotency key. Groups run concurrently on the blocking thread pool; the
//! commands inside a group run one after another in input order.
//!
//! # Design
//!
//! Two commands end up in the same group when they touch a common account
//! (directly, or through a chain of transfers) or carry the same idempotency
//! key. Replaying a batch therefore yields the same final balances as running
//! it sequentially, while unrelated accounts proceed in parallel.

use std::collections::HashMap;

use super::engine::TransactionEngine;
use super::traits::{AccountStore, LedgerStore};
use crate::types::{LedgerEntry, LedgerError, TransactionCommand};
use tracing::error;

/// Result of processing a single command
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The command that was processed
    pub command: TransactionCommand,

    /// The committed (or replayed) ledger row, or the rejection
    pub result: Result<LedgerEntry, LedgerError>,
}

#[derive(Hash, PartialEq, Eq)]
enum Token<'a> {
    Account(&'a str),
    Key(&'a str),
}

/// Batch processor with account-based partitioning
pub struct BatchProcessor<A, L> {
    engine: TransactionEngine<A, L>,
}

impl<A, L> Clone for BatchProcessor<A, L> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<A, L> BatchProcessor<A, L>
where
    A: AccountStore + 'static,
    L: LedgerStore + 'static,
{
    pub fn new(engine: TransactionEngine<A, L>) -> Self {
        Self { engine }
    }

    /// Partition a batch into independent groups
    ///
    /// # Guarantees
    ///
    /// - Each command appears in exactly one group
    /// - Commands inside a group keep their input order
    /// - Groups are ordered by their first command's input position
    /// - No account or idempotency key appears in two groups
    pub fn partition(&self, batch: Vec<TransactionCommand>) -> Vec<Vec<TransactionCommand>> {
        let roots = {
            let mut parent: Vec<usize> = (0..batch.len()).collect();
            let mut first_seen: HashMap<Token<'_>, usize> = HashMap::new();

            for (i, command) in batch.iter().enumerate() {
                let tokens = command
                    .accounts()
                    .into_iter()
                    .map(Token::Account)
                    .chain(command.idempotency_key().map(Token::Key));

                for token in tokens {
                    match first_seen.get(&token) {
                        Some(&other) => union(&mut parent, i, other),
                        None => {
                            first_seen.insert(token, i);
                        }
                    }
                }
            }

            (0..batch.len())
                .map(|i| find(&mut parent, i))
                .collect::<Vec<_>>()
        };

        let mut group_of_root: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Vec<TransactionCommand>> = Vec::new();
        for (command, root) in batch.into_iter().zip(roots) {
            let group = *group_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[group].push(command);
        }

        groups
    }

    /// Run one group's commands sequentially
    ///
    /// Every command runs even if earlier ones fail; results keep input order.
    pub fn process_group(&self, commands: Vec<TransactionCommand>) -> Vec<ProcessingResult> {
        commands
            .into_iter()
            .map(|command| {
                let result = self.engine.execute(&command);
                ProcessingResult { command, result }
            })
            .collect()
    }

    /// Process a batch with groups running concurrently
    ///
    /// Results are returned group by group, in group order.
    pub async fn process_batch(&self, batch: Vec<TransactionCommand>) -> Vec<ProcessingResult> {
        let groups = self.partition(batch);

        // engine calls block on row locks, so they run off the async workers
        let mut tasks = Vec::with_capacity(groups.len());
        for group in groups {
            let processor = self.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                processor.process_group(group)
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(group_results) => results.extend(group_results),
                Err(e) => error!(error = %e, "batch group task failed"),
            }
        }

        results
    }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let (ra, rb) = (find(parent, a), find(parent, b));
    if ra != rb {
        // keep the earliest command as the root
        let (low, high) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[high] = low;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::types::Account;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn deposit(account: &str, amount: Decimal) -> TransactionCommand {
        TransactionCommand::Deposit {
            account: account.to_string(),
            amount,
            idempotency_key: None,
        }
    }

    fn transfer(from: &str, to: &str, amount: Decimal) -> TransactionCommand {
        TransactionCommand::Transfer {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            idempotency_key: None,
        }
    }

    fn processor(numbers: &[&str]) -> BatchProcessor<crate::core::InMemoryAccountStore, crate::core::InMemoryLedgerStore> {
        let engine = TransactionEngine::in_memory(&EngineConfig::default());
        for number in numbers {
            engine.accounts().save(Account::new(*number, "holder")).unwrap();
        }
        BatchProcessor::new(engine)
    }

    #[test]
    fn test_partition_joins_accounts_linked_by_transfers() {
        let processor = processor(&[]);
        let batch = vec![
            deposit("A", dec!(1)),
            deposit("C", dec!(1)),
            transfer("A", "B", dec!(1)),
            deposit("D", dec!(1)),
            transfer("B", "C", dec!(1)),
        ];

        let groups = processor.partition(batch);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 4);
        assert_eq!(groups[0][1], deposit("C", dec!(1)));
        assert_eq!(groups[1], vec![deposit("D", dec!(1))]);
    }

    #[test]
    fn test_partition_joins_shared_idempotency_keys() {
        let processor = processor(&[]);
        let keyed = |account: &str| TransactionCommand::Withdraw {
            account: account.to_string(),
            amount: dec!(1),
            idempotency_key: Some("same".to_string()),
        };

        let groups = processor.partition(vec![keyed("A"), keyed("B")]);

        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_partition_of_empty_batch() {
        assert!(processor(&[]).partition(Vec::new()).is_empty());
    }

    #[test]
    fn test_process_group_continues_after_failure() {
        let processor = processor(&["1111111111"]);

        let results = processor.process_group(vec![
            deposit("9999999999", dec!(5)),
            deposit("1111111111", dec!(5)),
        ]);

        assert!(results[0].result.is_err());
        assert!(results[1].result.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_process_batch_matches_sequential_outcome() {
        let processor = processor(&["1111111111", "2222222222", "3333333333"]);
        let batch = vec![
            deposit("1111111111", dec!(1000)),
            deposit("3333333333", dec!(50)),
            transfer("1111111111", "2222222222", dec!(500)),
            TransactionCommand::Withdraw {
                account: "2222222222".to_string(),
                amount: dec!(500),
                idempotency_key: None,
            },
        ];

        let results = processor.process_batch(batch).await;

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.result.is_ok()));
        let accounts = processor.engine.accounts();
        assert_eq!(accounts.find_by_number("1111111111").unwrap().balance, dec!(495));
        assert_eq!(accounts.find_by_number("2222222222").unwrap().balance, dec!(0));
        assert_eq!(accounts.find_by_number("3333333333").unwrap().balance, dec!(50));
    }
}
