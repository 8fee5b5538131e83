// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Append-only transaction journal.
//!
//! [`Journal`] is the storage seam for journal entries; [`InMemoryJournal`]
//! is the thread-safe implementation used by the server and the tests.

use crate::base::{AccountId, TransactionId};
use crate::error::LedgerError;
use crate::transaction::Transaction;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::cmp::Reverse;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Durable, append-only record of completed transfers.
pub trait Journal: Send + Sync {
    /// Reserves the next identifier. Identifiers only ever increase.
    fn next_id(&self) -> TransactionId;

    /// Appends an entry.
    ///
    /// # Errors
    ///
    /// [`LedgerError::DuplicateTransaction`] if the id is already present;
    /// [`LedgerError::Storage`] on infrastructure failure.
    fn append(&self, transaction: Transaction) -> Result<TransactionId, LedgerError>;

    fn get(&self, id: TransactionId) -> Option<Arc<Transaction>>;

    /// Entries where `account` is sender or receiver, newest first.
    ///
    /// Ordered by creation time descending, ties broken by id descending.
    fn list_for_account(
        &self,
        account: AccountId,
        limit: usize,
        offset: usize,
    ) -> Vec<Arc<Transaction>>;

    fn count_for_account(&self, account: AccountId) -> usize;

    /// Total number of entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A thread-safe journal with duplicate detection.
///
/// Entries are kept in a [`DashMap`] by id, with a per-account index of the
/// ids each account took part in.
#[derive(Debug)]
pub struct InMemoryJournal {
    entries: DashMap<TransactionId, Arc<Transaction>>,
    by_account: DashMap<AccountId, Vec<TransactionId>>,
    sequence: AtomicU64,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            by_account: DashMap::new(),
            sequence: AtomicU64::new(1),
        }
    }

    fn index(&self, account: AccountId, id: TransactionId) {
        self.by_account.entry(account).or_default().push(id);
    }
}

impl Default for InMemoryJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl Journal for InMemoryJournal {
    fn next_id(&self) -> TransactionId {
        TransactionId(self.sequence.fetch_add(1, Ordering::SeqCst))
    }

    fn append(&self, transaction: Transaction) -> Result<TransactionId, LedgerError> {
        let id = transaction.id();
        let sender = transaction.sender_id();
        let receiver = transaction.receiver_id();

        // Use entry API for atomic check-and-insert to prevent race conditions
        match self.entries.entry(id) {
            Entry::Occupied(_) => return Err(LedgerError::DuplicateTransaction),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(transaction));
            }
        }

        self.index(sender, id);
        if receiver != sender {
            self.index(receiver, id);
        }
        Ok(id)
    }

    fn get(&self, id: TransactionId) -> Option<Arc<Transaction>> {
        self.entries.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    fn list_for_account(
        &self,
        account: AccountId,
        limit: usize,
        offset: usize,
    ) -> Vec<Arc<Transaction>> {
        let ids = match self.by_account.get(&account) {
            Some(ids) => ids.clone(),
            None => return Vec::new(),
        };

        let mut transactions: Vec<Arc<Transaction>> =
            ids.into_iter().filter_map(|id| self.get(id)).collect();
        transactions.sort_by_key(|tx| Reverse((tx.created_at(), tx.id())));
        transactions.into_iter().skip(offset).take(limit).collect()
    }

    fn count_for_account(&self, account: AccountId) -> usize {
        self.by_account.get(&account).map_or(0, |ids| ids.len())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Parties;
    use rust_decimal_macros::dec;

    fn transfer(journal: &InMemoryJournal, from: AccountId, to: AccountId) -> Transaction {
        Transaction::completed_transfer(
            journal.next_id(),
            Parties {
                sender_id: from,
                sender_email: "from@example.com",
                receiver_id: to,
                receiver_email: "to@example.com",
            },
            dec!(1.00),
        )
    }

    #[test]
    fn ids_increase() {
        let journal = InMemoryJournal::new();
        let first = journal.next_id();
        let second = journal.next_id();
        assert!(second > first);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let journal = InMemoryJournal::new();
        let (a, b) = (AccountId::new(), AccountId::new());
        let tx = transfer(&journal, a, b);
        journal.append(tx.clone()).unwrap();
        assert_eq!(journal.append(tx), Err(LedgerError::DuplicateTransaction));
        assert_eq!(journal.len(), 1);
        assert_eq!(journal.count_for_account(a), 1);
    }

    #[test]
    fn lists_newest_first_with_offset() {
        let journal = InMemoryJournal::new();
        let (a, b, c) = (AccountId::new(), AccountId::new(), AccountId::new());
        let mut ids = Vec::new();
        for i in 0..5 {
            let tx = if i % 2 == 0 {
                transfer(&journal, a, b)
            } else {
                transfer(&journal, c, a)
            };
            ids.push(journal.append(tx).unwrap());
        }
        journal.append(transfer(&journal, b, c)).unwrap();

        let listed: Vec<TransactionId> = journal
            .list_for_account(a, 10, 0)
            .iter()
            .map(|tx| tx.id())
            .collect();
        ids.reverse();
        assert_eq!(listed, ids);

        let page: Vec<TransactionId> = journal
            .list_for_account(a, 2, 1)
            .iter()
            .map(|tx| tx.id())
            .collect();
        assert_eq!(page, ids[1..3].to_vec());

        assert_eq!(journal.count_for_account(a), 5);
        assert_eq!(journal.count_for_account(b), 4);
        assert!(journal.list_for_account(AccountId::new(), 10, 0).is_empty());
    }
}
