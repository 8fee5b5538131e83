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

//! Read-only dashboard views.
//!
//! Joins an account's current state with its most recent journal entries.
//! Direction and sign are computed for display only; stored amounts stay
//! positive.

use crate::account::AccountRecord;
use crate::base::{AccountId, TransactionId};
use crate::error::LedgerError;
use crate::journal::Journal;
use crate::store::AccountStore;
use crate::transaction::{Transaction, TransactionStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

/// How many entries a dashboard shows.
pub const RECENT_TRANSACTIONS_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

/// A journal entry as seen by one of its parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardEntry {
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub direction: Direction,
    /// Negative when sent, positive when received.
    pub amount: Decimal,
    pub other_party: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub status: TransactionStatus,
}

impl DashboardEntry {
    pub fn from_transaction(transaction: &Transaction, viewer: AccountId) -> Self {
        let (direction, amount, other_party, description) = if transaction.sender_id() == viewer {
            let other = transaction.receiver_email().to_string();
            let description = format!("Sent to {other}");
            (Direction::Sent, -transaction.amount(), other, description)
        } else {
            let other = transaction.sender_email().to_string();
            let description = format!("Received from {other}");
            (Direction::Received, transaction.amount(), other, description)
        };

        Self {
            id: transaction.id(),
            direction,
            amount,
            other_party,
            description,
            created_at: transaction.created_at(),
            status: transaction.status(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub account: AccountRecord,
    pub recent_transactions: Vec<DashboardEntry>,
    pub total_transactions: usize,
}

/// Builds dashboard views from the store and the journal.
#[derive(Clone)]
pub struct Dashboard {
    store: Arc<AccountStore>,
    journal: Arc<dyn Journal>,
}

impl Dashboard {
    pub fn new(store: Arc<AccountStore>, journal: Arc<dyn Journal>) -> Self {
        Self { store, journal }
    }

    /// Current account state, up to [`RECENT_TRANSACTIONS_LIMIT`] newest
    /// entries, and the total entry count.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AccountNotFound`] if the account does not exist.
    pub fn build(&self, account_id: AccountId) -> Result<DashboardView, LedgerError> {
        let account = self.store.record(account_id)?;
        let recent_transactions = self.entries(account_id, RECENT_TRANSACTIONS_LIMIT, 0);
        let total_transactions = self.journal.count_for_account(account_id);

        Ok(DashboardView {
            account,
            recent_transactions,
            total_transactions,
        })
    }

    /// One page of history, newest first, with the total entry count.
    pub fn history(
        &self,
        account_id: AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<DashboardEntry>, usize), LedgerError> {
        if self.store.get(account_id).is_none() {
            return Err(LedgerError::AccountNotFound);
        }
        Ok((
            self.entries(account_id, limit, offset),
            self.journal.count_for_account(account_id),
        ))
    }

    fn entries(&self, account_id: AccountId, limit: usize, offset: usize) -> Vec<DashboardEntry> {
        self.journal
            .list_for_account(account_id, limit, offset)
            .iter()
            .map(|tx| DashboardEntry::from_transaction(tx, account_id))
            .collect()
    }
}
