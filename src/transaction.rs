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

//! Journal entries.
//!
//! A [`Transaction`] is created once, by the transfer engine, and never
//! changes afterwards: its fields are private and only readable.

use crate::base::{AccountId, TransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Transfer,
    Deposit,
    Withdrawal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// Immutable record of a completed transfer.
///
/// Email addresses are snapshotted so history still reads correctly after
/// either party edits their profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    id: TransactionId,
    sender_id: AccountId,
    receiver_id: AccountId,
    sender_email: String,
    receiver_email: String,
    amount: Decimal,
    #[serde(rename = "type")]
    transaction_type: TransactionType,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
}

/// Both parties of a transfer as seen at commit time.
pub(crate) struct Parties<'a> {
    pub(crate) sender_id: AccountId,
    pub(crate) sender_email: &'a str,
    pub(crate) receiver_id: AccountId,
    pub(crate) receiver_email: &'a str,
}

impl Transaction {
    /// Builds a completed transfer entry stamped with the current time.
    pub(crate) fn completed_transfer(
        id: TransactionId,
        parties: Parties<'_>,
        amount: Decimal,
    ) -> Self {
        debug_assert!(amount > Decimal::ZERO, "journal amounts are always positive");
        Self {
            id,
            sender_id: parties.sender_id,
            receiver_id: parties.receiver_id,
            sender_email: parties.sender_email.to_string(),
            receiver_email: parties.receiver_email.to_string(),
            amount,
            transaction_type: TransactionType::Transfer,
            status: TransactionStatus::Completed,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn sender_id(&self) -> AccountId {
        self.sender_id
    }

    pub fn receiver_id(&self) -> AccountId {
        self.receiver_id
    }

    pub fn sender_email(&self) -> &str {
        &self.sender_email
    }

    pub fn receiver_email(&self) -> &str {
        &self.receiver_email
    }

    /// Always positive.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether `account` is the sender or the receiver.
    pub fn involves(&self, account: AccountId) -> bool {
        self.sender_id == account || self.receiver_id == account
    }
}
