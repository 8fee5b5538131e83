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

//! Request and response bodies.
//!
//! Money crosses the wire as JSON numbers. Incoming numbers are parsed from
//! their decimal text, so `0.1` arrives as exactly `0.1`.

use crate::account::AccountRecord;
use crate::base::{AccountId, TransactionId};
use crate::dashboard::{DashboardEntry, DashboardView, Direction};
use crate::engine::TransferReceipt;
use crate::transaction::TransactionStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use validator::Validate;

/// Success half of every API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(D::Error::custom)
}

/// `POST /transfer` body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TransferBody {
    #[validate(email(message = "Invalid recipient email"))]
    pub recipient_email: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
}

/// `PATCH /edit-profile` body; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEditBody {
    #[validate(length(min = 2, message = "Name must be at least 2 characters long"))]
    pub name: Option<String>,
    pub phone_number: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TransferSummary {
    pub id: TransactionId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub recipient: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferData {
    pub transaction: TransferSummary,
    #[serde(with = "rust_decimal::serde::float")]
    pub new_balance: Decimal,
}

impl From<&TransferReceipt> for TransferData {
    fn from(receipt: &TransferReceipt) -> Self {
        Self {
            transaction: TransferSummary {
                id: receipt.transaction.id(),
                amount: receipt.transaction.amount(),
                recipient: receipt.recipient_email.clone(),
                timestamp: receipt.transaction.created_at(),
            },
            new_balance: receipt.sender_balance,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: AccountId,
    pub email: String,
    pub phone_number: String,
    pub name: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub is_phone_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&AccountRecord> for UserView {
    fn from(record: &AccountRecord) -> Self {
        Self {
            id: record.id,
            email: record.email.clone(),
            phone_number: record.phone_number.clone(),
            name: record.name.clone(),
            balance: record.balance,
            is_phone_verified: record.verified,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: UserView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub direction: Direction,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub other_party: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub status: TransactionStatus,
}

impl From<&DashboardEntry> for TransactionView {
    fn from(entry: &DashboardEntry) -> Self {
        Self {
            id: entry.id,
            direction: entry.direction,
            amount: entry.amount,
            other_party: entry.other_party.clone(),
            description: entry.description.clone(),
            created_at: entry.created_at,
            status: entry.status,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub user: UserView,
    pub recent_transactions: Vec<TransactionView>,
    pub total_transactions: usize,
}

impl From<&DashboardView> for DashboardData {
    fn from(view: &DashboardView) -> Self {
        Self {
            user: UserView::from(&view.account),
            recent_transactions: view.recent_transactions.iter().map(TransactionView::from).collect(),
            total_transactions: view.total_transactions,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryData {
    pub transactions: Vec<TransactionView>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
    pub accounts: usize,
    pub transactions: usize,
}
