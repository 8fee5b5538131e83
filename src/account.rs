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

//! Account management.
//!
//! An [`Account`] owns its mutable state behind a [`parking_lot::Mutex`], so
//! every read-modify-write of a balance is serialised per account while
//! different accounts proceed independently.
//!
//! # Example
//!
//! ```
//! use bank_ledger_rs::{AccountStore, NewAccount};
//! use rust_decimal_macros::dec;
//!
//! let store = AccountStore::new();
//! let account = store
//!     .create(NewAccount::new("Alice@Example.com", "+15550001111").with_balance(dec!(100)))
//!     .unwrap();
//! assert_eq!(account.email, "alice@example.com");
//! assert_eq!(account.balance, dec!(100));
//! assert!(!account.verified);
//! ```

use crate::base::{AccountId, MONEY_SCALE};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

/// Persisted shape of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub id: AccountId,
    pub email: String,
    pub phone_number: String,
    pub name: Option<String>,
    pub balance: Decimal,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented on every write; used for optimistic updates.
    pub version: u64,
}

/// Balance fields captured before a mutation so it can be undone.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    balance: Decimal,
    version: u64,
    updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub(crate) struct AccountData {
    pub(crate) email: String,
    pub(crate) phone_number: String,
    pub(crate) name: Option<String>,
    pub(crate) balance: Decimal,
    pub(crate) verified: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) version: u64,
}

impl AccountData {
    fn assert_invariants(&self) {
        debug_assert!(
            self.balance >= Decimal::ZERO,
            "Invariant violated: balance went negative: {}",
            self.balance
        );
    }

    /// Records a write.
    pub(crate) fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            balance: self.balance,
            version: self.version,
            updated_at: self.updated_at,
        }
    }

    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        self.balance = checkpoint.balance;
        self.version = checkpoint.version;
        self.updated_at = checkpoint.updated_at;
        self.assert_invariants();
    }

    /// Decreases the balance.
    pub(crate) fn debit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        if self.balance < amount {
            return Err(LedgerError::InsufficientFunds);
        }
        self.balance -= amount;
        self.touch();
        self.assert_invariants();
        Ok(())
    }

    /// Increases the balance.
    pub(crate) fn credit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount)?;
        self.touch();
        self.assert_invariants();
        Ok(())
    }
}

/// Ledger account.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    inner: Mutex<AccountData>,
}

impl Account {
    pub(crate) fn new(id: AccountId, data: AccountData) -> Self {
        Self {
            id,
            inner: Mutex::new(data),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn balance(&self) -> Decimal {
        self.inner.lock().balance
    }

    pub fn email(&self) -> String {
        self.inner.lock().email.clone()
    }

    pub fn verified(&self) -> bool {
        self.inner.lock().verified
    }

    pub fn version(&self) -> u64 {
        self.inner.lock().version
    }

    /// Returns a consistent copy of every field.
    pub fn snapshot(&self) -> AccountRecord {
        let data = self.inner.lock();
        Self::record(self.id, &data)
    }

    pub(crate) fn record(id: AccountId, data: &AccountData) -> AccountRecord {
        AccountRecord {
            id,
            email: data.email.clone(),
            phone_number: data.phone_number.clone(),
            name: data.name.clone(),
            balance: data.balance,
            verified: data.verified,
            created_at: data.created_at,
            updated_at: data.updated_at,
            version: data.version,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, AccountData> {
        self.inner.lock()
    }
}

/// Registration input for [`crate::AccountStore::create`].
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub phone_number: String,
    pub name: Option<String>,
    pub balance: Decimal,
    pub verified: bool,
}

impl NewAccount {
    /// Lower bound (inclusive) of a demo starting balance.
    pub const DEMO_BALANCE_MIN: i64 = 1_000;
    /// Upper bound (exclusive) of a demo starting balance.
    pub const DEMO_BALANCE_MAX: i64 = 11_000;

    /// Unverified account with a zero balance.
    pub fn new(email: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            phone_number: phone_number.into(),
            name: None,
            balance: Decimal::ZERO,
            verified: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self
    }

    /// Assigns a random whole starting balance for demo deployments.
    pub fn with_demo_balance(mut self) -> Self {
        let amount = rand::thread_rng().gen_range(Self::DEMO_BALANCE_MIN..Self::DEMO_BALANCE_MAX);
        self.balance = Decimal::from(amount);
        self
    }

    pub fn verified(mut self) -> Self {
        self.verified = true;
        self
    }

    /// Normalises identity fields and checks the starting balance.
    pub(crate) fn into_data(self) -> Result<AccountData, LedgerError> {
        let email = validate_email(&self.email)?;
        let phone_number = validate_phone_number(&self.phone_number)?;
        let name = self.name.as_deref().map(validate_name).transpose()?;
        if self.balance < Decimal::ZERO || self.balance.normalize().scale() > MONEY_SCALE {
            return Err(LedgerError::Validation(
                "Starting balance must be a non-negative amount in cents".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(AccountData {
            email,
            phone_number,
            name,
            balance: self.balance,
            verified: self.verified,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }
}

/// Profile fields a user may edit; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

/// Trims and lowercases an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Returns the normalised address or a validation error.
pub fn validate_email(email: &str) -> Result<String, LedgerError> {
    let normalized = normalize_email(email);
    let has_tld = normalized
        .rsplit_once('@')
        .is_some_and(|(_, domain)| domain.contains('.'));
    if !has_tld || !normalized.validate_email() {
        return Err(LedgerError::Validation("Invalid email format".to_string()));
    }
    Ok(normalized)
}

/// Accepts E.164 numbers: `+`, a non-zero digit, then 1 to 14 more digits.
pub fn validate_phone_number(phone_number: &str) -> Result<String, LedgerError> {
    let trimmed = phone_number.trim();
    let valid = trimmed.strip_prefix('+').is_some_and(|digits| {
        (2..=15).contains(&digits.len())
            && digits.bytes().all(|b| b.is_ascii_digit())
            && !digits.starts_with('0')
    });
    if !valid {
        return Err(LedgerError::Validation(
            "Invalid phone number format".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_name(name: &str) -> Result<String, LedgerError> {
    let trimmed = name.trim();
    if trimmed.chars().count() < 2 {
        return Err(LedgerError::Validation(
            "Name must be at least 2 characters long".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
