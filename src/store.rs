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

//! Account ledger store.
//!
//! Accounts live in a [`DashMap`] keyed by id. Email and phone uniqueness is
//! enforced by two index maps whose entries are claimed atomically through
//! the entry API, so two concurrent registrations with the same email can
//! never both succeed.

use crate::account::{
    Account, AccountData, AccountRecord, NewAccount, ProfileUpdate, normalize_email,
    validate_email, validate_name, validate_phone_number,
};
use crate::base::AccountId;
use crate::error::LedgerError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::info;

/// In-memory, thread-safe account store.
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: DashMap<AccountId, Arc<Account>>,
    /// Normalised email to owning account.
    emails: DashMap<String, AccountId>,
    /// Phone number to owning account.
    phones: DashMap<String, AccountId>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the account, or `None` if it does not exist.
    pub fn get(&self, id: AccountId) -> Option<Arc<Account>> {
        self.accounts.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns a snapshot of the account.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AccountNotFound`] if no account has this id.
    pub fn record(&self, id: AccountId) -> Result<AccountRecord, LedgerError> {
        self.get(id)
            .map(|account| account.snapshot())
            .ok_or(LedgerError::AccountNotFound)
    }

    /// Looks an account up by email; the address is normalised first.
    pub fn find_by_email(&self, email: &str) -> Option<Arc<Account>> {
        let email = normalize_email(email);
        let id = self.emails.get(&email).map(|entry| *entry.value())?;
        // The index is claimed before an email change commits, so confirm ownership.
        self.get(id).filter(|account| account.email() == email)
    }

    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Validation`] - Malformed email, phone number, name or balance.
    /// - [`LedgerError::DuplicateIdentity`] - Email or phone number is taken.
    pub fn create(&self, new_account: NewAccount) -> Result<AccountRecord, LedgerError> {
        let data = new_account.into_data()?;
        let id = AccountId::new();

        Self::claim(&self.emails, &data.email, id, "email")?;
        if let Err(err) = Self::claim(&self.phones, &data.phone_number, id, "phone number") {
            Self::release(&self.emails, &data.email, id);
            return Err(err);
        }

        let account = Arc::new(Account::new(id, data));
        let record = account.snapshot();
        self.accounts.insert(id, account);

        info!(account_id = %id, email = %record.email, "account created");
        Ok(record)
    }

    /// Replaces the mutable identity fields (email, phone number, name,
    /// verified) of an account if `record.version` is still current.
    ///
    /// The balance in `record` is ignored; only the transfer engine moves money.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AccountNotFound`] - No account with `record.id`.
    /// - [`LedgerError::VersionConflict`] - The account changed since `record` was read.
    /// - [`LedgerError::Validation`] / [`LedgerError::DuplicateIdentity`] - As for [`Self::create`].
    pub fn update(&self, record: &AccountRecord) -> Result<AccountRecord, LedgerError> {
        let email = validate_email(&record.email)?;
        let phone_number = validate_phone_number(&record.phone_number)?;
        let name = record.name.as_deref().map(validate_name).transpose()?;

        let account = self.get(record.id).ok_or(LedgerError::AccountNotFound)?;
        let mut data = account.lock();
        if data.version != record.version {
            return Err(LedgerError::VersionConflict);
        }

        self.reassign_identity(record.id, &mut data, Some(email), Some(phone_number))?;
        data.name = name;
        data.verified = record.verified;
        data.touch();

        Ok(Account::record(record.id, &data))
    }

    /// Applies a partial profile edit under the account's lock.
    pub fn update_profile(
        &self,
        id: AccountId,
        update: ProfileUpdate,
    ) -> Result<AccountRecord, LedgerError> {
        let name = update.name.as_deref().map(validate_name).transpose()?;
        let phone_number = update
            .phone_number
            .as_deref()
            .map(validate_phone_number)
            .transpose()?;
        let email = update.email.as_deref().map(validate_email).transpose()?;

        let account = self.get(id).ok_or(LedgerError::AccountNotFound)?;
        let mut data = account.lock();

        self.reassign_identity(id, &mut data, email, phone_number)?;
        if name.is_some() {
            data.name = name;
        }
        data.touch();

        info!(account_id = %id, "profile updated");
        Ok(Account::record(id, &data))
    }

    /// Opens the verification gate for an account.
    pub fn mark_verified(&self, id: AccountId) -> Result<AccountRecord, LedgerError> {
        let account = self.get(id).ok_or(LedgerError::AccountNotFound)?;
        let mut data = account.lock();
        if !data.verified {
            data.verified = true;
            data.touch();
            info!(account_id = %id, "account verified");
        }
        Ok(Account::record(id, &data))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Snapshots of every account, in no particular order.
    pub fn records(&self) -> Vec<AccountRecord> {
        let handles: Vec<Arc<Account>> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        handles.iter().map(|account| account.snapshot()).collect()
    }

    /// Moves index claims to new identity values; caller holds the account lock.
    fn reassign_identity(
        &self,
        id: AccountId,
        data: &mut AccountData,
        email: Option<String>,
        phone_number: Option<String>,
    ) -> Result<(), LedgerError> {
        let email = email.filter(|email| *email != data.email);
        let phone_number = phone_number.filter(|phone| *phone != data.phone_number);

        let mut claimed_email = false;
        if let Some(email) = &email {
            claimed_email = Self::claim(&self.emails, email, id, "email")?;
        }
        if let Some(phone) = &phone_number {
            if let Err(err) = Self::claim(&self.phones, phone, id, "phone number") {
                if let Some(email) = email.as_ref().filter(|_| claimed_email) {
                    Self::release(&self.emails, email, id);
                }
                return Err(err);
            }
        }

        if let Some(email) = email {
            Self::release(&self.emails, &data.email, id);
            data.email = email;
        }
        if let Some(phone) = phone_number {
            Self::release(&self.phones, &data.phone_number, id);
            data.phone_number = phone;
        }
        Ok(())
    }

    /// Returns `true` when the key was newly claimed for `id`.
    fn claim(
        index: &DashMap<String, AccountId>,
        key: &str,
        id: AccountId,
        field: &'static str,
    ) -> Result<bool, LedgerError> {
        // Entry API gives an atomic check-and-insert.
        match index.entry(key.to_string()) {
            Entry::Occupied(entry) if *entry.get() == id => Ok(false),
            Entry::Occupied(_) => Err(LedgerError::DuplicateIdentity(field)),
            Entry::Vacant(entry) => {
                entry.insert(id);
                Ok(true)
            }
        }
    }

    fn release(index: &DashMap<String, AccountId>, key: &str, id: AccountId) {
        index.remove_if(key, |_, owner| *owner == id);
    }
}
