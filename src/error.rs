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

//! Error types for the ledger core and its identity collaborator.

use thiserror::Error;

/// Ledger errors.
///
/// The `Display` text is what API callers see, so it is written for people.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    /// Amount is zero, negative, finer than a cent, or would overflow a balance
    #[error("Amount must be greater than 0 with at most two decimal places")]
    InvalidAmount,

    /// Sending account does not exist
    #[error("Sender not found")]
    SenderNotFound,

    /// Sending account exists but has not completed verification
    #[error("Sender is not verified")]
    SenderUnverified,

    /// Transfer would exceed the sender's balance
    #[error("Insufficient balance")]
    InsufficientFunds,

    /// Recipient is absent or not verified
    #[error("Recipient not found or not verified")]
    RecipientNotFound,

    /// Sender and recipient are the same account
    #[error("Cannot transfer money to yourself")]
    SelfTransferRejected,

    /// Account referenced by id does not exist
    #[error("User not found")]
    AccountNotFound,

    /// Email or phone number already belongs to another account
    #[error("User with this {0} already exists")]
    DuplicateIdentity(&'static str),

    /// Optimistic update raced with another write
    #[error("Account was modified concurrently, reload and retry")]
    VersionConflict,

    /// Idempotency key reused with different transfer parameters
    #[error("Idempotency key was already used for a different transfer")]
    IdempotencyConflict,

    /// Journal already holds an entry with this id
    #[error("Duplicate transaction ID")]
    DuplicateTransaction,

    /// Infrastructure failure; detail is kept out of user responses
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns `true` for failures the caller cannot fix by changing input.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Failures resolving a bearer credential to an account.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Access token required")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("User not found")]
    Unauthenticated,

    #[error("Phone number not verified")]
    Unverified,
}
