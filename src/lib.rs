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

//! # Bank Ledger
//!
//! A money-transfer ledger core: user accounts with balances, atomic
//! transfers between verified users, an append-only transaction journal, and
//! a dashboard view over both. [`api`] exposes it as JSON over HTTP.
//!
//! ## Core Components
//!
//! - [`TransferEngine`]: The only writer of balances and journal entries
//! - [`AccountStore`]: Accounts keyed by id, with unique email and phone number
//! - [`Journal`]: Append-only record of completed transfers
//! - [`Dashboard`]: Read-only account summary and history
//! - [`NotificationEmitter`]: Post-commit event sink
//! - [`LedgerError`]: Every way a ledger operation can fail
//!
//! ## Example
//!
//! ```
//! use bank_ledger_rs::{AccountStore, InMemoryJournal, NewAccount, NoopEmitter, TransferEngine};
//! use rust_decimal_macros::dec;
//! use std::sync::Arc;
//!
//! let store = Arc::new(AccountStore::new());
//! let alice = store
//!     .create(NewAccount::new("alice@example.com", "+15550000001").with_balance(dec!(1000)).verified())
//!     .unwrap();
//! store
//!     .create(NewAccount::new("bob@example.com", "+15550000002").verified())
//!     .unwrap();
//!
//! let engine = TransferEngine::new(
//!     Arc::clone(&store),
//!     Arc::new(InMemoryJournal::new()),
//!     Arc::new(NoopEmitter),
//! );
//! let receipt = engine.transfer(alice.id, "bob@example.com", dec!(200)).unwrap();
//!
//! assert_eq!(receipt.sender_balance, dec!(800));
//! assert_eq!(receipt.recipient_balance, dec!(200));
//! ```
//!
//! ## Thread Safety
//!
//! Each account sits behind its own lock. Transfers over disjoint accounts run
//! in parallel; transfers sharing an account are serialised on it, so no
//! update is lost and no balance goes negative.

pub mod account;
pub mod api;
pub mod auth;
mod base;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod journal;
pub mod logging;
pub mod notify;
pub mod seed;
pub mod store;
mod transaction;

pub use account::{Account, AccountRecord, NewAccount, ProfileUpdate};
pub use auth::{Authenticator, JwtAuthenticator};
pub use base::{AccountId, IdempotencyKey, MINIMUM_UNIT, TransactionId, validate_amount};
pub use dashboard::{Dashboard, DashboardEntry, DashboardView, Direction};
pub use engine::{DEFAULT_RECEIPT_CAPACITY, TransferEngine, TransferReceipt, TransferRequest};
pub use error::{AuthError, LedgerError};
pub use journal::{InMemoryJournal, Journal};
pub use notify::{BroadcastEmitter, EmitError, LedgerEvent, NoopEmitter, NotificationEmitter};
pub use store::AccountStore;
pub use transaction::{Transaction, TransactionStatus, TransactionType};
