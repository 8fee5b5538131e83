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

//! Best-effort event fan-out.
//!
//! The transfer engine reports committed transfers through an injected
//! [`NotificationEmitter`]. Emission happens after the commit and its
//! result never changes the outcome of a transfer.

use crate::base::{AccountId, TransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

/// Events published by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum LedgerEvent {
    #[serde(rename = "transfer.completed", rename_all = "camelCase")]
    TransferCompleted {
        transaction_id: TransactionId,
        sender_id: AccountId,
        receiver_id: AccountId,
        sender_balance: Decimal,
        receiver_balance: Decimal,
        amount: Decimal,
        created_at: DateTime<Utc>,
    },
    #[serde(rename = "balance.updated", rename_all = "camelCase")]
    BalanceUpdated {
        account_id: AccountId,
        balance: Decimal,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TransferCompleted { .. } => "transfer.completed",
            Self::BalanceUpdated { .. } => "balance.updated",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    /// Nobody is listening; the event was dropped.
    #[error("no subscribers")]
    NoSubscribers,

    #[error("emitter unavailable: {0}")]
    Unavailable(String),
}

/// Receives ledger events for fan-out to interested clients.
pub trait NotificationEmitter: Send + Sync {
    /// Must not block.
    fn emit(&self, event: LedgerEvent) -> Result<(), EmitError>;
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEmitter;

impl NotificationEmitter for NoopEmitter {
    fn emit(&self, _event: LedgerEvent) -> Result<(), EmitError> {
        Ok(())
    }
}

/// Fans events out to every live [`broadcast::Receiver`].
///
/// Slow receivers lose the oldest events once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct BroadcastEmitter {
    sender: broadcast::Sender<LedgerEvent>,
}

impl BroadcastEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl NotificationEmitter for BroadcastEmitter {
    fn emit(&self, event: LedgerEvent) -> Result<(), EmitError> {
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|_| EmitError::NoSubscribers)
    }
}
