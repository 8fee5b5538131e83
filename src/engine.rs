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

//! Transfer engine.
//!
//! The [`TransferEngine`] is the only component that writes balances or
//! journal entries. A transfer validates the request, debits the sender,
//! credits the recipient and appends one journal entry as a single unit:
//! either all three writes are observable or none are.
//!
//! # Preconditions
//!
//! Checked in this order, each with its own error:
//!
//! 1. The amount is positive and a whole number of cents ([`LedgerError::InvalidAmount`]).
//! 2. The sender exists ([`LedgerError::SenderNotFound`]) and is verified
//!    ([`LedgerError::SenderUnverified`]).
//! 3. The sender's balance covers the amount ([`LedgerError::InsufficientFunds`]).
//! 4. The recipient email resolves to a verified account ([`LedgerError::RecipientNotFound`]).
//! 5. The recipient is not the sender ([`LedgerError::SelfTransferRejected`]).
//!
//! # Thread Safety
//!
//! Both accounts are locked in ascending [`AccountId`] order for the whole
//! read-modify-write, and checks 2 to 4 are repeated under the locks.
//! Transfers over disjoint account pairs run in parallel; transfers sharing
//! an account are serialised on that account.

use crate::account::{Account, AccountData, normalize_email};
use crate::base::{AccountId, IdempotencyKey, validate_amount};
use crate::error::LedgerError;
use crate::journal::Journal;
use crate::notify::{EmitError, LedgerEvent, NotificationEmitter};
use crate::store::AccountStore;
use crate::transaction::{Parties, Transaction};
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A request to move `amount` from `sender_id` to the owner of `recipient_email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub sender_id: AccountId,
    pub recipient_email: String,
    pub amount: Decimal,
    pub idempotency_key: Option<IdempotencyKey>,
}

impl TransferRequest {
    pub fn new(sender_id: AccountId, recipient_email: impl Into<String>, amount: Decimal) -> Self {
        Self {
            sender_id,
            recipient_email: recipient_email.into(),
            amount,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = Some(key);
        self
    }
}

/// Outcome of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub transaction: Arc<Transaction>,
    pub recipient_email: String,
    /// Sender balance right after this transfer committed.
    pub sender_balance: Decimal,
    /// Recipient balance right after this transfer committed.
    pub recipient_balance: Decimal,
    /// `true` when this receipt was returned for a repeated idempotency key.
    pub replayed: bool,
}

#[derive(Debug)]
struct StoredReceipt {
    recipient_email: String,
    amount: Decimal,
    receipt: TransferReceipt,
}

/// Idempotency receipts kept before the oldest are forgotten.
pub const DEFAULT_RECEIPT_CAPACITY: usize = 100_000;

type ReceiptSlot = (AccountId, IdempotencyKey);

/// Applies transfers between accounts.
pub struct TransferEngine {
    store: Arc<AccountStore>,
    journal: Arc<dyn Journal>,
    emitter: Arc<dyn NotificationEmitter>,
    /// Committed receipts by sender and idempotency key.
    ///
    /// At most `receipt_capacity` are kept. Once the oldest is evicted, a
    /// retry with its key is treated as a new transfer.
    receipts: DashMap<ReceiptSlot, StoredReceipt>,
    /// Insertion order of `receipts`, oldest first.
    receipt_order: Mutex<VecDeque<ReceiptSlot>>,
    receipt_capacity: usize,
}

impl TransferEngine {
    pub fn new(
        store: Arc<AccountStore>,
        journal: Arc<dyn Journal>,
        emitter: Arc<dyn NotificationEmitter>,
    ) -> Self {
        Self {
            store,
            journal,
            emitter,
            receipts: DashMap::new(),
            receipt_order: Mutex::new(VecDeque::new()),
            receipt_capacity: DEFAULT_RECEIPT_CAPACITY,
        }
    }

    /// Bounds the number of remembered idempotency keys.
    pub fn with_receipt_capacity(mut self, capacity: usize) -> Self {
        self.receipt_capacity = capacity;
        self
    }

    /// Number of idempotency receipts currently remembered.
    pub fn receipt_count(&self) -> usize {
        self.receipts.len()
    }

    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    pub fn journal(&self) -> &Arc<dyn Journal> {
        &self.journal
    }

    /// Moves `amount` from `sender_id` to the verified account owning `recipient_email`.
    ///
    /// See [`Self::execute`].
    pub fn transfer(
        &self,
        sender_id: AccountId,
        recipient_email: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt, LedgerError> {
        self.execute(TransferRequest::new(sender_id, recipient_email, amount))
    }

    /// Executes a transfer request.
    ///
    /// On success the transfer is committed before any notification is
    /// emitted; notification failures are logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - Amount not positive, finer than a cent, or overflowing.
    /// - [`LedgerError::SenderNotFound`] / [`LedgerError::SenderUnverified`] - Bad sender.
    /// - [`LedgerError::InsufficientFunds`] - Balance below the amount.
    /// - [`LedgerError::RecipientNotFound`] - No verified account with that email.
    /// - [`LedgerError::SelfTransferRejected`] - Sender and recipient are the same.
    /// - [`LedgerError::IdempotencyConflict`] - Key reused for a different transfer.
    /// - Any journal error; balances are restored before it is returned.
    pub fn execute(&self, request: TransferRequest) -> Result<TransferReceipt, LedgerError> {
        match self.commit(&request) {
            Ok(receipt) => {
                if !receipt.replayed {
                    self.notify(&receipt);
                }
                Ok(receipt)
            }
            Err(err) => {
                debug!(
                    sender = %request.sender_id,
                    recipient = %request.recipient_email,
                    amount = %request.amount,
                    error = %err,
                    "transfer rejected"
                );
                Err(err)
            }
        }
    }

    fn commit(&self, request: &TransferRequest) -> Result<TransferReceipt, LedgerError> {
        let amount = validate_amount(request.amount)?;
        let recipient_email = normalize_email(&request.recipient_email);
        let key = request.idempotency_key.as_ref();

        if let Some(receipt) = self.replay(request.sender_id, key, &recipient_email, amount)? {
            return Ok(receipt);
        }

        let sender = self
            .store
            .get(request.sender_id)
            .ok_or(LedgerError::SenderNotFound)?;
        {
            let data = sender.lock();
            check_sender(&data, amount)?;
        }

        let recipient = self
            .store
            .find_by_email(&recipient_email)
            .filter(|account| account.verified())
            .ok_or(LedgerError::RecipientNotFound)?;
        if recipient.id() == sender.id() {
            return Err(LedgerError::SelfTransferRejected);
        }

        let (mut from, mut to) = lock_pair(&sender, &recipient);

        // A concurrent request with the same key may have committed meanwhile.
        if let Some(receipt) = self.replay(request.sender_id, key, &recipient_email, amount)? {
            return Ok(receipt);
        }
        check_sender(&from, amount)?;
        if !to.verified || to.email != recipient_email {
            return Err(LedgerError::RecipientNotFound);
        }

        let from_checkpoint = from.checkpoint();
        let to_checkpoint = to.checkpoint();

        from.debit(amount)?;
        if let Err(err) = to.credit(amount) {
            from.rollback(from_checkpoint);
            return Err(err);
        }

        let transaction = Transaction::completed_transfer(
            self.journal.next_id(),
            Parties {
                sender_id: sender.id(),
                sender_email: &from.email,
                receiver_id: recipient.id(),
                receiver_email: &to.email,
            },
            amount,
        );
        if let Err(err) = self.journal.append(transaction.clone()) {
            warn!(
                transaction_id = %transaction.id(),
                error = %err,
                "journal append failed, rolling back balances"
            );
            from.rollback(from_checkpoint);
            to.rollback(to_checkpoint);
            return Err(err);
        }

        let receipt = TransferReceipt {
            transaction: Arc::new(transaction),
            recipient_email: to.email.clone(),
            sender_balance: from.balance,
            recipient_balance: to.balance,
            replayed: false,
        };
        if let Some(key) = key {
            self.remember(
                (request.sender_id, key.clone()),
                StoredReceipt {
                    recipient_email,
                    amount,
                    receipt: receipt.clone(),
                },
            );
        }

        info!(
            transaction_id = %receipt.transaction.id(),
            sender = %sender.id(),
            recipient = %recipient.id(),
            amount = %amount,
            "transfer committed"
        );
        Ok(receipt)
    }

    fn remember(&self, slot: ReceiptSlot, stored: StoredReceipt) {
        let mut order = self.receipt_order.lock();
        if self.receipts.insert(slot.clone(), stored).is_none() {
            order.push_back(slot);
        }
        while order.len() > self.receipt_capacity {
            if let Some(oldest) = order.pop_front() {
                self.receipts.remove(&oldest);
            }
        }
    }

    /// Returns the stored receipt for a repeated key.
    fn replay(
        &self,
        sender_id: AccountId,
        key: Option<&IdempotencyKey>,
        recipient_email: &str,
        amount: Decimal,
    ) -> Result<Option<TransferReceipt>, LedgerError> {
        let Some(key) = key else {
            return Ok(None);
        };
        let Some(stored) = self.receipts.get(&(sender_id, key.clone())) else {
            return Ok(None);
        };
        if stored.recipient_email != recipient_email || stored.amount != amount {
            return Err(LedgerError::IdempotencyConflict);
        }

        let mut receipt = stored.receipt.clone();
        receipt.replayed = true;
        Ok(Some(receipt))
    }

    fn notify(&self, receipt: &TransferReceipt) {
        let transaction = &receipt.transaction;
        let events = [
            LedgerEvent::TransferCompleted {
                transaction_id: transaction.id(),
                sender_id: transaction.sender_id(),
                receiver_id: transaction.receiver_id(),
                sender_balance: receipt.sender_balance,
                receiver_balance: receipt.recipient_balance,
                amount: transaction.amount(),
                created_at: transaction.created_at(),
            },
            LedgerEvent::BalanceUpdated {
                account_id: transaction.sender_id(),
                balance: receipt.sender_balance,
            },
            LedgerEvent::BalanceUpdated {
                account_id: transaction.receiver_id(),
                balance: receipt.recipient_balance,
            },
        ];

        for event in events {
            let name = event.name();
            match self.emitter.emit(event) {
                Ok(()) => {}
                Err(EmitError::NoSubscribers) => {
                    debug!(event = name, "notification dropped, no subscribers");
                }
                Err(err) => warn!(event = name, error = %err, "notification failed"),
            }
        }
    }
}

fn check_sender(data: &AccountData, amount: Decimal) -> Result<(), LedgerError> {
    if !data.verified {
        return Err(LedgerError::SenderUnverified);
    }
    if data.balance < amount {
        return Err(LedgerError::InsufficientFunds);
    }
    Ok(())
}

/// Locks both accounts in ascending id order, returning `(sender, recipient)`.
fn lock_pair<'a>(
    sender: &'a Account,
    recipient: &'a Account,
) -> (MutexGuard<'a, AccountData>, MutexGuard<'a, AccountData>) {
    if sender.id() < recipient.id() {
        let from = sender.lock();
        let to = recipient.lock();
        (from, to)
    } else {
        let to = recipient.lock();
        let from = sender.lock();
        (from, to)
    }
}
