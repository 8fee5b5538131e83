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

//! Integration tests for dashboard views.

use bank_ledger_rs::dashboard::RECENT_TRANSACTIONS_LIMIT;
use bank_ledger_rs::{
    AccountId, AccountStore, Dashboard, Direction, InMemoryJournal, Journal, LedgerError,
    NewAccount, NoopEmitter, TransactionId, TransactionStatus, TransferEngine,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn setup() -> (Arc<AccountStore>, TransferEngine, Dashboard) {
    let store = Arc::new(AccountStore::new());
    let journal: Arc<dyn Journal> = Arc::new(InMemoryJournal::new());
    let engine = TransferEngine::new(
        Arc::clone(&store),
        Arc::clone(&journal),
        Arc::new(NoopEmitter),
    );
    let dashboard = Dashboard::new(Arc::clone(&store), journal);
    (store, engine, dashboard)
}

fn verified(store: &AccountStore, email: &str, phone: &str, balance: Decimal) -> AccountId {
    store
        .create(
            NewAccount::new(email, phone)
                .with_balance(balance)
                .verified(),
        )
        .unwrap()
        .id
}

#[test]
fn entries_are_signed_by_direction() {
    let (store, engine, dashboard) = setup();
    let s = verified(&store, "s@example.com", "+15550000001", dec!(1000));
    let r = verified(&store, "r@example.com", "+15550000002", dec!(500));

    let receipt = engine.transfer(s, "r@example.com", dec!(200)).unwrap();
    assert_eq!(receipt.sender_balance, dec!(800));

    let sender_view = dashboard.build(s).unwrap();
    assert_eq!(sender_view.account.balance, dec!(800));
    assert_eq!(sender_view.total_transactions, 1);
    let sent = &sender_view.recent_transactions[0];
    assert_eq!(sent.id, receipt.transaction.id());
    assert_eq!(sent.direction, Direction::Sent);
    assert_eq!(sent.amount, dec!(-200));
    assert_eq!(sent.other_party, "r@example.com");
    assert_eq!(sent.description, "Sent to r@example.com");
    assert_eq!(sent.status, TransactionStatus::Completed);

    let recipient_view = dashboard.build(r).unwrap();
    assert_eq!(recipient_view.account.balance, dec!(700));
    let received = &recipient_view.recent_transactions[0];
    assert_eq!(received.direction, Direction::Received);
    assert_eq!(received.amount, dec!(200));
    assert_eq!(received.other_party, "s@example.com");
    assert_eq!(received.description, "Received from s@example.com");

    // The stored amount stays positive.
    assert_eq!(receipt.transaction.amount(), dec!(200));
}

#[test]
fn shows_ten_newest_of_fifteen() {
    let (store, engine, dashboard) = setup();
    let s = verified(&store, "s@example.com", "+15550000001", dec!(1000));
    verified(&store, "r@example.com", "+15550000002", dec!(0));

    let ids: Vec<TransactionId> = (1..=15)
        .map(|i| {
            engine
                .transfer(s, "r@example.com", Decimal::from(i))
                .unwrap()
                .transaction
                .id()
        })
        .collect();

    let view = dashboard.build(s).unwrap();

    assert_eq!(view.total_transactions, 15);
    assert_eq!(view.recent_transactions.len(), RECENT_TRANSACTIONS_LIMIT);
    let shown: Vec<TransactionId> = view.recent_transactions.iter().map(|e| e.id).collect();
    let expected: Vec<TransactionId> = ids.iter().rev().take(10).copied().collect();
    assert_eq!(shown, expected);
    assert_eq!(view.recent_transactions[0].amount, dec!(-15));
}

#[test]
fn count_matches_entries_as_sender_or_receiver() {
    let (store, engine, dashboard) = setup();
    let a = verified(&store, "a@example.com", "+15550000001", dec!(100));
    let b = verified(&store, "b@example.com", "+15550000002", dec!(100));
    let c = verified(&store, "c@example.com", "+15550000003", dec!(100));

    engine.transfer(a, "b@example.com", dec!(1)).unwrap();
    engine.transfer(b, "c@example.com", dec!(1)).unwrap();
    engine.transfer(c, "a@example.com", dec!(1)).unwrap();
    engine.transfer(a, "c@example.com", dec!(1)).unwrap();
    let _ = engine.transfer(a, "a@example.com", dec!(1));
    let _ = engine.transfer(b, "c@example.com", dec!(1000));

    assert_eq!(dashboard.build(a).unwrap().total_transactions, 3);
    assert_eq!(dashboard.build(b).unwrap().total_transactions, 2);
    assert_eq!(dashboard.build(c).unwrap().total_transactions, 3);
}

#[test]
fn history_pages_newest_first() {
    let (store, engine, dashboard) = setup();
    let s = verified(&store, "s@example.com", "+15550000001", dec!(100));
    verified(&store, "r@example.com", "+15550000002", dec!(0));
    for i in 1..=5 {
        engine.transfer(s, "r@example.com", Decimal::from(i)).unwrap();
    }

    let (page, total) = dashboard.history(s, 2, 1).unwrap();
    assert_eq!(total, 5);
    let amounts: Vec<Decimal> = page.iter().map(|e| e.amount).collect();
    assert_eq!(amounts, vec![dec!(-4), dec!(-3)]);

    let (past_end, _) = dashboard.history(s, 10, 10).unwrap();
    assert!(past_end.is_empty());
}

#[test]
fn empty_and_missing_accounts() {
    let (store, _engine, dashboard) = setup();
    let lonely = verified(&store, "l@example.com", "+15550000001", dec!(5));

    let view = dashboard.build(lonely).unwrap();
    assert!(view.recent_transactions.is_empty());
    assert_eq!(view.total_transactions, 0);

    assert_eq!(
        dashboard.build(AccountId::new()),
        Err(LedgerError::AccountNotFound)
    );
    assert_eq!(
        dashboard.history(AccountId::new(), 10, 0),
        Err(LedgerError::AccountNotFound)
    );
}

#[test]
fn history_keeps_email_snapshots_after_profile_edit() {
    let (store, engine, dashboard) = setup();
    let s = verified(&store, "s@example.com", "+15550000001", dec!(100));
    let r = verified(&store, "r@example.com", "+15550000002", dec!(0));
    engine.transfer(s, "r@example.com", dec!(10)).unwrap();

    store
        .update_profile(
            r,
            bank_ledger_rs::ProfileUpdate {
                email: Some("renamed@example.com".into()),
                ..Default::default()
            },
        )
        .unwrap();

    let view = dashboard.build(s).unwrap();
    assert_eq!(view.recent_transactions[0].other_party, "r@example.com");
}
