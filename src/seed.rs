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

//! Account seeding from CSV.
//!
//! Loads a fixed set of accounts at startup so a fresh server has someone to
//! transfer between.

use crate::account::NewAccount;
use crate::store::AccountStore;
use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use tracing::{info, warn};

/// Raw CSV record.
///
/// Fields: `email, phone_number, name, balance, verified`
#[derive(Debug, Deserialize)]
struct SeedRecord {
    email: String,
    phone_number: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    name: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    balance: Option<Decimal>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    verified: Option<bool>,
}

impl SeedRecord {
    fn into_new_account(self) -> NewAccount {
        let mut account = NewAccount::new(self.email, self.phone_number);
        if let Some(name) = self.name.filter(|name| !name.is_empty()) {
            account = account.with_name(name);
        }
        account = match self.balance {
            Some(balance) => account.with_balance(balance),
            None => account.with_demo_balance(),
        };
        if self.verified.unwrap_or(false) {
            account = account.verified();
        }
        account
    }
}

/// What a seeding run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

/// Creates one account per CSV row.
///
/// Rows that fail to parse or are rejected by the store (bad email, duplicate
/// phone number, ...) are logged and skipped. A missing `balance` gets a demo
/// balance.
///
/// # Example
///
/// ```csv
/// email,phone_number,name,balance,verified
/// alice@example.com,+15550000001,Alice,1000.00,true
/// bob@example.com,+15550000002,Bob,,true
/// ```
///
/// # Errors
///
/// Returns a CSV error only if the header cannot be read.
pub fn load_accounts<R: Read>(store: &AccountStore, reader: R) -> Result<SeedReport, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);
    rdr.headers()?;

    let mut report = SeedReport::default();
    for (line, result) in rdr.deserialize::<SeedRecord>().enumerate() {
        let row = line + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(row, error = %e, "skipping malformed seed row");
                report.skipped += 1;
                continue;
            }
        };

        match store.create(record.into_new_account()) {
            Ok(_) => report.created += 1,
            Err(e) => {
                warn!(row, error = %e, "skipping rejected seed account");
                report.skipped += 1;
            }
        }
    }

    info!(created = report.created, skipped = report.skipped, "seeded accounts");
    Ok(report)
}
