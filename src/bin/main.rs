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

//! Bank ledger API server.
//!
//! # Usage
//!
//! ```bash
//! # Development, with seeded accounts
//! bank-ledger --environment development --seed accounts.csv
//!
//! # Production settings from the environment
//! JWT_SECRET=... BIND_ADDR=0.0.0.0:5000 JSON_LOGS=true bank-ledger
//! ```

use bank_ledger_rs::api::{self, AppState};
use bank_ledger_rs::config::Config;
use bank_ledger_rs::logging::init_tracing;
use bank_ledger_rs::seed::load_accounts;
use bank_ledger_rs::{
    AccountStore, BroadcastEmitter, InMemoryJournal, JwtAuthenticator, LedgerEvent, TransferEngine,
};
use clap::Parser;
use std::fs::File;
use std::io::BufReader;
use std::process;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config = Config::parse();
    init_tracing(&config.log_level, config.json_logs);

    let jwt_secret = match config.jwt_secret() {
        Ok(secret) => secret,
        Err(e) => {
            error!(error = %e, "refusing to start");
            process::exit(1);
        }
    };
    if config.uses_fallback_secret() {
        warn!("JWT_SECRET not set, using the development secret");
    }

    let store = Arc::new(AccountStore::new());

    if let Some(path) = &config.seed {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot open seed file");
                process::exit(1);
            }
        };
        if let Err(e) = load_accounts(&store, BufReader::new(file)) {
            error!(path = %path.display(), error = %e, "cannot read seed file");
            process::exit(1);
        }
    }

    let emitter = Arc::new(BroadcastEmitter::new(config.notify_capacity));
    tokio::spawn(log_events(emitter.subscribe()));

    let engine = Arc::new(
        TransferEngine::new(
            Arc::clone(&store),
            Arc::new(InMemoryJournal::new()),
            emitter,
        )
        .with_receipt_capacity(config.idempotency_capacity),
    );
    let authenticator = Arc::new(JwtAuthenticator::new(
        jwt_secret.as_bytes(),
        Arc::clone(&store),
    ));
    let state = AppState::new(engine, authenticator).with_internal_errors(config.is_development());
    let app = api::router(state);

    let listener = match TcpListener::bind(config.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %config.bind, error = %e, "cannot bind");
            process::exit(1);
        }
    };
    info!(
        addr = %config.bind,
        environment = ?config.environment,
        accounts = store.len(),
        "bank ledger API listening"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("shutting down");
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!(error = %e, "server error");
        process::exit(1);
    }
}

/// Writes every ledger event to the log until the emitter is dropped.
async fn log_events(mut events: broadcast::Receiver<LedgerEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(payload) => info!(event = event.name(), %payload, "ledger event"),
                Err(e) => warn!(event = event.name(), error = %e, "cannot encode ledger event"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "event log lagging, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
