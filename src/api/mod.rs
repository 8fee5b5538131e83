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

//! JSON-over-HTTP surface.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Liveness and counts
//! - `POST /api/users/transfer` - Send money to another verified user
//! - `GET /api/users/dashboard` - Balance, profile and the ten newest transactions
//! - `GET /api/users/transactions` - Paged transaction history
//! - `PATCH /api/users/edit-profile` - Change name, phone number or email
//!
//! Every `/api/users` route requires `Authorization: Bearer <token>`.
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST http://localhost:5000/api/users/transfer \
//!   -H "Authorization: Bearer $TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -H "Idempotency-Key: 4f1c2a" \
//!   -d '{"recipientEmail": "bob@example.com", "amount": 200}'
//! ```

mod dto;
mod error;
mod handlers;

pub use dto::ApiResponse;
pub use error::{ApiError, ledger_status};
pub use handlers::IDEMPOTENCY_KEY_HEADER;

use crate::auth::Authenticator;
use crate::base::AccountId;
use crate::dashboard::Dashboard;
use crate::engine::TransferEngine;
use crate::error::{AuthError, LedgerError};
use crate::store::AccountStore;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, patch, post};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TransferEngine>,
    pub dashboard: Dashboard,
    pub store: Arc<AccountStore>,
    pub authenticator: Arc<dyn Authenticator>,
    /// Include internal error detail in 500 responses.
    pub expose_internal_errors: bool,
}

impl AppState {
    pub fn new(engine: Arc<TransferEngine>, authenticator: Arc<dyn Authenticator>) -> Self {
        let store = Arc::clone(engine.store());
        let dashboard = Dashboard::new(Arc::clone(&store), Arc::clone(engine.journal()));
        Self {
            engine,
            dashboard,
            store,
            authenticator,
            expose_internal_errors: false,
        }
    }

    pub fn with_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    fn reject(&self, err: LedgerError) -> ApiError {
        ApiError::from_ledger(err, self.expose_internal_errors)
    }
}

/// Account resolved from the bearer token, inserted by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedAccount(pub AccountId);

/// Rejects requests without a valid bearer token for a verified account.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let account = {
        let token = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;
        state.authenticator.authenticate(token)?
    };

    request.extensions_mut().insert(AuthenticatedAccount(account));
    Ok(next.run(request).await)
}

pub fn router(state: AppState) -> Router {
    let users = Router::new()
        .route("/transfer", post(handlers::transfer))
        .route("/dashboard", get(handlers::dashboard))
        .route("/transactions", get(handlers::transactions))
        .route("/edit-profile", patch(handlers::edit_profile))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/api/health", get(handlers::health))
        .nest("/api/users", users)
        .fallback(handlers::not_found)
        .with_state(state)
}
