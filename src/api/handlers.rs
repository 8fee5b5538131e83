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

use super::dto::{
    ApiResponse, DashboardData, HealthData, HistoryData, HistoryQuery, ProfileEditBody,
    TransactionView, TransferBody, TransferData, UserData, UserView,
};
use super::error::ApiError;
use super::{AppState, AuthenticatedAccount};
use crate::account::ProfileUpdate;
use crate::base::IdempotencyKey;
use crate::engine::TransferRequest;
use crate::journal::Journal;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Query, State};
use axum::http::HeaderMap;
use chrono::Utc;
use validator::Validate;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;

// === Health ===

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthData>> {
    Json(ApiResponse::ok(HealthData {
        message: "Bank ledger API is running",
        timestamp: Utc::now(),
        accounts: state.store.len(),
        transactions: state.engine.journal().len(),
    }))
}

// === Users ===

/// POST /api/users/transfer
///
/// The engine call has no await point, so a committed transfer always
/// completes even if the client goes away.
pub async fn transfer(
    State(state): State<AppState>,
    Extension(AuthenticatedAccount(sender)): Extension<AuthenticatedAccount>,
    headers: HeaderMap,
    body: Result<Json<TransferBody>, JsonRejection>,
) -> Result<Json<ApiResponse<TransferData>>, ApiError> {
    let Json(body) = body?;
    body.validate()?;

    let mut request = TransferRequest::new(sender, body.recipient_email, body.amount);
    if let Some(key) = idempotency_key(&headers)? {
        request = request.with_idempotency_key(key);
    }

    let receipt = state.engine.execute(request).map_err(|e| state.reject(e))?;
    Ok(Json(ApiResponse::with_message(
        "Transfer completed successfully",
        TransferData::from(&receipt),
    )))
}

/// GET /api/users/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(AuthenticatedAccount(account)): Extension<AuthenticatedAccount>,
) -> Result<Json<ApiResponse<DashboardData>>, ApiError> {
    let view = state.dashboard.build(account).map_err(|e| state.reject(e))?;
    Ok(Json(ApiResponse::ok(DashboardData::from(&view))))
}

/// GET /api/users/transactions?limit=&offset=
pub async fn transactions(
    State(state): State<AppState>,
    Extension(AuthenticatedAccount(account)): Extension<AuthenticatedAccount>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<HistoryData>>, ApiError> {
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let (entries, total) = state
        .dashboard
        .history(account, limit, offset)
        .map_err(|e| state.reject(e))?;
    Ok(Json(ApiResponse::ok(HistoryData {
        transactions: entries.iter().map(TransactionView::from).collect(),
        total,
    })))
}

/// PATCH /api/users/edit-profile
pub async fn edit_profile(
    State(state): State<AppState>,
    Extension(AuthenticatedAccount(account)): Extension<AuthenticatedAccount>,
    body: Result<Json<ProfileEditBody>, JsonRejection>,
) -> Result<Json<ApiResponse<UserData>>, ApiError> {
    let Json(body) = body?;
    body.validate()?;

    let update = ProfileUpdate {
        name: body.name,
        phone_number: body.phone_number,
        email: body.email,
    };
    let record = state
        .store
        .update_profile(account, update)
        .map_err(|e| state.reject(e))?;
    Ok(Json(ApiResponse::with_message(
        "Profile updated successfully",
        UserData {
            user: UserView::from(&record),
        },
    )))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

fn idempotency_key(headers: &HeaderMap) -> Result<Option<IdempotencyKey>, ApiError> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::validation("Invalid idempotency key"))?;
    Ok(Some(IdempotencyKey::new(value)?))
}
