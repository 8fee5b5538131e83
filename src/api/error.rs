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

//! Mapping of ledger and auth failures onto JSON error responses.

use crate::error::{AuthError, LedgerError};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;
use validator::ValidationErrors;

const INTERNAL_ERROR: &str = "Internal server error";

/// Error half of every API response: `{ "success": false, "error": ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    /// Internal detail, only present when the server runs in development.
    detail: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            detail: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Converts a ledger error; internal detail is kept only when `expose_internal`.
    pub fn from_ledger(err: LedgerError, expose_internal: bool) -> Self {
        let status = ledger_status(&err);
        if err.is_internal() {
            error!(error = %err, "request failed with internal error");
            return Self {
                status,
                error: INTERNAL_ERROR.to_string(),
                detail: expose_internal.then(|| err.to_string()),
            };
        }
        Self::new(status, err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.error
    }
}

/// HTTP status for each ledger failure.
pub fn ledger_status(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::Validation(_)
        | LedgerError::InvalidAmount
        | LedgerError::InsufficientFunds
        | LedgerError::SelfTransferRejected
        | LedgerError::DuplicateIdentity(_) => StatusCode::BAD_REQUEST,
        LedgerError::SenderNotFound
        | LedgerError::AccountNotFound
        | LedgerError::RecipientNotFound => StatusCode::NOT_FOUND,
        LedgerError::SenderUnverified => StatusCode::UNAUTHORIZED,
        LedgerError::VersionConflict
        | LedgerError::IdempotencyConflict
        | LedgerError::DuplicateTransaction => StatusCode::CONFLICT,
        LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self::from_ledger(err, false)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "Invalid request".to_string());
        Self::validation(message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: &self.error,
            message: self.detail.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}
