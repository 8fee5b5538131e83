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

//! Bearer credential resolution.
//!
//! Token issuance lives elsewhere; this module only verifies a token and
//! maps it to a verified account.

use crate::base::AccountId;
use crate::error::AuthError;
use crate::store::AccountStore;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// JWT claims carried by access tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Account id as text.
    #[serde(rename = "userId")]
    pub user_id: String,
    pub iat: usize,
    pub exp: usize,
}

/// Resolves a bearer credential to an authenticated, verified account.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<AccountId, AuthError>;
}

/// Verifies HS256-signed tokens and checks the account behind them.
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
    store: Arc<AccountStore>,
}

impl JwtAuthenticator {
    pub fn new(secret: &[u8], store: Arc<AccountStore>) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            store,
        }
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, token: &str) -> Result<AccountId, AuthError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?
            .claims;
        let id: AccountId = claims
            .user_id
            .parse()
            .map_err(|_| AuthError::InvalidToken)?;

        let account = self.store.get(id).ok_or(AuthError::Unauthenticated)?;
        if !account.verified() {
            return Err(AuthError::Unverified);
        }
        Ok(id)
    }
}
