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

//! Runtime configuration, from flags with environment fallbacks.

use crate::engine::DEFAULT_RECEIPT_CAPACITY;
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Secret used when none is configured. Only acceptable in development.
pub const DEV_JWT_SECRET: &str = "dev-only-insecure-secret";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set outside development")]
    MissingJwtSecret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

/// Bank ledger API server.
#[derive(Parser, Debug, Clone)]
#[command(name = "bank-ledger")]
#[command(about = "Money-transfer ledger with an authenticated JSON API", long_about = None)]
#[command(version)]
pub struct Config {
    /// Address the HTTP server listens on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// HS256 secret for verifying access tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Deployment environment; development exposes internal error detail.
    #[arg(long, env = "LEDGER_ENV", value_enum, default_value_t = Environment::Production)]
    pub environment: Environment,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,

    /// CSV file of accounts to load at startup.
    ///
    /// Expected columns: `email,phone_number,name,balance,verified`
    #[arg(long, env = "LEDGER_SEED", value_name = "FILE")]
    pub seed: Option<PathBuf>,

    /// Buffered notifications per subscriber before the oldest are dropped.
    #[arg(long, env = "NOTIFY_CAPACITY", default_value_t = 1024)]
    pub notify_capacity: usize,

    /// Idempotency keys remembered before the oldest are forgotten.
    #[arg(long, env = "IDEMPOTENCY_CAPACITY", default_value_t = DEFAULT_RECEIPT_CAPACITY)]
    pub idempotency_capacity: usize,
}

impl Config {
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Configured secret, or the development fallback.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingJwtSecret`] when no secret is set outside development.
    pub fn jwt_secret(&self) -> Result<&str, ConfigError> {
        match (self.jwt_secret.as_deref(), self.environment) {
            (Some(secret), _) => Ok(secret),
            (None, Environment::Development) => Ok(DEV_JWT_SECRET),
            (None, Environment::Production) => Err(ConfigError::MissingJwtSecret),
        }
    }

    pub fn uses_fallback_secret(&self) -> bool {
        self.jwt_secret.is_none()
    }
}
