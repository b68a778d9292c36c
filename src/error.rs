// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;

/// Errors raised by the ledger domain. Command handlers wrap these in
/// `anyhow` with extra context before they reach the user.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Shares must add up to 100% (got {sum}%)")]
    SplitMismatch { sum: Decimal },

    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid value: {0}")]
    Invalid(String),

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

impl LedgerError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
