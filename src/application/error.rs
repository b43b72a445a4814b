use thiserror::Error;

use crate::domain::{AccountId, TransferId};
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Transfer not found: {0}")]
    TransferNotFound(TransferId),

    #[error("Owner name must not be empty")]
    EmptyOwner,

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Currency mismatch between accounts: {from_currency} vs {to_currency}")]
    CurrencyMismatch {
        from_currency: String,
        to_currency: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    /// Translate storage lookups that missed into the matching domain error.
    pub(crate) fn from_lookup(err: StoreError) -> Self {
        match err {
            StoreError::NotFound {
                entity: "account",
                id,
            } => AppError::AccountNotFound(id),
            StoreError::NotFound {
                entity: "transfer",
                id,
            } => AppError::TransferNotFound(id),
            other => AppError::Store(other),
        }
    }
}
