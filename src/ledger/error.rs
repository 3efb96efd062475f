use crate::money::MoneyError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid idempotency key format")]
    InvalidIdempotencyKey,

    #[error("Cannot transfer to the same account")]
    SameAccount,

    #[error(transparent)]
    InvalidAmount(#[from] MoneyError),

    #[error("Account {0} not found")]
    AccountNotFound(i64),

    #[error("Account {0} is not active")]
    AccountNotActive(i64),

    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),

    #[error("Insufficient funds: account {account_id} has {available}, required {required}")]
    InsufficientFunds {
        account_id: i64,
        available: Decimal,
        required: Decimal,
    },

    #[error("Account {0} was modified concurrently. Please retry.")]
    ConcurrentModification(i64),
}

impl LedgerError {
    /// Retryable errors may succeed on a fresh read; the caller decides
    /// whether to re-attempt. The store never retries internally.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrentModification(_))
    }
}
