use thiserror::Error;

use super::interbank::GatewayError;
use crate::cards::CardError;
use crate::fraud::FraudError;
use crate::kyc::{KycError, KycStatus};
use crate::ledger::{IdempotencyError, LedgerError};
use crate::limits::LimitError;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Fraud(#[from] FraudError),

    #[error(transparent)]
    Limit(#[from] LimitError),

    #[error(transparent)]
    Card(#[from] CardError),

    #[error(transparent)]
    Kyc(#[from] KycError),

    #[error(transparent)]
    Idempotency(#[from] IdempotencyError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("KYC status {status} is not verified. Payment blocked.")]
    KycNotVerified { user_id: i64, status: KycStatus },

    #[error("Recipient account is required for internal transfers")]
    MissingRecipient,

    #[error("Schedule {0} not found")]
    ScheduleNotFound(i64),

    #[error("Schedule {0} cannot be cancelled")]
    ScheduleNotCancellable(i64),

    #[error("A prior attempt with this idempotency key failed: {0}")]
    ReplayedFailure(serde_json::Value),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PaymentError {
    /// Machine-readable rejection code, stable across transports.
    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::Database(_) => "INTERNAL",
            PaymentError::Ledger(e) => match e {
                LedgerError::Database(_) => "INTERNAL",
                LedgerError::InvalidIdempotencyKey => "INVALID_IDEMPOTENCY_KEY",
                LedgerError::SameAccount => "SAME_ACCOUNT",
                LedgerError::InvalidAmount(_) => "INVALID_AMOUNT",
                LedgerError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
                LedgerError::AccountNotActive(_) => "ACCOUNT_NOT_ACTIVE",
                LedgerError::CurrencyMismatch(_) => "CURRENCY_MISMATCH",
                LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
                LedgerError::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            },
            PaymentError::Fraud(_) => "FRAUD_ALERT",
            PaymentError::Limit(_) => "LIMIT_EXCEEDED",
            PaymentError::Card(_) => "CARD_REJECTED",
            PaymentError::Kyc(_) => "INTERNAL",
            PaymentError::Idempotency(e) => match e {
                IdempotencyError::PayloadMismatch => "IDEMPOTENCY_PAYLOAD_MISMATCH",
                IdempotencyError::StillProcessing => "IDEMPOTENCY_IN_FLIGHT",
                IdempotencyError::InvalidKey => "INVALID_IDEMPOTENCY_KEY",
                _ => "INTERNAL",
            },
            PaymentError::Gateway(_) => "GATEWAY_FAILURE",
            PaymentError::KycNotVerified { .. } => "KYC_NOT_VERIFIED",
            PaymentError::MissingRecipient => "MISSING_RECIPIENT",
            PaymentError::ScheduleNotFound(_) => "SCHEDULE_NOT_FOUND",
            PaymentError::ScheduleNotCancellable(_) => "SCHEDULE_NOT_CANCELLABLE",
            PaymentError::ReplayedFailure(_) => "REPLAYED_FAILURE",
            PaymentError::Serialization(_) => "INTERNAL",
        }
    }

    /// Retryable failures release the idempotency claim instead of
    /// finalizing it, so the caller can re-attempt from a fresh read.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::Ledger(LedgerError::ConcurrentModification(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            PaymentError::KycNotVerified {
                user_id: 1,
                status: KycStatus::Pending
            }
            .code(),
            "KYC_NOT_VERIFIED"
        );
        assert_eq!(PaymentError::MissingRecipient.code(), "MISSING_RECIPIENT");
        assert_eq!(
            PaymentError::Ledger(LedgerError::SameAccount).code(),
            "SAME_ACCOUNT"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(PaymentError::Ledger(LedgerError::ConcurrentModification(1)).is_retryable());
        assert!(!PaymentError::MissingRecipient.is_retryable());
    }
}
