//! Identity/KYC provider contract.
//!
//! The orchestrator only needs one question answered: may this user move
//! money? The provider abstracts whatever identity system backs that
//! answer; the Postgres implementation reads the status column maintained
//! by the (out of scope) document review workflow.

use async_trait::async_trait;
use sqlx::PgPool;
use std::fmt;
use thiserror::Error;

/// KYC verification status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum KycStatus {
    Pending = 1,
    Review = 2,
    Verified = 3,
    Rejected = 4,
}

impl KycStatus {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(KycStatus::Pending),
            2 => Some(KycStatus::Review),
            3 => Some(KycStatus::Verified),
            4 => Some(KycStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::Pending => "PENDING",
            KycStatus::Review => "REVIEW",
            KycStatus::Verified => "VERIFIED",
            KycStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum KycError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("Corrupt KYC status for user {0}")]
    CorruptStatus(i64),
}

#[async_trait]
pub trait KycProvider: Send + Sync {
    async fn kyc_status(&self, user_id: i64) -> Result<KycStatus, KycError>;
}

/// Postgres-backed provider reading users_tb.
pub struct PgKycProvider {
    pool: PgPool,
}

impl PgKycProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KycProvider for PgKycProvider {
    async fn kyc_status(&self, user_id: i64) -> Result<KycStatus, KycError> {
        let status: Option<i16> =
            sqlx::query_scalar("SELECT kyc_status FROM users_tb WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        let status = status.ok_or(KycError::UserNotFound(user_id))?;
        KycStatus::from_id(status).ok_or(KycError::CorruptStatus(user_id))
    }
}

/// Fixed-status provider for tests and stub deployments.
pub struct StaticKycProvider(pub KycStatus);

#[async_trait]
impl KycProvider for StaticKycProvider {
    async fn kyc_status(&self, _user_id: i64) -> Result<KycStatus, KycError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            KycStatus::Pending,
            KycStatus::Review,
            KycStatus::Verified,
            KycStatus::Rejected,
        ] {
            assert_eq!(KycStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(KycStatus::from_id(0), None);
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticKycProvider(KycStatus::Verified);
        assert_eq!(provider.kyc_status(1).await.unwrap(), KycStatus::Verified);
    }
}
