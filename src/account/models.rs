//! Data models for account management

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Account status
///
/// Stored as SMALLINT. Accounts are never deleted; a closed account keeps
/// its row and history with status CLOSED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(i16)]
pub enum AccountStatus {
    Active = 1,
    Frozen = 2,
    Closed = 3,
}

impl AccountStatus {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Frozen => "FROZEN",
            AccountStatus::Closed => "CLOSED",
        }
    }
}

impl From<i16> for AccountStatus {
    fn from(val: i16) -> Self {
        match val {
            1 => AccountStatus::Active,
            2 => AccountStatus::Frozen,
            // Unknown codes fail safe: only ACTIVE accounts may transact
            _ => AccountStatus::Closed,
        }
    }
}

impl From<AccountStatus> for i16 {
    fn from(val: AccountStatus) -> i16 {
        val as i16
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account with a versioned balance.
///
/// The balance is only ever mutated through a committed ledger entry, and
/// every mutation increments `version`; writers compare-and-swap on the
/// version they last read. The currency never changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub account_id: i64,
    pub user_id: i64,
    pub currency: String,
    pub balance: Decimal,
    pub opening_balance: Decimal,
    #[sqlx(try_from = "i16")]
    pub status: AccountStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            AccountStatus::Active,
            AccountStatus::Frozen,
            AccountStatus::Closed,
        ] {
            assert_eq!(AccountStatus::from(status.id()), status);
        }
    }

    #[test]
    fn test_unknown_status_fails_safe() {
        assert_eq!(AccountStatus::from(0), AccountStatus::Closed);
        assert_eq!(AccountStatus::from(99), AccountStatus::Closed);
    }

    #[test]
    fn test_display() {
        assert_eq!(AccountStatus::Active.to_string(), "ACTIVE");
        assert_eq!(AccountStatus::Closed.to_string(), "CLOSED");
    }
}
