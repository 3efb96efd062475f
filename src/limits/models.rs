//! Limit rule model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Scope of a spending ceiling.
///
/// PER_TRANSACTION compares a single amount; DAILY and MONTHLY compare the
/// aggregate debited since the start of the current calendar day or month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum LimitScope {
    PerTransaction = 1,
    Daily = 2,
    Monthly = 3,
}

impl LimitScope {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LimitScope::PerTransaction => "PER_TRANSACTION",
            LimitScope::Daily => "DAILY",
            LimitScope::Monthly => "MONTHLY",
        }
    }
}

impl From<i16> for LimitScope {
    fn from(val: i16) -> Self {
        match val {
            2 => LimitScope::Daily,
            3 => LimitScope::Monthly,
            // Unknown codes degrade to the narrowest scope
            _ => LimitScope::PerTransaction,
        }
    }
}

impl From<LimitScope> for i16 {
    fn from(val: LimitScope) -> i16 {
        val as i16
    }
}

impl fmt::Display for LimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A configured spending ceiling.
///
/// Rules are stateless with respect to the ledger: every evaluation runs a
/// fresh aggregate query, never a cached running total.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LimitRule {
    pub rule_id: i64,
    pub account_id: Option<i64>,
    pub user_id: Option<i64>,
    #[sqlx(try_from = "i16")]
    pub scope: LimitScope,
    pub threshold: Decimal,
    pub mcc: Option<i32>,
    pub geo: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Rule creation payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLimitRule {
    pub account_id: Option<i64>,
    pub user_id: Option<i64>,
    pub scope: LimitScope,
    pub threshold: Decimal,
    pub mcc: Option<i32>,
    pub geo: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_roundtrip() {
        for scope in [
            LimitScope::PerTransaction,
            LimitScope::Daily,
            LimitScope::Monthly,
        ] {
            assert_eq!(LimitScope::from(scope.id()), scope);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(LimitScope::PerTransaction.to_string(), "PER_TRANSACTION");
        assert_eq!(LimitScope::Daily.to_string(), "DAILY");
    }
}
