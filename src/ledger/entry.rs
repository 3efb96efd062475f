//! Immutable double-entry ledger record

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One committed debit/credit movement.
///
/// Entries are append-only: never updated, never deleted. The signed sum
/// of all entries touching an account, plus its opening balance, equals
/// the account's stored balance at all times.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerEntry {
    pub entry_id: i64,
    pub debit_account: i64,
    pub credit_account: i64,
    pub amount: Decimal,
    pub currency: String,
    pub idempotency_key: Uuid,
    pub trace_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub(crate) const ENTRY_COLUMNS: &str = "entry_id, debit_account, credit_account, amount, \
                                        currency, idempotency_key, trace_id, created_at";
