//! Payment request and outcome types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transfer routing: internal double-entry, or interbank via the gateway
/// with the debit leg staged in a clearing account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransferKind {
    #[default]
    Internal,
    Interbank,
}

/// A transfer request as submitted by a caller.
///
/// The serialized form is also what gets fingerprinted by the idempotency
/// guard and stored as a schedule payload, so field names are stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub from_account: i64,
    /// Required for internal transfers, absent for interbank
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_account: Option<i64>,
    pub amount: Decimal,
    pub currency: String,
    pub idempotency_key: String,
    #[serde(default)]
    pub transfer_type: TransferKind,
    /// A future timestamp defers execution to the scheduler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcc: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiary_iban: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiary_bank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl PaymentRequest {
    /// Trace id defaults to the idempotency key.
    pub fn effective_trace_id(&self) -> String {
        self.trace_id
            .clone()
            .unwrap_or_else(|| self.idempotency_key.clone())
    }
}

/// Result of a submitted transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PaymentOutcome {
    /// Money moved; the ledger entry is durable.
    #[serde(rename_all = "camelCase")]
    Success { transaction_id: i64, message: String },
    /// Debit leg staged in clearing; counterparty settlement is external
    /// and asynchronous.
    #[serde(rename_all = "camelCase")]
    Pending {
        transaction_id: i64,
        gateway_reference: String,
        message: String,
    },
    /// Deferred; the scheduler will drive it to completion.
    #[serde(rename_all = "camelCase")]
    Scheduled {
        schedule_id: i64,
        scheduled_for: DateTime<Utc>,
        message: String,
    },
}

impl PaymentOutcome {
    /// Ledger entry id, if money has already moved.
    pub fn transaction_id(&self) -> Option<i64> {
        match self {
            PaymentOutcome::Success { transaction_id, .. }
            | PaymentOutcome::Pending { transaction_id, .. } => Some(*transaction_id),
            PaymentOutcome::Scheduled { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> PaymentRequest {
        PaymentRequest {
            from_account: 1,
            to_account: Some(2),
            amount: dec!(100.00),
            currency: "USD".to_string(),
            idempotency_key: "7b1c2f4a-9c3e-4b8e-a6d2-0f5e8c9b1a2d".to_string(),
            transfer_type: TransferKind::Internal,
            scheduled_for: None,
            card_token: None,
            mcc: None,
            geo_location: None,
            beneficiary_iban: None,
            beneficiary_bank: None,
            description: None,
            trace_id: None,
        }
    }

    #[test]
    fn test_trace_id_defaults_to_idempotency_key() {
        let mut req = request();
        assert_eq!(req.effective_trace_id(), req.idempotency_key);
        req.trace_id = Some("trace-1".to_string());
        assert_eq!(req.effective_trace_id(), "trace-1");
    }

    #[test]
    fn test_outcome_serialization_carries_status_tag() {
        let outcome = PaymentOutcome::Success {
            transaction_id: 7,
            message: "Payment recorded successfully".to_string(),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["transactionId"], 7);

        let back: PaymentOutcome = serde_json::from_value(value).unwrap();
        assert_eq!(back.transaction_id(), Some(7));
    }

    #[test]
    fn test_request_roundtrip_preserves_kind() {
        let mut req = request();
        req.transfer_type = TransferKind::Interbank;
        req.to_account = None;
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["transferType"], "INTERBANK");
        let back: PaymentRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back.transfer_type, TransferKind::Interbank);
        assert!(back.to_account.is_none());
    }
}
