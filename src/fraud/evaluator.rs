//! Fraud evaluation over ledger history.
//!
//! Aggregates are queried fresh for every payment; the pure bands in
//! `scoring` turn them into a risk score. A rejection emits a FRAUD_ALERT
//! event carrying the contributing reasons; both outcomes are audited.

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use super::scoring::{amount_score, pattern_score, round_amount_score, velocity_score};
use super::REJECT_THRESHOLD;
use crate::audit::AuditSink;
use crate::events::EventBus;

#[derive(Error, Debug)]
pub enum FraudError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(
        "Transaction rejected due to high fraud risk. Risk score: {risk_score}%. Reasons: {}",
        .reasons.join(", ")
    )]
    Rejected { risk_score: u32, reasons: Vec<String> },
}

/// The slice of a payment request the evaluator scores.
#[derive(Debug, Clone)]
pub struct FraudCheckRequest {
    pub from_account: i64,
    pub to_account: Option<i64>,
    pub amount: Decimal,
    pub currency: String,
}

pub struct FraudEvaluator {
    pool: PgPool,
    audit: Arc<AuditSink>,
    events: Arc<EventBus>,
}

impl FraudEvaluator {
    pub fn new(pool: PgPool, audit: Arc<AuditSink>, events: Arc<EventBus>) -> Self {
        Self { pool, audit, events }
    }

    /// Score a payment. Returns the accumulated risk score on pass,
    /// `FraudError::Rejected` at or above the threshold.
    pub async fn validate_payment(
        &self,
        actor: &str,
        request: &FraudCheckRequest,
        trace_id: Option<&str>,
    ) -> Result<u32, FraudError> {
        let mut risk_score = 0;
        let mut reasons = Vec::new();

        let (five_min, one_hour) = self.velocity_counts(request.from_account).await?;
        let (score, mut r) = velocity_score(five_min, one_hour);
        risk_score += score;
        reasons.append(&mut r);

        let (avg, max) = self
            .amount_aggregates(request.from_account, &request.currency)
            .await?;
        let (score, mut r) = amount_score(request.amount, avg, max);
        risk_score += score;
        reasons.append(&mut r);

        let similar = self
            .similar_count(request.from_account, request.to_account, request.amount)
            .await?;
        let (score, reason) = pattern_score(similar);
        risk_score += score;
        reasons.extend(reason);

        let (score, reason) = round_amount_score(request.amount);
        risk_score += score;
        reasons.extend(reason);

        let passed = risk_score < REJECT_THRESHOLD;
        let audit_action = if passed {
            "FRAUD_CHECK_PASSED"
        } else {
            "FRAUD_CHECK_FAILED"
        };
        let audit_reasons = (!reasons.is_empty()).then_some(&reasons);

        self.audit
            .record(
                actor,
                audit_action,
                json!({
                    "accountId": request.from_account,
                    "amount": request.amount,
                    "currency": request.currency,
                    "riskScore": risk_score,
                    "reasons": audit_reasons,
                }),
                trace_id,
            )
            .await;

        if !passed {
            warn!(
                account_id = request.from_account,
                risk_score = risk_score,
                "payment rejected by fraud evaluator"
            );
            self.events.emit(
                "fraud_alerts",
                json!({
                    "type": "FRAUD_ALERT",
                    "actor": actor,
                    "accountId": request.from_account,
                    "amount": request.amount,
                    "currency": request.currency,
                    "riskScore": risk_score,
                    "reasons": reasons,
                    "traceId": trace_id,
                    "createdAt": chrono::Utc::now().to_rfc3339(),
                }),
            );
            return Err(FraudError::Rejected {
                risk_score,
                reasons,
            });
        }

        Ok(risk_score)
    }

    async fn velocity_counts(&self, account_id: i64) -> Result<(i64, i64), FraudError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE created_at >= NOW() - INTERVAL '5 minutes') AS five_min,
                COUNT(*) FILTER (WHERE created_at >= NOW() - INTERVAL '1 hour') AS one_hour
            FROM ledger_entries_tb
            WHERE debit_account = $1 AND created_at >= NOW() - INTERVAL '1 hour'
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((row.get("five_min"), row.get("one_hour")))
    }

    async fn amount_aggregates(
        &self,
        account_id: i64,
        currency: &str,
    ) -> Result<(Option<Decimal>, Option<Decimal>), FraudError> {
        let row = sqlx::query(
            r#"
            SELECT AVG(amount) AS avg_amount, MAX(amount) AS max_amount
            FROM ledger_entries_tb
            WHERE debit_account = $1
              AND currency = $2
              AND created_at >= NOW() - INTERVAL '30 days'
            "#,
        )
        .bind(account_id)
        .bind(currency)
        .fetch_one(&self.pool)
        .await?;

        Ok((row.get("avg_amount"), row.get("max_amount")))
    }

    async fn similar_count(
        &self,
        from_account: i64,
        to_account: Option<i64>,
        amount: Decimal,
    ) -> Result<i64, FraudError> {
        let Some(to_account) = to_account else {
            return Ok(0);
        };
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM ledger_entries_tb
            WHERE debit_account = $1
              AND credit_account = $2
              AND amount = $3
              AND created_at >= NOW() - INTERVAL '24 hours'
            "#,
        )
        .bind(from_account)
        .bind(to_account)
        .bind(amount)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
