//! Limit evaluation against fresh ledger aggregates.
//!
//! For every active rule whose filters match the request, the evaluator
//! checks the rule's ceiling. The first rule that would be exceeded aborts
//! the evaluation with a failure naming the scope, the current spend and
//! the remaining headroom. Passing is itself audited.

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;

use super::models::{LimitRule, LimitScope, NewLimitRule};
use crate::audit::AuditSink;

#[derive(Error, Debug)]
pub enum LimitError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(
        "Limit exceeded: {scope} threshold {threshold}, current spend {spent}, remaining headroom {headroom}"
    )]
    Exceeded {
        rule_id: i64,
        scope: LimitScope,
        threshold: Decimal,
        spent: Decimal,
        headroom: Decimal,
    },
}

/// The slice of a payment request that limit rules see.
#[derive(Debug, Clone)]
pub struct LimitCheckRequest {
    pub from_account: i64,
    pub to_account: Option<i64>,
    pub amount: Decimal,
    pub mcc: Option<i32>,
    pub geo: Option<String>,
}

/// Does a rule's filter set match this request? Rules with no filter
/// apply globally.
pub fn rule_matches(rule: &LimitRule, request: &LimitCheckRequest, user_id: Option<i64>) -> bool {
    let subject_match = match (rule.account_id, rule.user_id) {
        (None, None) => true,
        (account, user) => {
            account == Some(request.from_account) || (user.is_some() && user == user_id)
        }
    };
    if !subject_match {
        return false;
    }
    if rule.mcc.is_some() && rule.mcc != request.mcc {
        return false;
    }
    if rule.geo.is_some() && rule.geo.as_deref() != request.geo.as_deref() {
        return false;
    }
    true
}

/// Check one rule's ceiling. `period_spent` is the aggregate already
/// debited in the rule's period (zero for PER_TRANSACTION).
pub fn rule_violation(
    rule: &LimitRule,
    amount: Decimal,
    period_spent: Decimal,
) -> Option<LimitError> {
    let exceeded = match rule.scope {
        LimitScope::PerTransaction => amount > rule.threshold,
        LimitScope::Daily | LimitScope::Monthly => period_spent + amount > rule.threshold,
    };
    if !exceeded {
        return None;
    }
    let spent = match rule.scope {
        LimitScope::PerTransaction => Decimal::ZERO,
        _ => period_spent,
    };
    Some(LimitError::Exceeded {
        rule_id: rule.rule_id,
        scope: rule.scope,
        threshold: rule.threshold,
        spent,
        headroom: (rule.threshold - spent).max(Decimal::ZERO),
    })
}

pub struct LimitEvaluator {
    pool: PgPool,
    audit: Arc<AuditSink>,
}

const RULE_COLUMNS: &str =
    "rule_id, account_id, user_id, scope, threshold, mcc, geo, active, created_at";

impl LimitEvaluator {
    pub fn new(pool: PgPool, audit: Arc<AuditSink>) -> Self {
        Self { pool, audit }
    }

    pub async fn create_rule(&self, rule: NewLimitRule) -> Result<LimitRule, LimitError> {
        let sql = format!(
            "INSERT INTO limit_rules_tb (account_id, user_id, scope, threshold, mcc, geo, active)
             VALUES ($1, $2, $3, $4, $5, $6, TRUE)
             RETURNING {RULE_COLUMNS}"
        );
        let created = sqlx::query_as::<_, LimitRule>(&sql)
            .bind(rule.account_id)
            .bind(rule.user_id)
            .bind(rule.scope.id())
            .bind(rule.threshold)
            .bind(rule.mcc)
            .bind(rule.geo)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    pub async fn get_rules(&self) -> Result<Vec<LimitRule>, LimitError> {
        let sql = format!("SELECT {RULE_COLUMNS} FROM limit_rules_tb ORDER BY rule_id");
        Ok(sqlx::query_as::<_, LimitRule>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Evaluate every matching active rule; abort on the first breach.
    pub async fn evaluate(
        &self,
        actor: &str,
        user_id: Option<i64>,
        request: &LimitCheckRequest,
    ) -> Result<(), LimitError> {
        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM limit_rules_tb
             WHERE active = TRUE
               AND (account_id = $1 OR user_id = $2 OR (account_id IS NULL AND user_id IS NULL))
             ORDER BY rule_id"
        );
        let rules = sqlx::query_as::<_, LimitRule>(&sql)
            .bind(request.from_account)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        for rule in rules
            .iter()
            .filter(|r| rule_matches(r, request, user_id))
        {
            let period_spent = match rule.scope {
                LimitScope::PerTransaction => Decimal::ZERO,
                LimitScope::Daily => self.period_spend(request.from_account, "day").await?,
                LimitScope::Monthly => self.period_spend(request.from_account, "month").await?,
            };

            if let Some(err) = rule_violation(rule, request.amount, period_spent) {
                self.audit
                    .record(
                        actor,
                        "LIMIT_REJECTED",
                        json!({
                            "ruleId": rule.rule_id,
                            "scope": rule.scope.as_str(),
                            "threshold": rule.threshold,
                            "spent": period_spent,
                            "amount": request.amount,
                        }),
                        None,
                    )
                    .await;
                return Err(err);
            }
        }

        self.audit
            .record(
                actor,
                "LIMIT_EVALUATED",
                json!({
                    "amount": request.amount,
                    "fromAccount": request.from_account,
                    "toAccount": request.to_account,
                }),
                None,
            )
            .await;

        Ok(())
    }

    /// Sum of amounts debited from the account since the start of the
    /// current calendar period. Always a fresh query; running totals would
    /// drift.
    async fn period_spend(&self, account_id: i64, period: &str) -> Result<Decimal, LimitError> {
        // date_trunc's field argument cannot be bound as a parameter
        let sql = format!(
            "SELECT COALESCE(SUM(amount), 0::numeric) FROM ledger_entries_tb
             WHERE debit_account = $1 AND created_at >= date_trunc('{period}', NOW())"
        );
        let spent: Decimal = sqlx::query_scalar(&sql)
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(spent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn rule(scope: LimitScope, threshold: Decimal) -> LimitRule {
        LimitRule {
            rule_id: 1,
            account_id: None,
            user_id: None,
            scope,
            threshold,
            mcc: None,
            geo: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    fn request(amount: Decimal) -> LimitCheckRequest {
        LimitCheckRequest {
            from_account: 10,
            to_account: Some(20),
            amount,
            mcc: None,
            geo: None,
        }
    }

    #[test]
    fn test_per_transaction_ceiling() {
        let r = rule(LimitScope::PerTransaction, dec!(100.00));
        assert!(rule_violation(&r, dec!(100.00), Decimal::ZERO).is_none());
        assert!(rule_violation(&r, dec!(100.01), Decimal::ZERO).is_some());
    }

    #[test]
    fn test_daily_ceiling_includes_new_amount() {
        // Threshold 100 with 80 already spent: a third 40 must be rejected
        let r = rule(LimitScope::Daily, dec!(100.00));
        assert!(rule_violation(&r, dec!(40.00), dec!(40.00)).is_none());
        let err = rule_violation(&r, dec!(40.00), dec!(80.00)).expect("should breach");
        match err {
            LimitError::Exceeded {
                scope,
                spent,
                headroom,
                ..
            } => {
                assert_eq!(scope, LimitScope::Daily);
                assert_eq!(spent, dec!(80.00));
                assert_eq!(headroom, dec!(20.00));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_monthly_headroom_clamped_at_zero() {
        let r = rule(LimitScope::Monthly, dec!(100.00));
        match rule_violation(&r, dec!(1.00), dec!(150.00)).expect("should breach") {
            LimitError::Exceeded { headroom, .. } => assert_eq!(headroom, Decimal::ZERO),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_global_rule_matches_everyone() {
        let r = rule(LimitScope::PerTransaction, dec!(100.00));
        assert!(rule_matches(&r, &request(dec!(10.00)), None));
        assert!(rule_matches(&r, &request(dec!(10.00)), Some(42)));
    }

    #[test]
    fn test_account_and_user_filters() {
        let mut r = rule(LimitScope::PerTransaction, dec!(100.00));
        r.account_id = Some(10);
        assert!(rule_matches(&r, &request(dec!(10.00)), None));
        r.account_id = Some(11);
        assert!(!rule_matches(&r, &request(dec!(10.00)), None));

        r.account_id = None;
        r.user_id = Some(42);
        assert!(rule_matches(&r, &request(dec!(10.00)), Some(42)));
        assert!(!rule_matches(&r, &request(dec!(10.00)), Some(43)));
        assert!(!rule_matches(&r, &request(dec!(10.00)), None));
    }

    #[test]
    fn test_mcc_and_geo_filters() {
        let mut r = rule(LimitScope::PerTransaction, dec!(100.00));
        r.mcc = Some(5411);
        let mut req = request(dec!(10.00));
        assert!(!rule_matches(&r, &req, None));
        req.mcc = Some(5411);
        assert!(rule_matches(&r, &req, None));

        r.geo = Some("US".to_string());
        assert!(!rule_matches(&r, &req, None));
        req.geo = Some("US".to_string());
        assert!(rule_matches(&r, &req, None));
    }
}
