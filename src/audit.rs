//! Append-only audit sink.
//!
//! Every domain rejection and every committed transfer produces an audit
//! record; nothing material happens silently. Writes are fire-and-forget:
//! a failed insert is logged and never propagated into the operation that
//! produced it.

use serde_json::Value;
use sqlx::PgPool;
use tracing::warn;

pub struct AuditSink {
    pool: PgPool,
}

impl AuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, actor: &str, action: &str, payload: Value, trace_id: Option<&str>) {
        let result = sqlx::query(
            r#"
            INSERT INTO audit_log_tb (actor, action, payload, trace_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(actor)
        .bind(action)
        .bind(&payload)
        .bind(trace_id)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(actor = actor, action = action, error = %e, "audit record failed");
        }
    }
}
