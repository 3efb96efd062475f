//! Payment schedule model and repository.
//!
//! Status transitions are driven exclusively by the scheduler worker and
//! claimed with the same CAS discipline used for account balances, so two
//! ticks can never process the same schedule.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use std::fmt;

/// Payment schedule lifecycle.
///
/// Terminal states: COMPLETED, FAILED (attempts exhausted), CANCELLED
/// (owner-initiated, only from SCHEDULED).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum ScheduleStatus {
    Scheduled = 1,
    Processing = 2,
    Completed = 3,
    Failed = 4,
    Cancelled = 5,
}

impl ScheduleStatus {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(ScheduleStatus::Scheduled),
            2 => Some(ScheduleStatus::Processing),
            3 => Some(ScheduleStatus::Completed),
            4 => Some(ScheduleStatus::Failed),
            5 => Some(ScheduleStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Scheduled => "SCHEDULED",
            ScheduleStatus::Processing => "PROCESSING",
            ScheduleStatus::Completed => "COMPLETED",
            ScheduleStatus::Failed => "FAILED",
            ScheduleStatus::Cancelled => "CANCELLED",
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScheduleStatus::Completed | ScheduleStatus::Failed | ScheduleStatus::Cancelled
        )
    }
}

impl From<i16> for ScheduleStatus {
    fn from(val: i16) -> Self {
        ScheduleStatus::from_id(val).unwrap_or(ScheduleStatus::Failed)
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PaymentSchedule {
    pub schedule_id: i64,
    pub user_id: i64,
    pub actor: String,
    #[sqlx(try_from = "i16")]
    pub status: ScheduleStatus,
    pub scheduled_for: DateTime<Utc>,
    /// The original transfer request, replayed verbatim at execution time
    pub payload: Value,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub ledger_entry_id: Option<i64>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Next execution time after a failed attempt: linear backoff in the
/// number of attempts made so far.
pub fn next_attempt_at(
    now: DateTime<Utc>,
    backoff: chrono::Duration,
    attempts: i32,
) -> DateTime<Utc> {
    now + backoff * attempts
}

const SCHEDULE_COLUMNS: &str = "schedule_id, user_id, actor, status, scheduled_for, payload, \
                                attempts, max_attempts, last_error, ledger_entry_id, \
                                processed_at, created_at, updated_at";

pub struct ScheduleRepository;

impl ScheduleRepository {
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        actor: &str,
        scheduled_for: DateTime<Utc>,
        payload: &Value,
        max_attempts: i32,
    ) -> Result<PaymentSchedule, sqlx::Error> {
        let sql = format!(
            "INSERT INTO payment_schedules_tb
                 (user_id, actor, status, scheduled_for, payload, max_attempts)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {SCHEDULE_COLUMNS}"
        );
        sqlx::query_as::<_, PaymentSchedule>(&sql)
            .bind(user_id)
            .bind(actor)
            .bind(ScheduleStatus::Scheduled.id())
            .bind(scheduled_for)
            .bind(payload)
            .bind(max_attempts)
            .fetch_one(pool)
            .await
    }

    pub async fn get(
        pool: &PgPool,
        schedule_id: i64,
    ) -> Result<Option<PaymentSchedule>, sqlx::Error> {
        let sql =
            format!("SELECT {SCHEDULE_COLUMNS} FROM payment_schedules_tb WHERE schedule_id = $1");
        sqlx::query_as::<_, PaymentSchedule>(&sql)
            .bind(schedule_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: i64,
    ) -> Result<Vec<PaymentSchedule>, sqlx::Error> {
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM payment_schedules_tb
             WHERE user_id = $1 ORDER BY scheduled_for DESC"
        );
        sqlx::query_as::<_, PaymentSchedule>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Due schedules in ascending due-time order, bounded batch.
    pub async fn find_due(
        pool: &PgPool,
        batch_size: usize,
    ) -> Result<Vec<PaymentSchedule>, sqlx::Error> {
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM payment_schedules_tb
             WHERE status = $1 AND scheduled_for <= NOW()
             ORDER BY scheduled_for ASC
             LIMIT $2"
        );
        sqlx::query_as::<_, PaymentSchedule>(&sql)
            .bind(ScheduleStatus::Scheduled.id())
            .bind(batch_size as i64)
            .fetch_all(pool)
            .await
    }

    /// Claim a due schedule for processing. Returns false when another
    /// worker already owns it.
    pub async fn claim(pool: &PgPool, schedule_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE payment_schedules_tb
            SET status = $1, updated_at = NOW()
            WHERE schedule_id = $2 AND status = $3
            "#,
        )
        .bind(ScheduleStatus::Processing.id())
        .bind(schedule_id)
        .bind(ScheduleStatus::Scheduled.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn complete(
        pool: &PgPool,
        schedule_id: i64,
        ledger_entry_id: Option<i64>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE payment_schedules_tb
            SET status = $1, ledger_entry_id = $2, processed_at = NOW(),
                last_error = NULL, updated_at = NOW()
            WHERE schedule_id = $3
            "#,
        )
        .bind(ScheduleStatus::Completed.id())
        .bind(ledger_entry_id)
        .bind(schedule_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a failed attempt: back to SCHEDULED with a later due time,
    /// or FAILED once attempts are exhausted.
    pub async fn fail_attempt(
        pool: &PgPool,
        schedule_id: i64,
        attempts: i32,
        error: &str,
        retry_at: Option<DateTime<Utc>>,
    ) -> Result<(), sqlx::Error> {
        match retry_at {
            Some(retry_at) => {
                sqlx::query(
                    r#"
                    UPDATE payment_schedules_tb
                    SET status = $1, attempts = $2, last_error = $3,
                        scheduled_for = $4, updated_at = NOW()
                    WHERE schedule_id = $5
                    "#,
                )
                .bind(ScheduleStatus::Scheduled.id())
                .bind(attempts)
                .bind(error)
                .bind(retry_at)
                .bind(schedule_id)
                .execute(pool)
                .await?;
            }
            None => {
                sqlx::query(
                    r#"
                    UPDATE payment_schedules_tb
                    SET status = $1, attempts = $2, last_error = $3, updated_at = NOW()
                    WHERE schedule_id = $4
                    "#,
                )
                .bind(ScheduleStatus::Failed.id())
                .bind(attempts)
                .bind(error)
                .bind(schedule_id)
                .execute(pool)
                .await?;
            }
        }
        Ok(())
    }

    /// Owner-initiated cancellation, only from SCHEDULED.
    pub async fn cancel(
        pool: &PgPool,
        schedule_id: i64,
        user_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE payment_schedules_tb
            SET status = $1, updated_at = NOW()
            WHERE schedule_id = $2 AND user_id = $3 AND status = $4
            "#,
        )
        .bind(ScheduleStatus::Cancelled.id())
        .bind(schedule_id)
        .bind(user_id)
        .bind(ScheduleStatus::Scheduled.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            ScheduleStatus::Scheduled,
            ScheduleStatus::Processing,
            ScheduleStatus::Completed,
            ScheduleStatus::Failed,
            ScheduleStatus::Cancelled,
        ] {
            assert_eq!(ScheduleStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(ScheduleStatus::from_id(0), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ScheduleStatus::Completed.is_terminal());
        assert!(ScheduleStatus::Failed.is_terminal());
        assert!(ScheduleStatus::Cancelled.is_terminal());
        assert!(!ScheduleStatus::Scheduled.is_terminal());
        assert!(!ScheduleStatus::Processing.is_terminal());
    }

    #[test]
    fn test_linear_backoff() {
        let now = Utc::now();
        let backoff = chrono::Duration::seconds(60);
        assert_eq!(next_attempt_at(now, backoff, 1), now + backoff);
        assert_eq!(
            next_attempt_at(now, backoff, 3),
            now + chrono::Duration::seconds(180)
        );
    }
}
