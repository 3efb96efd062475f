//! Scheduled payment worker.
//!
//! Polls for due schedules and drives each through the orchestrator.
//! Claims use the same CAS discipline as account balances, so overlapping
//! ticks (or a second worker instance) never double-process a schedule.

use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::orchestrator::PaymentService;
use super::schedule::{PaymentSchedule, ScheduleRepository, next_attempt_at};
use crate::audit::AuditSink;
use crate::config::SchedulerConfig;

pub struct SchedulerWorker {
    pool: PgPool,
    payments: Arc<PaymentService>,
    audit: Arc<AuditSink>,
    config: SchedulerConfig,
}

impl SchedulerWorker {
    pub fn new(
        pool: PgPool,
        payments: Arc<PaymentService>,
        audit: Arc<AuditSink>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            pool,
            payments,
            audit,
            config,
        }
    }

    /// Run the poll loop forever.
    pub async fn run(&self) -> ! {
        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            batch_size = self.config.batch_size,
            "Starting payment scheduler"
        );

        loop {
            if let Err(e) = self.tick().await {
                error!(error = %e, "Scheduler tick failed");
            }
            tokio::time::sleep(Duration::from_secs(self.config.poll_interval_secs)).await;
        }
    }

    /// Process one bounded batch of due schedules in ascending due-time
    /// order. Returns the number of schedules processed.
    pub async fn tick(&self) -> Result<usize, sqlx::Error> {
        let due = ScheduleRepository::find_due(&self.pool, self.config.batch_size).await?;
        if due.is_empty() {
            debug!("No due schedules");
            return Ok(0);
        }

        let mut processed = 0;
        for schedule in due {
            if self.process_schedule(schedule).await {
                processed += 1;
            }
        }
        Ok(processed)
    }

    /// Returns false when another worker claimed the schedule first.
    async fn process_schedule(&self, schedule: PaymentSchedule) -> bool {
        match ScheduleRepository::claim(&self.pool, schedule.schedule_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(
                    schedule_id = schedule.schedule_id,
                    "Schedule already claimed"
                );
                return false;
            }
            Err(e) => {
                error!(schedule_id = schedule.schedule_id, error = %e, "Claim failed");
                return false;
            }
        }

        match self.payments.execute_scheduled(&schedule).await {
            Ok(outcome) => {
                let entry_id = outcome.transaction_id();
                if let Err(e) =
                    ScheduleRepository::complete(&self.pool, schedule.schedule_id, entry_id).await
                {
                    error!(schedule_id = schedule.schedule_id, error = %e, "Completion update failed");
                }
                info!(
                    schedule_id = schedule.schedule_id,
                    ledger_entry_id = entry_id,
                    "Scheduled payment executed"
                );
                self.audit
                    .record(
                        &schedule.actor,
                        "PAYMENT_SCHEDULED_EXECUTED",
                        json!({
                            "scheduleId": schedule.schedule_id,
                            "ledgerEntryId": entry_id,
                        }),
                        None,
                    )
                    .await;
            }
            Err(e) => {
                let attempts = schedule.attempts + 1;
                let exhausted = attempts >= schedule.max_attempts;
                let retry_at = if exhausted {
                    None
                } else {
                    Some(next_attempt_at(
                        chrono::Utc::now(),
                        chrono::Duration::seconds(self.config.retry_backoff_secs as i64),
                        attempts,
                    ))
                };

                warn!(
                    schedule_id = schedule.schedule_id,
                    attempts = attempts,
                    exhausted = exhausted,
                    error = %e,
                    "Scheduled payment failed"
                );

                if let Err(db_err) = ScheduleRepository::fail_attempt(
                    &self.pool,
                    schedule.schedule_id,
                    attempts,
                    &e.to_string(),
                    retry_at,
                )
                .await
                {
                    error!(schedule_id = schedule.schedule_id, error = %db_err, "Failure update failed");
                }

                self.audit
                    .record(
                        &schedule.actor,
                        "PAYMENT_SCHEDULED_FAILED",
                        json!({
                            "scheduleId": schedule.schedule_id,
                            "attempts": attempts,
                            "lastError": e.to_string(),
                        }),
                        None,
                    )
                    .await;
            }
        }
        true
    }
}
