//! Transfer orchestrator.
//!
//! Sequences the checks ahead of a ledger commit: KYC, fraud, card
//! controls (when a card token is present), limits, then the double-entry
//! commit. Any failing check rejects the payment with a typed reason and
//! no ledger mutation. Interbank transfers route the debit leg into the
//! clearing account and hand off to the gateway adapter; the result is
//! pending rather than success because counterparty settlement is
//! external. Audit and webhook side effects fire after the commit and
//! never affect the outcome.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::error::PaymentError;
use super::interbank::{InterbankGateway, InterbankRequest};
use super::schedule::{PaymentSchedule, ScheduleRepository, ScheduleStatus};
use super::types::{PaymentOutcome, PaymentRequest, TransferKind};
use crate::account::AccountRepository;
use crate::audit::AuditSink;
use crate::cards::CardControlService;
use crate::config::{KycConfig, SchedulerConfig};
use crate::fraud::{FraudCheckRequest, FraudEvaluator};
use crate::kyc::{KycProvider, KycStatus};
use crate::ledger::{
    Claim, IdempotencyGuard, IdempotencyStatus, LedgerStore, TransferSpec,
};
use crate::limits::{LimitCheckRequest, LimitEvaluator};
use crate::webhooks::WebhookNotifier;

const CREATE_ENDPOINT: &str = "payments.create";

pub struct PaymentService {
    store: Arc<LedgerStore>,
    guard: Arc<IdempotencyGuard>,
    limits: Arc<LimitEvaluator>,
    fraud: Arc<FraudEvaluator>,
    cards: Arc<CardControlService>,
    kyc: Arc<dyn KycProvider>,
    gateway: Arc<InterbankGateway>,
    audit: Arc<AuditSink>,
    webhooks: Arc<WebhookNotifier>,
    kyc_stub_mode: bool,
    schedule_max_attempts: i32,
}

impl PaymentService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<LedgerStore>,
        guard: Arc<IdempotencyGuard>,
        limits: Arc<LimitEvaluator>,
        fraud: Arc<FraudEvaluator>,
        cards: Arc<CardControlService>,
        kyc: Arc<dyn KycProvider>,
        gateway: Arc<InterbankGateway>,
        audit: Arc<AuditSink>,
        webhooks: Arc<WebhookNotifier>,
        kyc_config: &KycConfig,
        scheduler_config: &SchedulerConfig,
    ) -> Self {
        Self {
            store,
            guard,
            limits,
            fraud,
            cards,
            kyc,
            gateway,
            audit,
            webhooks,
            kyc_stub_mode: kyc_config.provider_mode == "stub",
            schedule_max_attempts: scheduler_config.max_attempts,
        }
    }

    /// Submit a transfer under the idempotency guard.
    ///
    /// A repeat submission with the same key and payload replays the
    /// stored outcome without re-running side effects; a different payload
    /// or a still-in-flight first attempt is a conflict. Retryable
    /// failures release the claim so the caller's retry re-executes.
    pub async fn submit_payment(
        &self,
        request: PaymentRequest,
        actor: &str,
        user_id: i64,
    ) -> Result<PaymentOutcome, PaymentError> {
        let payload = serde_json::to_value(&request)?;
        let key = request.idempotency_key.clone();
        let scope = format!("user_{user_id}");

        match self.guard.claim(&key, CREATE_ENDPOINT, &scope, &payload).await? {
            Claim::Replay(stored) => {
                info!(idempotency_key = %key, "replaying stored payment outcome");
                match stored.status {
                    IdempotencyStatus::Completed => {
                        Ok(serde_json::from_value(stored.response)?)
                    }
                    _ => Err(PaymentError::ReplayedFailure(stored.response)),
                }
            }
            Claim::Fresh => {
                let result = self.create_payment(request, actor, user_id).await;
                match &result {
                    Ok(outcome) => {
                        self.guard
                            .finalize(
                                &key,
                                CREATE_ENDPOINT,
                                &scope,
                                IdempotencyStatus::Completed,
                                &serde_json::to_value(outcome)?,
                            )
                            .await?;
                    }
                    Err(e) if e.is_retryable() => {
                        self.guard.release(&key, CREATE_ENDPOINT, &scope).await?;
                    }
                    Err(e) => {
                        self.guard
                            .finalize(
                                &key,
                                CREATE_ENDPOINT,
                                &scope,
                                IdempotencyStatus::Failed,
                                &json!({"code": e.code(), "message": e.to_string()}),
                            )
                            .await?;
                    }
                }
                result
            }
        }
    }

    /// Run the orchestration pipeline without the idempotency bracket.
    /// The ledger's own in-transaction key check still applies.
    pub async fn create_payment(
        &self,
        request: PaymentRequest,
        actor: &str,
        user_id: i64,
    ) -> Result<PaymentOutcome, PaymentError> {
        let trace_id = request.effective_trace_id();

        if request.transfer_type == TransferKind::Internal && request.to_account.is_none() {
            return Err(PaymentError::MissingRecipient);
        }

        if let Some(scheduled_for) = request.scheduled_for
            && scheduled_for > Utc::now()
        {
            return self
                .schedule_payment(request, actor, user_id, &trace_id)
                .await;
        }

        match request.transfer_type {
            TransferKind::Internal => {
                self.process_immediate(request, actor, user_id, &trace_id)
                    .await
            }
            TransferKind::Interbank => {
                self.process_interbank(request, actor, user_id, &trace_id)
                    .await
            }
        }
    }

    /// Execute a due schedule's stored payload. Called by the scheduler
    /// worker only.
    pub async fn execute_scheduled(
        &self,
        schedule: &PaymentSchedule,
    ) -> Result<PaymentOutcome, PaymentError> {
        let request: PaymentRequest = serde_json::from_value(schedule.payload.clone())?;
        let trace_id = request.effective_trace_id();
        match request.transfer_type {
            TransferKind::Internal => {
                self.process_immediate(request, &schedule.actor, schedule.user_id, &trace_id)
                    .await
            }
            TransferKind::Interbank => {
                self.process_interbank(request, &schedule.actor, schedule.user_id, &trace_id)
                    .await
            }
        }
    }

    pub async fn list_schedules(&self, user_id: i64) -> Result<Vec<PaymentSchedule>, PaymentError> {
        Ok(ScheduleRepository::list_for_user(self.store.pool(), user_id).await?)
    }

    pub async fn cancel_schedule(
        &self,
        schedule_id: i64,
        user_id: i64,
        actor: &str,
    ) -> Result<PaymentSchedule, PaymentError> {
        let schedule = ScheduleRepository::get(self.store.pool(), schedule_id)
            .await?
            .filter(|s| s.user_id == user_id)
            .ok_or(PaymentError::ScheduleNotFound(schedule_id))?;

        if !ScheduleRepository::cancel(self.store.pool(), schedule_id, user_id).await? {
            return Err(PaymentError::ScheduleNotCancellable(schedule_id));
        }

        self.audit
            .record(
                actor,
                "PAYMENT_SCHEDULED_CANCELLED",
                json!({"scheduleId": schedule_id}),
                None,
            )
            .await;

        Ok(PaymentSchedule {
            status: ScheduleStatus::Cancelled,
            ..schedule
        })
    }

    async fn process_immediate(
        &self,
        request: PaymentRequest,
        actor: &str,
        user_id: i64,
        trace_id: &str,
    ) -> Result<PaymentOutcome, PaymentError> {
        let to_account = request.to_account.ok_or(PaymentError::MissingRecipient)?;

        self.run_checks(&request, actor, user_id, trace_id).await?;

        let entry = self
            .store
            .record_transfer(
                TransferSpec {
                    debit_account_id: request.from_account,
                    credit_account_id: to_account,
                    amount: request.amount,
                    currency: request.currency.clone(),
                    idempotency_key: request.idempotency_key.clone(),
                    trace_id: Some(trace_id.to_string()),
                },
                actor,
            )
            .await?;

        self.audit
            .record(
                actor,
                "PAYMENT_COMPLETED",
                json!({
                    "fromAccount": request.from_account,
                    "toAccount": to_account,
                    "amount": request.amount,
                    "currency": request.currency,
                    "idempotencyKey": request.idempotency_key,
                    "ledgerEntryId": entry.entry_id,
                    "cardToken": request.card_token,
                    "mcc": request.mcc,
                    "geoLocation": request.geo_location,
                    "description": request.description,
                }),
                Some(trace_id),
            )
            .await;

        self.webhooks
            .notify(
                "PAYMENT_COMPLETED",
                json!({
                    "actor": actor,
                    "fromAccount": request.from_account,
                    "toAccount": to_account,
                    "amount": request.amount,
                    "currency": request.currency,
                    "idempotencyKey": request.idempotency_key,
                    "ledgerEntryId": entry.entry_id,
                    "traceId": trace_id,
                }),
            )
            .await;

        Ok(PaymentOutcome::Success {
            transaction_id: entry.entry_id,
            message: "Payment recorded successfully".to_string(),
        })
    }

    async fn process_interbank(
        &self,
        request: PaymentRequest,
        actor: &str,
        user_id: i64,
        trace_id: &str,
    ) -> Result<PaymentOutcome, PaymentError> {
        self.run_checks(&request, actor, user_id, trace_id).await?;

        let acceptance = self
            .gateway
            .initiate_transfer(&InterbankRequest {
                amount: request.amount,
                currency: request.currency.clone(),
                beneficiary_iban: request.beneficiary_iban.clone(),
                beneficiary_bank: request.beneficiary_bank.clone(),
                reference: Some(request.idempotency_key.clone()),
            })
            .await?;

        let clearing =
            AccountRepository::get_or_create_clearing_account(self.store.pool(), &request.currency)
                .await?;

        let entry = self
            .store
            .record_transfer(
                TransferSpec {
                    debit_account_id: request.from_account,
                    credit_account_id: clearing.account_id,
                    amount: request.amount,
                    currency: request.currency.clone(),
                    idempotency_key: request.idempotency_key.clone(),
                    trace_id: Some(trace_id.to_string()),
                },
                actor,
            )
            .await?;

        self.audit
            .record(
                actor,
                "INTERBANK_TRANSFER_INITIATED",
                json!({
                    "fromAccount": request.from_account,
                    "amount": request.amount,
                    "currency": request.currency,
                    "beneficiaryIban": request.beneficiary_iban,
                    "beneficiaryBank": request.beneficiary_bank,
                    "gatewayReference": acceptance.reference,
                    "ledgerEntryId": entry.entry_id,
                }),
                Some(trace_id),
            )
            .await;

        self.webhooks
            .notify(
                "INTERBANK_TRANSFER_INITIATED",
                json!({
                    "actor": actor,
                    "fromAccount": request.from_account,
                    "amount": request.amount,
                    "currency": request.currency,
                    "beneficiaryIban": request.beneficiary_iban,
                    "beneficiaryBank": request.beneficiary_bank,
                    "idempotencyKey": request.idempotency_key,
                    "ledgerEntryId": entry.entry_id,
                    "gatewayReference": acceptance.reference,
                    "traceId": trace_id,
                }),
            )
            .await;

        Ok(PaymentOutcome::Pending {
            transaction_id: entry.entry_id,
            gateway_reference: acceptance.reference,
            message: "Interbank transfer accepted for processing".to_string(),
        })
    }

    /// The shared gate sequence: KYC, fraud, card controls, limits.
    async fn run_checks(
        &self,
        request: &PaymentRequest,
        actor: &str,
        user_id: i64,
        trace_id: &str,
    ) -> Result<(), PaymentError> {
        self.ensure_kyc_verified(user_id, actor, trace_id).await?;

        self.fraud
            .validate_payment(
                actor,
                &FraudCheckRequest {
                    from_account: request.from_account,
                    to_account: request.to_account,
                    amount: request.amount,
                    currency: request.currency.clone(),
                },
                Some(trace_id),
            )
            .await?;

        if let Some(card_token) = &request.card_token {
            self.cards
                .validate_card_transaction(
                    card_token,
                    request.amount,
                    request.mcc,
                    request.geo_location.as_deref(),
                )
                .await?;
        }

        self.limits
            .evaluate(
                actor,
                Some(user_id),
                &LimitCheckRequest {
                    from_account: request.from_account,
                    to_account: request.to_account,
                    amount: request.amount,
                    mcc: request.mcc,
                    geo: request.geo_location.clone(),
                },
            )
            .await?;

        Ok(())
    }

    async fn schedule_payment(
        &self,
        request: PaymentRequest,
        actor: &str,
        user_id: i64,
        trace_id: &str,
    ) -> Result<PaymentOutcome, PaymentError> {
        let scheduled_for = request
            .scheduled_for
            .expect("schedule_payment called without a schedule time");

        // The stored payload is the request itself, minus the schedule
        // time and with the trace id pinned, so execution replays exactly
        // what was submitted.
        let mut payload_request = request.clone();
        payload_request.scheduled_for = None;
        payload_request.trace_id = Some(trace_id.to_string());
        let payload = serde_json::to_value(&payload_request)?;

        let schedule = ScheduleRepository::create(
            self.store.pool(),
            user_id,
            actor,
            scheduled_for,
            &payload,
            self.schedule_max_attempts,
        )
        .await?;

        self.audit
            .record(
                actor,
                "PAYMENT_SCHEDULED",
                json!({
                    "scheduleId": schedule.schedule_id,
                    "fromAccount": request.from_account,
                    "toAccount": request.to_account,
                    "amount": request.amount,
                    "currency": request.currency,
                    "scheduledFor": scheduled_for,
                }),
                Some(trace_id),
            )
            .await;

        Ok(PaymentOutcome::Scheduled {
            schedule_id: schedule.schedule_id,
            scheduled_for: schedule.scheduled_for,
            message: "Payment scheduled successfully".to_string(),
        })
    }

    async fn ensure_kyc_verified(
        &self,
        user_id: i64,
        actor: &str,
        trace_id: &str,
    ) -> Result<(), PaymentError> {
        let status = self.kyc.kyc_status(user_id).await?;
        let review_allowed = self.kyc_stub_mode && status == KycStatus::Review;
        if status != KycStatus::Verified && !review_allowed {
            self.audit
                .record(
                    actor,
                    "PAYMENT_KYC_BLOCKED",
                    json!({"userId": user_id, "status": status.as_str()}),
                    Some(trace_id),
                )
                .await;
            return Err(PaymentError::KycNotVerified { user_id, status });
        }
        Ok(())
    }
}
