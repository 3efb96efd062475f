//! altx-ledger service entry point.
//!
//! Boot order: config -> logging -> PostgreSQL pool -> services ->
//! scheduler worker (when enabled) -> wait for shutdown signal.

use std::sync::Arc;

use altx_ledger::account::AccountRepository;
use altx_ledger::audit::AuditSink;
use altx_ledger::cards::CardControlService;
use altx_ledger::config::AppConfig;
use altx_ledger::db::Database;
use altx_ledger::events::EventBus;
use altx_ledger::fraud::FraudEvaluator;
use altx_ledger::kyc::{KycProvider, PgKycProvider};
use altx_ledger::ledger::{IdempotencyGuard, LedgerStore};
use altx_ledger::limits::LimitEvaluator;
use altx_ledger::logging;
use altx_ledger::payment::{InterbankGateway, PaymentService, SchedulerWorker};
use altx_ledger::webhooks::WebhookNotifier;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--env" && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env);
    let _log_guard = logging::init_logging(&config);

    tracing::info!(env = %env, "Starting altx-ledger");

    let db = Database::connect(&config.postgres_url).await?;
    db.health_check().await?;
    let pool = db.pool().clone();

    let audit = Arc::new(AuditSink::new(pool.clone()));
    let signing_secret = config
        .ledger
        .event_signing_enabled
        .then(|| config.ledger.event_signing_secret.clone());
    let events = Arc::new(EventBus::new(signing_secret));

    let store = Arc::new(LedgerStore::new(
        pool.clone(),
        audit.clone(),
        events.clone(),
    ));
    let guard = Arc::new(IdempotencyGuard::new(pool.clone()));
    let limits = Arc::new(LimitEvaluator::new(pool.clone(), audit.clone()));
    let fraud = Arc::new(FraudEvaluator::new(
        pool.clone(),
        audit.clone(),
        events.clone(),
    ));
    let cards = Arc::new(CardControlService::new(
        pool.clone(),
        audit.clone(),
        events.clone(),
    ));
    let kyc: Arc<dyn KycProvider> = Arc::new(PgKycProvider::new(pool.clone()));
    let gateway = Arc::new(InterbankGateway::new(config.interbank.clone()));
    let webhooks = Arc::new(WebhookNotifier::new(config.webhooks.clone()));

    // Make sure the USD system account exists before traffic arrives
    AccountRepository::get_or_create_system_account(&pool, "USD").await?;

    let payments = Arc::new(PaymentService::new(
        store,
        guard,
        limits,
        fraud,
        cards,
        kyc,
        gateway,
        audit.clone(),
        webhooks,
        &config.kyc,
        &config.scheduler,
    ));

    if config.scheduler.enabled {
        let worker = SchedulerWorker::new(
            pool.clone(),
            payments.clone(),
            audit.clone(),
            config.scheduler.clone(),
        );
        tokio::spawn(async move { worker.run().await });
    } else {
        tracing::info!("Scheduler disabled by configuration");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    Ok(())
}
