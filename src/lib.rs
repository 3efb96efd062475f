//! altx-ledger: Ledger & Payment Orchestration Engine
//!
//! Moves money between accounts with correctness guarantees under
//! concurrency, duplicate submission, fraud risk, spending limits and
//! deferred execution.
//!
//! # Modules
//!
//! - [`account`] - versioned-balance accounts and system account provisioning
//! - [`ledger`] - the ledger store (atomic CAS transfers) and idempotency guard
//! - [`limits`] - spending limit rules evaluated against fresh aggregates
//! - [`fraud`] - heuristic risk scoring over ledger history
//! - [`payment`] - the transfer orchestrator, scheduler and interbank gateway
//! - [`kyc`], [`cards`] - external collaborator contracts
//! - [`audit`], [`events`], [`webhooks`] - side-effect sinks

pub mod account;
pub mod audit;
pub mod cards;
pub mod config;
pub mod db;
pub mod events;
pub mod fraud;
pub mod kyc;
pub mod ledger;
pub mod limits;
pub mod logging;
pub mod money;
pub mod payment;
pub mod retry;
pub mod webhooks;

// Convenient re-exports at crate root
pub use account::{Account, AccountRepository, AccountStatus};
pub use config::AppConfig;
pub use db::Database;
pub use ledger::{
    IdempotencyGuard, LedgerEntry, LedgerError, LedgerStore, TransferSpec,
};
pub use payment::{
    PaymentError, PaymentOutcome, PaymentRequest, PaymentService, SchedulerWorker, TransferKind,
};
