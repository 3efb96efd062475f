//! Ledger store: durable accounts and immutable double-entry records.
//!
//! All balance mutations flow through `LedgerStore::record_transfer`,
//! which runs as a single atomic transaction with compare-and-swap
//! version checks on both account legs.

pub mod entry;
pub mod error;
pub mod idempotency;
pub mod store;

pub use entry::LedgerEntry;
pub use error::LedgerError;
pub use idempotency::{
    Claim, IdempotencyError, IdempotencyGuard, IdempotencyStatus, StoredOutcome, fingerprint,
    validate_idempotency_key,
};
pub use store::{BalanceVerification, LedgerStore, ReconcileOutcome, TransferSpec};
