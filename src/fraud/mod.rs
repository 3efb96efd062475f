//! Heuristic fraud risk scoring.
//!
//! Four independent, short-circuit-free signals are scored over ledger
//! history and summed; a total at or above `REJECT_THRESHOLD` rejects the
//! payment. This is a transparent, explainable scoring function, not a
//! learned model: the exact bands are constants and unit-tested.

pub mod evaluator;
pub mod scoring;

pub use evaluator::{FraudCheckRequest, FraudError, FraudEvaluator};
pub use scoring::{amount_score, pattern_score, round_amount_score, velocity_score};

/// Total risk score at which a payment is rejected
pub const REJECT_THRESHOLD: u32 = 70;
