//! Spending limit rules and their evaluator

pub mod evaluator;
pub mod models;

pub use evaluator::{LimitCheckRequest, LimitError, LimitEvaluator};
pub use models::{LimitRule, LimitScope, NewLimitRule};
