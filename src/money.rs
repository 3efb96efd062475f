//! Money Validation Module
//!
//! Unified validation of monetary amounts at the service boundary.
//! All amounts are `rust_decimal::Decimal` values with at most two
//! fractional digits, matching the NUMERIC(14,2) ledger columns.
//!
//! ## Design Principles
//! 1. Explicit Error Handling: no silent truncation or rounding
//! 2. Amounts are strictly positive once validated
//! 3. Validation happens once, at the boundary

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Fractional digits carried by every balance and entry amount
pub const MONEY_SCALE: u32 = 2;

/// Tolerance used when comparing a stored balance against a recomputed one
pub fn drift_tolerance() -> Decimal {
    Decimal::new(1, MONEY_SCALE) // 0.01
}

#[derive(Debug, Error)]
pub enum MoneyError {
    #[error("Amount must be positive")]
    NotPositive,

    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Validate an amount for use in a transfer.
///
/// Rejects zero, negative, and over-precise values. Returns the amount
/// normalized to exactly `MONEY_SCALE` fractional digits.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, MoneyError> {
    if amount <= Decimal::ZERO {
        return Err(MoneyError::NotPositive);
    }
    let normalized = amount.normalize();
    if normalized.scale() > MONEY_SCALE {
        return Err(MoneyError::PrecisionOverflow {
            provided: normalized.scale(),
            max: MONEY_SCALE,
        });
    }
    let mut result = normalized;
    result.rescale(MONEY_SCALE);
    Ok(result)
}

/// Parse a client-provided amount string, then validate it.
pub fn parse_amount(amount_str: &str) -> Result<Decimal, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }
    let amount = Decimal::from_str(amount_str)
        .map_err(|e| MoneyError::InvalidFormat(e.to_string()))?;
    validate_amount(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_amount_normalizes_scale() {
        assert_eq!(validate_amount(dec!(100)).unwrap(), dec!(100.00));
        assert_eq!(validate_amount(dec!(1.5)).unwrap(), dec!(1.50));
        assert_eq!(validate_amount(dec!(0.01)).unwrap(), dec!(0.01));
        // Trailing zeros beyond scale 2 are not over-precision
        assert_eq!(validate_amount(dec!(1.2300)).unwrap(), dec!(1.23));
    }

    #[test]
    fn test_validate_amount_rejects_non_positive() {
        assert!(matches!(
            validate_amount(Decimal::ZERO),
            Err(MoneyError::NotPositive)
        ));
        assert!(matches!(
            validate_amount(dec!(-5.00)),
            Err(MoneyError::NotPositive)
        ));
    }

    #[test]
    fn test_validate_amount_rejects_over_precision() {
        let result = validate_amount(dec!(1.005));
        assert!(matches!(
            result,
            Err(MoneyError::PrecisionOverflow {
                provided: 3,
                max: 2
            })
        ));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("100.50").unwrap(), dec!(100.50));
        assert_eq!(parse_amount(" 42 ").unwrap(), dec!(42.00));
        assert!(parse_amount("").is_err());
        assert!(parse_amount("1,000").is_err());
        assert!(parse_amount("0").is_err());
    }

    #[test]
    fn test_drift_tolerance() {
        assert_eq!(drift_tolerance(), dec!(0.01));
    }
}
