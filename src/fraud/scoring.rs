//! Pure scoring bands.
//!
//! Every band takes the already-aggregated history values, so the exact
//! thresholds stay reproducible in unit tests without a database.

use rust_decimal::Decimal;

/// Velocity: debit count in the last five minutes and the last hour.
pub fn velocity_score(five_min_count: i64, one_hour_count: i64) -> (u32, Vec<String>) {
    let mut score = 0;
    let mut reasons = Vec::new();

    if five_min_count >= 5 {
        score += 50;
        reasons.push(format!(
            "Too many transactions in the last 5 minutes: {}",
            five_min_count
        ));
    } else if five_min_count >= 3 {
        score += 20;
    }

    if one_hour_count >= 20 {
        score += 40;
        reasons.push(format!(
            "Too many transactions in the last hour: {}",
            one_hour_count
        ));
    } else if one_hour_count >= 10 {
        score += 15;
    }

    (score, reasons)
}

/// Amount anomaly against the 30-day average and maximum debit.
pub fn amount_score(
    amount: Decimal,
    avg_amount: Option<Decimal>,
    max_amount: Option<Decimal>,
) -> (u32, Vec<String>) {
    let mut score = 0;
    let mut reasons = Vec::new();

    if let Some(avg) = avg_amount.filter(|a| *a > Decimal::ZERO) {
        if amount > avg * Decimal::from(10) {
            score += 40;
            reasons.push(format!(
                "Transaction amount exceeds average by 10x (average: {}, current: {})",
                avg.round_dp(2),
                amount
            ));
        } else if amount > avg * Decimal::from(5) {
            score += 20;
        }
    }

    if let Some(max) = max_amount.filter(|m| *m > Decimal::ZERO)
        && amount > max * Decimal::from(2)
    {
        score += 30;
        reasons.push(format!(
            "Transaction amount exceeds historical maximum by 2x (max: {}, current: {})",
            max.round_dp(2),
            amount
        ));
    }

    (score, reasons)
}

/// Pattern repetition: identical-amount transfers to the same counterparty
/// in the last 24 hours.
pub fn pattern_score(similar_count: i64) -> (u32, Option<String>) {
    if similar_count >= 5 {
        (
            50,
            Some(format!(
                "Found {} similar transactions in the last 24 hours",
                similar_count
            )),
        )
    } else if similar_count >= 3 {
        (25, None)
    } else {
        (0, None)
    }
}

const VERY_ROUND_AMOUNTS: [i64; 7] = [100, 500, 1_000, 5_000, 10_000, 50_000, 100_000];

/// Round-amount heuristic: suspiciously "clean" large amounts.
pub fn round_amount_score(amount: Decimal) -> (u32, Option<String>) {
    let is_round = amount.fract().is_zero();
    let is_very_round = is_round
        && VERY_ROUND_AMOUNTS
            .iter()
            .any(|v| amount == Decimal::from(*v));

    if is_very_round && amount >= Decimal::from(1_000) {
        (15, Some(format!("Suspicious round amount detected: {}", amount)))
    } else if is_round && amount >= Decimal::from(10_000) {
        (10, None)
    } else {
        (0, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_velocity_bands() {
        assert_eq!(velocity_score(0, 0).0, 0);
        assert_eq!(velocity_score(2, 5).0, 0);
        assert_eq!(velocity_score(3, 0).0, 20);
        assert_eq!(velocity_score(5, 0).0, 50);
        assert_eq!(velocity_score(0, 10).0, 15);
        assert_eq!(velocity_score(0, 20).0, 40);
        // Both windows hot
        assert_eq!(velocity_score(5, 20).0, 90);
        assert_eq!(velocity_score(5, 20).1.len(), 2);
    }

    #[test]
    fn test_amount_bands() {
        // No history: nothing to compare against
        assert_eq!(amount_score(dec!(1000.00), None, None).0, 0);
        assert_eq!(
            amount_score(dec!(1000.00), Some(Decimal::ZERO), Some(Decimal::ZERO)).0,
            0
        );

        // 10x average
        assert_eq!(amount_score(dec!(1001.00), Some(dec!(100)), None).0, 40);
        // 5x average
        assert_eq!(amount_score(dec!(501.00), Some(dec!(100)), None).0, 20);
        // Under 5x
        assert_eq!(amount_score(dec!(499.00), Some(dec!(100)), None).0, 0);

        // 2x historical max
        assert_eq!(amount_score(dec!(401.00), None, Some(dec!(200))).0, 30);

        // Both signals accumulate
        assert_eq!(
            amount_score(dec!(1001.00), Some(dec!(100)), Some(dec!(500))).0,
            70
        );
    }

    #[test]
    fn test_pattern_bands() {
        assert_eq!(pattern_score(0).0, 0);
        assert_eq!(pattern_score(2).0, 0);
        assert_eq!(pattern_score(3).0, 25);
        assert_eq!(pattern_score(4).0, 25);
        let (score, reason) = pattern_score(5);
        assert_eq!(score, 50);
        assert!(reason.unwrap().contains("5 similar"));
    }

    #[test]
    fn test_round_amount_bands() {
        // Very round and large
        assert_eq!(round_amount_score(dec!(1000)).0, 15);
        assert_eq!(round_amount_score(dec!(5000.00)).0, 15);
        assert_eq!(round_amount_score(dec!(100000)).0, 15);
        // Very round but small
        assert_eq!(round_amount_score(dec!(100)).0, 0);
        assert_eq!(round_amount_score(dec!(500)).0, 0);
        // Round and large but not on the watch list
        assert_eq!(round_amount_score(dec!(12000)).0, 10);
        // Not round
        assert_eq!(round_amount_score(dec!(1000.50)).0, 0);
        assert_eq!(round_amount_score(dec!(999.99)).0, 0);
    }
}
