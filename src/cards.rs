//! Card control registry: freeze state, MCC/geo whitelists, per-card
//! spending ceilings. The orchestrator consults this registry whenever a
//! payment carries a card token.

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{FromRow, PgPool};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::audit::AuditSink;
use crate::events::EventBus;

/// Card status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum CardStatus {
    Active = 1,
    Frozen = 2,
}

impl From<i16> for CardStatus {
    fn from(val: i16) -> Self {
        match val {
            2 => CardStatus::Frozen,
            _ => CardStatus::Active,
        }
    }
}

impl From<CardStatus> for i16 {
    fn from(val: CardStatus) -> i16 {
        val as i16
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CardControl {
    pub card_id: i64,
    pub account_id: i64,
    pub card_token: String,
    #[sqlx(try_from = "i16")]
    pub status: CardStatus,
    pub mcc_whitelist: Vec<i32>,
    pub geo_whitelist: Vec<String>,
    pub daily_limit: Option<Decimal>,
    pub monthly_limit: Option<Decimal>,
}

/// Typed rejection reasons, one per control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardRejection {
    Frozen,
    MccNotAllowed { mcc: i32 },
    GeoNotAllowed { geo: String },
    DailyLimitExceeded,
    MonthlyLimitExceeded,
}

impl CardRejection {
    pub fn code(&self) -> &'static str {
        match self {
            CardRejection::Frozen => "CARD_FROZEN",
            CardRejection::MccNotAllowed { .. } => "MCC_NOT_ALLOWED",
            CardRejection::GeoNotAllowed { .. } => "GEO_NOT_ALLOWED",
            CardRejection::DailyLimitExceeded => "DAILY_LIMIT_EXCEEDED",
            CardRejection::MonthlyLimitExceeded => "MONTHLY_LIMIT_EXCEEDED",
        }
    }
}

impl fmt::Display for CardRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardRejection::Frozen => write!(f, "Card is frozen"),
            CardRejection::MccNotAllowed { mcc } => {
                write!(f, "MCC {} is not allowed for this card", mcc)
            }
            CardRejection::GeoNotAllowed { geo } => {
                write!(f, "Geolocation {} is not allowed for this card", geo)
            }
            CardRejection::DailyLimitExceeded => write!(f, "Amount exceeds card daily limit"),
            CardRejection::MonthlyLimitExceeded => write!(f, "Amount exceeds card monthly limit"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CardError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Card not found")]
    CardNotFound,

    #[error("{0}")]
    Rejected(CardRejection),
}

/// Evaluate every control against a transaction. Pure so the individual
/// controls stay unit-testable.
pub fn check_card(
    card: &CardControl,
    amount: Decimal,
    mcc: Option<i32>,
    geo: Option<&str>,
) -> Result<(), CardRejection> {
    if card.status == CardStatus::Frozen {
        return Err(CardRejection::Frozen);
    }

    if let Some(mcc) = mcc
        && !card.mcc_whitelist.is_empty()
        && !card.mcc_whitelist.contains(&mcc)
    {
        return Err(CardRejection::MccNotAllowed { mcc });
    }

    if let Some(geo) = geo
        && !card.geo_whitelist.is_empty()
        && !card.geo_whitelist.iter().any(|g| g == geo)
    {
        return Err(CardRejection::GeoNotAllowed {
            geo: geo.to_string(),
        });
    }

    if let Some(daily) = card.daily_limit
        && amount > daily
    {
        return Err(CardRejection::DailyLimitExceeded);
    }

    if let Some(monthly) = card.monthly_limit
        && amount > monthly
    {
        return Err(CardRejection::MonthlyLimitExceeded);
    }

    Ok(())
}

pub struct CardControlService {
    pool: PgPool,
    audit: Arc<AuditSink>,
    events: Arc<EventBus>,
}

const CARD_COLUMNS: &str = "card_id, account_id, card_token, status, mcc_whitelist, \
                            geo_whitelist, daily_limit, monthly_limit";

impl CardControlService {
    pub fn new(pool: PgPool, audit: Arc<AuditSink>, events: Arc<EventBus>) -> Self {
        Self { pool, audit, events }
    }

    pub async fn register_card(
        &self,
        account_id: i64,
        card_token: &str,
    ) -> Result<CardControl, CardError> {
        let sql = format!(
            "INSERT INTO card_controls_tb (account_id, card_token, status)
             VALUES ($1, $2, $3)
             RETURNING {CARD_COLUMNS}"
        );
        let card = sqlx::query_as::<_, CardControl>(&sql)
            .bind(account_id)
            .bind(card_token)
            .bind(CardStatus::Active as i16)
            .fetch_one(&self.pool)
            .await?;
        Ok(card)
    }

    pub async fn freeze(&self, card_token: &str, reason: &str) -> Result<(), CardError> {
        self.set_status(card_token, CardStatus::Frozen).await?;
        let payload = json!({"event": "CARD_FROZEN", "cardToken": card_token, "reason": reason});
        self.events.emit("card_controls_events", payload.clone());
        self.audit.record("system", "CARD_FROZEN", payload, None).await;
        Ok(())
    }

    pub async fn unfreeze(&self, card_token: &str) -> Result<(), CardError> {
        self.set_status(card_token, CardStatus::Active).await?;
        let payload = json!({"event": "CARD_UNFROZEN", "cardToken": card_token});
        self.events.emit("card_controls_events", payload.clone());
        self.audit.record("system", "CARD_UNFROZEN", payload, None).await;
        Ok(())
    }

    /// Validate a card transaction against every configured control.
    /// Rejections are audited with the failing control's code.
    pub async fn validate_card_transaction(
        &self,
        card_token: &str,
        amount: Decimal,
        mcc: Option<i32>,
        geo: Option<&str>,
    ) -> Result<(), CardError> {
        let card = self.find_by_token(card_token).await?;

        if let Err(rejection) = check_card(&card, amount, mcc, geo) {
            self.audit
                .record(
                    "system",
                    "CARD_TRANSACTION_REJECTED",
                    json!({
                        "cardToken": card_token,
                        "reason": rejection.code(),
                        "amount": amount,
                        "mcc": mcc,
                        "geoLocation": geo,
                    }),
                    None,
                )
                .await;
            return Err(CardError::Rejected(rejection));
        }

        self.audit
            .record(
                "system",
                "CARD_TRANSACTION_VALIDATED",
                json!({
                    "cardToken": card_token,
                    "amount": amount,
                    "mcc": mcc,
                    "geoLocation": geo,
                }),
                None,
            )
            .await;

        Ok(())
    }

    async fn find_by_token(&self, card_token: &str) -> Result<CardControl, CardError> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM card_controls_tb WHERE card_token = $1");
        sqlx::query_as::<_, CardControl>(&sql)
            .bind(card_token)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(CardError::CardNotFound)
    }

    async fn set_status(&self, card_token: &str, status: CardStatus) -> Result<(), CardError> {
        let result = sqlx::query("UPDATE card_controls_tb SET status = $1 WHERE card_token = $2")
            .bind(status as i16)
            .bind(card_token)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CardError::CardNotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn card() -> CardControl {
        CardControl {
            card_id: 1,
            account_id: 10,
            card_token: "tok_test".to_string(),
            status: CardStatus::Active,
            mcc_whitelist: vec![],
            geo_whitelist: vec![],
            daily_limit: None,
            monthly_limit: None,
        }
    }

    #[test]
    fn test_unrestricted_card_passes() {
        assert!(check_card(&card(), dec!(50.00), Some(5411), Some("US")).is_ok());
    }

    #[test]
    fn test_frozen_card_rejected() {
        let mut c = card();
        c.status = CardStatus::Frozen;
        assert_eq!(
            check_card(&c, dec!(1.00), None, None),
            Err(CardRejection::Frozen)
        );
    }

    #[test]
    fn test_mcc_whitelist() {
        let mut c = card();
        c.mcc_whitelist = vec![5411, 5812];
        assert!(check_card(&c, dec!(10.00), Some(5411), None).is_ok());
        assert_eq!(
            check_card(&c, dec!(10.00), Some(7995), None),
            Err(CardRejection::MccNotAllowed { mcc: 7995 })
        );
        // No MCC supplied: whitelist not applicable
        assert!(check_card(&c, dec!(10.00), None, None).is_ok());
    }

    #[test]
    fn test_geo_whitelist() {
        let mut c = card();
        c.geo_whitelist = vec!["US".to_string(), "CA".to_string()];
        assert!(check_card(&c, dec!(10.00), None, Some("US")).is_ok());
        assert_eq!(
            check_card(&c, dec!(10.00), None, Some("RU")),
            Err(CardRejection::GeoNotAllowed {
                geo: "RU".to_string()
            })
        );
    }

    #[test]
    fn test_spend_ceilings() {
        let mut c = card();
        c.daily_limit = Some(dec!(100.00));
        c.monthly_limit = Some(dec!(1000.00));
        assert!(check_card(&c, dec!(100.00), None, None).is_ok());
        assert_eq!(
            check_card(&c, dec!(100.01), None, None),
            Err(CardRejection::DailyLimitExceeded)
        );

        c.daily_limit = None;
        assert_eq!(
            check_card(&c, dec!(1500.00), None, None),
            Err(CardRejection::MonthlyLimitExceeded)
        );
    }
}
