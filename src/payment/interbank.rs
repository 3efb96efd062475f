//! Interbank gateway adapter.
//!
//! Wraps external-transfer initiation behind a bounded retry. The stub
//! mode simulates the settlement network, including a configurable random
//! failure rate used to exercise the retry path; real mode is a
//! placeholder acceptance until credentials are wired in.

use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::InterbankConfig;
use crate::retry::{RetryOptions, retry};

#[derive(Debug, Clone)]
pub struct InterbankRequest {
    pub amount: Decimal,
    pub currency: String,
    pub beneficiary_iban: Option<String>,
    pub beneficiary_bank: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GatewayAcceptance {
    pub status: String,
    pub reference: String,
    pub provider: String,
    pub mode: String,
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Simulated interbank gateway failure")]
    Simulated,
}

pub struct InterbankGateway {
    config: InterbankConfig,
}

impl InterbankGateway {
    pub fn new(config: InterbankConfig) -> Self {
        Self { config }
    }

    pub async fn initiate_transfer(
        &self,
        request: &InterbankRequest,
    ) -> Result<GatewayAcceptance, GatewayError> {
        if self.config.mode != "real" {
            let options = RetryOptions {
                attempts: self.config.retry_max_attempts,
                backoff: Duration::from_millis(self.config.retry_backoff_ms),
            };
            return retry(options, || self.stub_transfer(request)).await;
        }

        Ok(GatewayAcceptance {
            status: "PENDING".to_string(),
            reference: Uuid::new_v4().to_string(),
            provider: self.config.provider.clone(),
            mode: "real".to_string(),
        })
    }

    async fn stub_transfer(
        &self,
        request: &InterbankRequest,
    ) -> Result<GatewayAcceptance, GatewayError> {
        if rand::random::<f64>() < self.config.stub_failure_rate {
            warn!("Stubbed interbank transfer failed (simulated)");
            return Err(GatewayError::Simulated);
        }

        info!(
            amount = %request.amount,
            currency = %request.currency,
            "Stubbed interbank transfer accepted"
        );

        Ok(GatewayAcceptance {
            status: "ACCEPTED".to_string(),
            reference: Uuid::new_v4().to_string(),
            provider: "stub".to_string(),
            mode: "stub".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> InterbankRequest {
        InterbankRequest {
            amount: dec!(250.00),
            currency: "EUR".to_string(),
            beneficiary_iban: Some("DE89370400440532013000".to_string()),
            beneficiary_bank: Some("COBADEFFXXX".to_string()),
            reference: None,
        }
    }

    #[tokio::test]
    async fn test_stub_accepts_when_failure_rate_zero() {
        let gateway = InterbankGateway::new(InterbankConfig {
            stub_failure_rate: 0.0,
            ..InterbankConfig::default()
        });
        let acceptance = gateway.initiate_transfer(&request()).await.unwrap();
        assert_eq!(acceptance.status, "ACCEPTED");
        assert_eq!(acceptance.mode, "stub");
        assert!(!acceptance.reference.is_empty());
    }

    #[tokio::test]
    async fn test_stub_exhausts_retries_when_failure_rate_one() {
        let gateway = InterbankGateway::new(InterbankConfig {
            stub_failure_rate: 1.0,
            retry_max_attempts: 2,
            retry_backoff_ms: 1,
            ..InterbankConfig::default()
        });
        let result = gateway.initiate_transfer(&request()).await;
        assert!(matches!(result, Err(GatewayError::Simulated)));
    }

    #[tokio::test]
    async fn test_real_mode_returns_pending_placeholder() {
        let gateway = InterbankGateway::new(InterbankConfig {
            mode: "real".to_string(),
            provider: "swift".to_string(),
            ..InterbankConfig::default()
        });
        let acceptance = gateway.initiate_transfer(&request()).await.unwrap();
        assert_eq!(acceptance.status, "PENDING");
        assert_eq!(acceptance.provider, "swift");
    }
}
