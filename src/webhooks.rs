//! Best-effort webhook notifier.
//!
//! Delivers signed event notifications to a configured endpoint. Delivery
//! failure is logged and never affects the result of the operation that
//! triggered it.

use crate::config::WebhookConfig;
use crate::events::sign_payload;
use serde_json::{Value, json};
use tracing::warn;

pub struct WebhookNotifier {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub async fn notify(&self, event: &str, payload: Value) {
        if !self.config.enabled || self.config.url.is_empty() {
            return;
        }

        let body = json!({
            "event": event,
            "payload": payload,
            "emittedAt": chrono::Utc::now().to_rfc3339(),
        });
        let signature = if self.config.secret.is_empty() {
            String::new()
        } else {
            sign_payload(&body, &self.config.secret)
        };

        let result = self
            .client
            .post(&self.config.url)
            .header("X-Webhook-Signature", signature)
            .json(&body)
            .send()
            .await;

        if let Err(e) = result {
            warn!(event = event, error = %e, "webhook dispatch failed");
        }
    }
}
