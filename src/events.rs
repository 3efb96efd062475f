//! Domain event publishing.
//!
//! Events are emitted after state changes commit (transaction success,
//! fraud alerts, card control changes). Delivery is at-least-once from the
//! consumer's point of view and never blocks or rolls back the state
//! change that produced the event.
//!
//! When signing is configured, payloads carry an HMAC-SHA256 `signature`
//! (plus `signatureAlg`) computed over the payload with the signature
//! fields themselves excluded, so downstream consumers can verify
//! authenticity without a transport-level trust boundary.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use std::sync::Arc;
use tracing::info;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_FIELD: &str = "signature";
pub const SIGNATURE_ALG_FIELD: &str = "signatureAlg";
pub const SIGNATURE_ALG: &str = "HMAC-SHA256";

/// Compute the hex HMAC-SHA256 signature of a payload, excluding any
/// existing signature fields.
pub fn sign_payload(payload: &Value, secret: &str) -> String {
    let mut sanitized = payload.clone();
    if let Some(map) = sanitized.as_object_mut() {
        map.remove(SIGNATURE_FIELD);
        map.remove(SIGNATURE_ALG_FIELD);
    }
    let bytes = serde_json::to_vec(&sanitized).unwrap_or_default();
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(&bytes);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a payload's embedded signature. Returns false when the field is
/// missing or does not match.
pub fn verify_payload_signature(payload: &Value, secret: &str) -> bool {
    match payload.get(SIGNATURE_FIELD).and_then(Value::as_str) {
        Some(signature) => sign_payload(payload, secret) == signature,
        None => false,
    }
}

/// Transport seam for published events.
pub trait EventSink: Send + Sync {
    fn publish(&self, topic: &str, payload: &Value);
}

/// Default sink: structured log line per event.
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, topic: &str, payload: &Value) {
        info!(topic = topic, payload = %payload, "event published");
    }
}

/// Event bus with optional payload signing.
pub struct EventBus {
    sink: Arc<dyn EventSink>,
    signing_secret: Option<String>,
}

impl EventBus {
    pub fn new(signing_secret: Option<String>) -> Self {
        Self {
            sink: Arc::new(LogSink),
            signing_secret,
        }
    }

    pub fn with_sink(sink: Arc<dyn EventSink>, signing_secret: Option<String>) -> Self {
        Self {
            sink,
            signing_secret,
        }
    }

    pub fn emit(&self, topic: &str, mut payload: Value) {
        if let Some(secret) = &self.signing_secret {
            let signature = sign_payload(&payload, secret);
            if let Some(map) = payload.as_object_mut() {
                map.insert(SIGNATURE_FIELD.to_string(), Value::String(signature));
                map.insert(
                    SIGNATURE_ALG_FIELD.to_string(),
                    Value::String(SIGNATURE_ALG.to_string()),
                );
            }
        }
        self.sink.publish(topic, &payload);
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Test sink that records every published event.
    #[derive(Default)]
    pub struct CollectSink {
        pub events: Mutex<Vec<(String, Value)>>,
    }

    impl EventSink for CollectSink {
        fn publish(&self, topic: &str, payload: &Value) {
            self.events
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let mut payload = json!({"type": "TRANSACTION_SUCCESS", "entryId": 7, "amount": "100.00"});
        let signature = sign_payload(&payload, "secret");
        payload
            .as_object_mut()
            .unwrap()
            .insert(SIGNATURE_FIELD.into(), Value::String(signature));

        assert!(verify_payload_signature(&payload, "secret"));
        assert!(!verify_payload_signature(&payload, "other-secret"));
    }

    #[test]
    fn test_signature_excludes_signature_fields() {
        let unsigned = json!({"type": "FRAUD_ALERT", "riskScore": 85});
        let mut signed = unsigned.clone();
        signed
            .as_object_mut()
            .unwrap()
            .insert(SIGNATURE_FIELD.into(), Value::String("bogus".into()));
        signed
            .as_object_mut()
            .unwrap()
            .insert(SIGNATURE_ALG_FIELD.into(), Value::String(SIGNATURE_ALG.into()));

        assert_eq!(
            sign_payload(&unsigned, "secret"),
            sign_payload(&signed, "secret")
        );
    }

    #[test]
    fn test_verify_missing_signature() {
        let payload = json!({"type": "TRANSACTION_SUCCESS"});
        assert!(!verify_payload_signature(&payload, "secret"));
    }

    #[test]
    fn test_bus_attaches_signature_when_configured() {
        let sink = Arc::new(testing::CollectSink::default());
        let bus = EventBus::with_sink(sink.clone(), Some("secret".to_string()));
        bus.emit("transactions", json!({"type": "TRANSACTION_SUCCESS", "entryId": 1}));

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        let (topic, payload) = &events[0];
        assert_eq!(topic, "transactions");
        assert_eq!(payload[SIGNATURE_ALG_FIELD], SIGNATURE_ALG);
        assert!(verify_payload_signature(payload, "secret"));
    }

    #[test]
    fn test_bus_leaves_payload_unsigned_by_default() {
        let sink = Arc::new(testing::CollectSink::default());
        let bus = EventBus::with_sink(sink.clone(), None);
        bus.emit("transactions", json!({"type": "TRANSACTION_SUCCESS"}));

        let events = sink.events.lock().unwrap();
        assert!(events[0].1.get(SIGNATURE_FIELD).is_none());
    }
}
