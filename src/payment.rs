use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::models::Id;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment gateway not configured")]
    NotConfigured,
    #[error("gateway: {0}")]
    Gateway(String),
}

/// The processor's view of an in-progress charge.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
    pub amount: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        order_id: Id,
    ) -> Result<PaymentIntent, PaymentError>;
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, PaymentError>;
}

/// Stripe-shaped REST gateway. The base URL is env-overridable so tests can
/// point it at a local mock server.
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

const DEFAULT_API_BASE: &str = "https://api.stripe.com";

impl StripeGateway {
    /// Returns `None` when STRIPE_SECRET_KEY is absent; callers surface that
    /// as the distinguishable "not configured" error.
    pub fn from_env() -> Option<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY").ok()?;
        let api_base =
            std::env::var("STRIPE_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Some(Self {
            client: reqwest::Client::new(),
            secret_key,
            api_base,
        })
    }

    async fn parse_intent(resp: reqwest::Response) -> Result<PaymentIntent, PaymentError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PaymentError::Gateway(format!("{status}: {body}")));
        }
        resp.json::<PaymentIntent>()
            .await
            .map_err(|e| PaymentError::Gateway(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        order_id: Id,
    ) -> Result<PaymentIntent, PaymentError> {
        let resp = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&[
                ("amount", amount_minor.to_string()),
                ("currency", currency.to_string()),
                ("metadata[order_id]", order_id.to_string()),
            ])
            .send()
            .await
            .map_err(|e| PaymentError::Gateway(e.to_string()))?;
        Self::parse_intent(resp).await
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, PaymentError> {
        let resp = self
            .client
            .get(format!("{}/v1/payment_intents/{intent_id}", self.api_base))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| PaymentError::Gateway(e.to_string()))?;
        Self::parse_intent(resp).await
    }
}

/// Decimal money to the processor's minor units (cents).
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::from(100)).round().to_i64()
}

// ---------------------------------------------------------------- webhook

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verify a `Stripe-Signature` header (`t=<unix>,v1=<hex hmac>`) against the
/// raw request body. The signed payload is `"{t}.{body}"`; any of the `v1`
/// entries may match. Timestamps outside the tolerance window are rejected.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now_unix: i64,
) -> bool {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse().ok(),
            Some(("v1", v)) => candidates.push(v),
            _ => {}
        }
    }
    let Some(t) = timestamp else { return false };
    if candidates.is_empty() || (now_unix - t).abs() > SIGNATURE_TOLERANCE_SECS {
        return false;
    }
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(t.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());
    candidates.iter().any(|c| {
        // constant-time compare over equal-length hex strings
        c.len() == expected.len()
            && c.bytes()
                .zip(expected.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    })
}

/// Helper for tests and local tooling: produce a header the verifier accepts.
pub fn sign_webhook_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

/// Subset of the processor's event envelope the webhook receiver needs.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: WebhookObject,
}

#[derive(Debug, Deserialize)]
pub struct WebhookObject {
    pub id: String,
    /// Set on checkout session objects; intent objects carry their id in `id`.
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl WebhookObject {
    /// The payment intent this event refers to.
    pub fn intent_id(&self) -> &str {
        self.payment_intent.as_deref().unwrap_or(&self.id)
    }

    pub fn order_id(&self) -> Option<Id> {
        self.metadata.get("order_id").and_then(|v| v.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    #[test]
    fn signature_roundtrip_verifies() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let now = 1_700_000_000;
        let header = sign_webhook_payload(payload, SECRET, now);
        assert!(verify_webhook_signature(payload, &header, SECRET, now));
    }

    #[test]
    fn tampered_payload_rejected() {
        let now = 1_700_000_000;
        let header = sign_webhook_payload(b"original", SECRET, now);
        assert!(!verify_webhook_signature(b"tampered", &header, SECRET, now));
    }

    #[test]
    fn stale_timestamp_rejected() {
        let payload = b"body";
        let signed_at = 1_700_000_000;
        let header = sign_webhook_payload(payload, SECRET, signed_at);
        let later = signed_at + SIGNATURE_TOLERANCE_SECS + 1;
        assert!(!verify_webhook_signature(payload, &header, SECRET, later));
    }

    #[test]
    fn malformed_header_rejected() {
        assert!(!verify_webhook_signature(b"x", "garbage", SECRET, 0));
        assert!(!verify_webhook_signature(b"x", "t=abc,v1=", SECRET, 0));
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn minor_units_rounding() {
        assert_eq!(to_minor_units(dec("35.00")), Some(3500));
        assert_eq!(to_minor_units(dec("19.99")), Some(1999));
        assert_eq!(to_minor_units(dec("10")), Some(1000));
    }

    #[test]
    fn session_event_resolves_intent_id() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{"type":"checkout.session.completed",
                "data":{"object":{"id":"cs_123","payment_intent":"pi_456",
                        "metadata":{"order_id":"9"}}}}"#,
        )
        .unwrap();
        assert_eq!(event.data.object.intent_id(), "pi_456");
        assert_eq!(event.data.object.order_id(), Some(9));
    }
}
