//! # Stripe Webhook Handling
//!
//! Signature verification and dispatch for Stripe webhooks.
//! Webhooks notify the server of PaymentIntent outcomes and refunds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};
use wd_core::{Currency, StorefrontError, StorefrontResult};

/// Maximum age of a signed payload, in seconds
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Webhook event types the storefront understands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookEventType {
    PaymentSucceeded,
    PaymentFailed,
    RefundIssued,
    Unknown(String),
}

impl WebhookEventType {
    fn from_stripe(event_type: &str) -> Self {
        match event_type {
            "payment_intent.succeeded" => WebhookEventType::PaymentSucceeded,
            "payment_intent.payment_failed" => WebhookEventType::PaymentFailed,
            "charge.refunded" => WebhookEventType::RefundIssued,
            other => WebhookEventType::Unknown(other.to_string()),
        }
    }
}

/// A verified webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event_id: String,
    pub event_type: WebhookEventType,
    pub payment_intent_id: Option<String>,
    /// Amount in minor units (the refunded amount for refunds)
    pub amount: Option<i64>,
    pub currency: Option<Currency>,
    pub metadata: HashMap<String, String>,
    /// Failure reason reported for failed payments
    pub failure_message: Option<String>,
    pub raw_data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl WebhookEvent {
    /// Storefront user that started the payment, from intent metadata
    pub fn user_id(&self) -> Option<u64> {
        self.metadata.get("userId").and_then(|v| v.parse().ok())
    }
}

/// Verifies `Stripe-Signature` headers against the endpoint secret
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verify and parse a webhook payload
    pub fn verify(&self, payload: &[u8], signature: &str) -> StorefrontResult<WebhookEvent> {
        self.verify_at(payload, signature, Utc::now().timestamp())
    }

    /// Verify against an explicit clock
    #[instrument(skip(self, payload, signature))]
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature: &str,
        now: i64,
    ) -> StorefrontResult<WebhookEvent> {
        let sig_parts = parse_signature_header(signature)?;

        let timestamp = sig_parts.timestamp;
        if now.abs_diff(timestamp) > SIGNATURE_TOLERANCE_SECS as u64 {
            return Err(StorefrontError::WebhookVerificationFailed(
                "Timestamp outside tolerance".to_string(),
            ));
        }

        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let expected_sig = compute_hmac_sha256(&self.secret, &signed_payload)?;

        let valid = sig_parts
            .signatures
            .iter()
            .any(|sig| constant_time_compare(sig, &expected_sig));

        if !valid {
            return Err(StorefrontError::WebhookVerificationFailed(
                "Signature mismatch".to_string(),
            ));
        }

        let event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            StorefrontError::WebhookParseError(format!("Failed to parse webhook: {}", e))
        })?;

        debug!("Verified Stripe webhook: type={}", event.event_type);

        Ok(event.into_webhook_event())
    }
}

/// Webhook event handler trait
///
/// Implement this trait to react to payment events.
#[allow(unused_variables)]
pub trait WebhookHandler: Send + Sync {
    /// Called when a payment succeeds
    fn on_payment_succeeded(&self, event: &WebhookEvent) -> StorefrontResult<()> {
        info!(
            "Payment succeeded: {:?} amount={:?}",
            event.payment_intent_id, event.amount
        );
        Ok(())
    }

    /// Called when a payment fails
    fn on_payment_failed(&self, event: &WebhookEvent) -> StorefrontResult<()> {
        warn!(
            "Payment failed: {:?} reason={:?}",
            event.payment_intent_id, event.failure_message
        );
        Ok(())
    }

    /// Called when a refund is issued
    fn on_refund_issued(&self, event: &WebhookEvent) -> StorefrontResult<()> {
        info!("Refund issued: {:?}", event.payment_intent_id);
        Ok(())
    }

    /// Called for unknown/unhandled events
    fn on_unknown_event(&self, event: &WebhookEvent) -> StorefrontResult<()> {
        debug!("Unhandled webhook event: {:?}", event.event_type);
        Ok(())
    }
}

/// Default webhook handler (just logs events)
pub struct LoggingWebhookHandler;

impl WebhookHandler for LoggingWebhookHandler {}

/// Dispatch a webhook event to the appropriate handler method
pub fn dispatch_webhook_event(
    handler: &dyn WebhookHandler,
    event: &WebhookEvent,
) -> StorefrontResult<()> {
    match &event.event_type {
        WebhookEventType::PaymentSucceeded => handler.on_payment_succeeded(event),
        WebhookEventType::PaymentFailed => handler.on_payment_failed(event),
        WebhookEventType::RefundIssued => handler.on_refund_issued(event),
        WebhookEventType::Unknown(_) => handler.on_unknown_event(event),
    }
}

/// Events to enable on the Stripe webhook endpoint
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &[
    "payment_intent.succeeded",
    "payment_intent.payment_failed",
    "charge.refunded",
];

// =============================================================================
// Stripe Event Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Map<String, serde_json::Value>,
}

impl StripeWebhookEvent {
    fn into_webhook_event(self) -> WebhookEvent {
        let event_type = WebhookEventType::from_stripe(&self.event_type);
        let obj = &self.data.object;
        let str_field = |key: &str| obj.get(key).and_then(|v| v.as_str()).map(String::from);

        // PaymentIntent events carry the intent itself; charge events point at it
        let (payment_intent_id, amount) = match event_type {
            WebhookEventType::RefundIssued => (
                str_field("payment_intent"),
                obj.get("amount_refunded").and_then(|v| v.as_i64()),
            ),
            _ => (
                if self.event_type.starts_with("payment_intent.") {
                    str_field("id")
                } else {
                    str_field("payment_intent")
                },
                obj.get("amount").and_then(|v| v.as_i64()),
            ),
        };

        let currency = obj
            .get("currency")
            .and_then(|v| v.as_str())
            .and_then(Currency::from_code);

        let metadata = obj
            .get("metadata")
            .and_then(|m| m.as_object())
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        let failure_message = obj
            .get("last_payment_error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .map(String::from);

        WebhookEvent {
            event_id: self.id,
            event_type,
            payment_intent_id,
            amount,
            currency,
            metadata,
            failure_message,
            raw_data: Some(serde_json::Value::Object(self.data.object)),
            timestamp: DateTime::from_timestamp(self.created, 0).unwrap_or_else(Utc::now),
        }
    }
}

// =============================================================================
// Webhook Signature Verification
// =============================================================================

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> StorefrontResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        StorefrontError::WebhookVerificationFailed("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(StorefrontError::WebhookVerificationFailed(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Hex-encoded HMAC-SHA256 of `message`
pub fn compute_hmac_sha256(secret: &str, message: &str) -> StorefrontResult<String> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| StorefrontError::Internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
