//! Decoding and authenticating Chapa webhook deliveries.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use crate::error::PaymentError;

type HmacSha256 = Hmac<Sha256>;

/// The only event that carries a charge outcome.
pub const CHARGE_COMPLETED: &str = "charge.completed";

/// Header carrying hex(HMAC-SHA256(secret, raw body)).
pub const SIGNATURE_HEADER: &str = "x-chapa-signature";

/// Charge outcome reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeStatus {
    Success,
    Failed,
    Other(String),
}

impl From<&str> for ChargeStatus {
    fn from(s: &str) -> Self {
        match s {
            "success" => ChargeStatus::Success,
            "failed" => ChargeStatus::Failed,
            other => ChargeStatus::Other(other.to_string()),
        }
    }
}

/// A decoded delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    Charge { status: ChargeStatus, tx_ref: String },
    /// Any event other than `charge.completed`.
    Other(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    event: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
struct ChargeData {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    tx_ref: Option<String>,
}

/// Decode a raw webhook body.
///
/// Only the envelope must be valid JSON for non-charge events; a
/// `charge.completed` event additionally needs string `status` and `tx_ref`
/// fields under `data`.
pub fn decode(body: &[u8]) -> Result<WebhookEvent, PaymentError> {
    let envelope: Envelope = serde_json::from_slice(body)
        .map_err(|e| PaymentError::MalformedWebhook(format!("invalid JSON: {e}")))?;

    let event = match envelope.event {
        Some(Value::String(event)) => event,
        Some(other) => return Ok(WebhookEvent::Other(other.to_string())),
        None => return Ok(WebhookEvent::Other(String::new())),
    };
    if event != CHARGE_COMPLETED {
        return Ok(WebhookEvent::Other(event));
    }

    let data = envelope
        .data
        .ok_or_else(|| PaymentError::MalformedWebhook("missing data object".to_string()))?;
    if !data.is_object() {
        return Err(PaymentError::MalformedWebhook(
            "data must be an object".to_string(),
        ));
    }
    let data: ChargeData = serde_json::from_value(data)
        .map_err(|e| PaymentError::MalformedWebhook(format!("invalid data object: {e}")))?;

    let status = data
        .status
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PaymentError::MalformedWebhook("missing data.status".to_string()))?;
    let tx_ref = data
        .tx_ref
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PaymentError::MalformedWebhook("missing data.tx_ref".to_string()))?;

    Ok(WebhookEvent::Charge {
        status: ChargeStatus::from(status.as_str()),
        tx_ref,
    })
}

/// Compute the hex HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    mac.finalize()
        .into_bytes()
        .iter()
        .fold(String::new(), |mut s, b| {
            use std::fmt::Write;
            let _ = write!(s, "{b:02x}");
            s
        })
}

/// Check a webhook signature in constant time.
pub fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    // Undecodable hex is compared as all zeros.
    let expected = decode_hex(signature.trim()).unwrap_or_else(|| vec![0u8; 32]);
    mac.verify_slice(&expected).is_ok()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || !s.is_ascii() {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}
