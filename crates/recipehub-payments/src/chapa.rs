//! Outbound client for Chapa's "initialize transaction" endpoint.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PaymentError;
use crate::types::Currency;

pub const DEFAULT_CHAPA_BASE_URL: &str = "https://api.chapa.co/v1";

/// Parameters for a single checkout initialization.
#[derive(Debug, Clone)]
pub struct InitializeTransaction {
    pub amount: Decimal,
    pub currency: Currency,
    pub tx_ref: String,
    pub callback_url: String,
    pub return_url: String,
}

/// A hosted-checkout payment gateway.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Register the transaction with the gateway and return its checkout URL.
    /// Never retries.
    async fn initialize(&self, tx: &InitializeTransaction) -> Result<String, PaymentError>;
}

#[derive(Clone)]
pub struct ChapaConfig {
    pub base_url: String,
    pub secret_key: String,
    /// Shown on the hosted checkout page.
    pub checkout_title: String,
    pub checkout_description: String,
}

impl ChapaConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_CHAPA_BASE_URL.to_string(),
            secret_key: secret_key.into(),
            checkout_title: "Recipe Purchase".to_string(),
            checkout_description: "Payment for recipe purchase".to_string(),
        }
    }
}

impl std::fmt::Debug for ChapaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChapaConfig")
            .field("base_url", &self.base_url)
            .field("secret_key", &"[REDACTED]")
            .field("checkout_title", &self.checkout_title)
            .field("checkout_description", &self.checkout_description)
            .finish()
    }
}

#[derive(Serialize)]
struct InitializeBody<'a> {
    amount: String,
    currency: Currency,
    tx_ref: &'a str,
    callback_url: &'a str,
    return_url: &'a str,
    customization: Customization<'a>,
}

#[derive(Serialize)]
struct Customization<'a> {
    title: &'a str,
    description: &'a str,
}

#[derive(Deserialize)]
struct ChapaResponse {
    #[serde(default)]
    data: Option<CheckoutData>,
    #[serde(default)]
    message: Value,
}

#[derive(Deserialize)]
struct CheckoutData {
    checkout_url: String,
}

/// Chapa gateway client. Holds the shared, pooled HTTP client.
pub struct ChapaClient {
    http: reqwest::Client,
    config: ChapaConfig,
}

impl ChapaClient {
    /// `http` must carry a bounded timeout; it is the only timeout applied.
    pub fn new(http: reqwest::Client, config: ChapaConfig) -> Self {
        Self { http, config }
    }

    fn initialize_url(&self) -> String {
        format!(
            "{}/transaction/initialize",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl PaymentProvider for ChapaClient {
    async fn initialize(&self, tx: &InitializeTransaction) -> Result<String, PaymentError> {
        let body = InitializeBody {
            amount: tx.amount.normalize().to_string(),
            currency: tx.currency,
            tx_ref: &tx.tx_ref,
            callback_url: &tx.callback_url,
            return_url: &tx.return_url,
            customization: Customization {
                title: &self.config.checkout_title,
                description: &self.config.checkout_description,
            },
        };

        tracing::debug!(tx_ref = %tx.tx_ref, currency = %tx.currency, "initializing chapa transaction");

        let response = self
            .http
            .post(self.initialize_url())
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            tracing::warn!(
                tx_ref = %tx.tx_ref,
                status = %status,
                body = %text,
                "chapa rejected transaction initialization"
            );
            if let Some(joined) = parse_validation_errors(&text) {
                return Err(PaymentError::GatewayValidation(joined));
            }
            return Err(PaymentError::Gateway {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChapaResponse =
            serde_json::from_str(&text).map_err(|_| PaymentError::Gateway {
                status: status.as_u16(),
                body: text.clone(),
            })?;

        match parsed.data {
            Some(data) if !data.checkout_url.is_empty() => Ok(data.checkout_url),
            _ => {
                tracing::warn!(tx_ref = %tx.tx_ref, message = %parsed.message, "chapa response missing checkout_url");
                Err(PaymentError::Gateway {
                    status: status.as_u16(),
                    body: text,
                })
            }
        }
    }
}

fn transport_error(e: reqwest::Error) -> PaymentError {
    if e.is_timeout() {
        PaymentError::GatewayTimeout
    } else {
        PaymentError::GatewayTransport(e.without_url().to_string())
    }
}

/// Extract Chapa's structured validation errors.
///
/// Chapa reports field errors as `{"message": {"field": ["msg", ...]}}`. The
/// pairs are joined as `field: msg, field: msg`. Returns `None` for any other
/// body shape.
pub fn parse_validation_errors(body: &str) -> Option<String> {
    let parsed: ChapaResponse = serde_json::from_str(body).ok()?;
    let fields = parsed.message.as_object()?;

    let mut pairs = Vec::new();
    for (field, errors) in fields {
        match errors {
            Value::Array(list) => {
                for err in list {
                    match err.as_str() {
                        Some(s) => pairs.push(format!("{field}: {s}")),
                        None => pairs.push(format!("{field}: {err}")),
                    }
                }
            }
            Value::String(s) => pairs.push(format!("{field}: {s}")),
            _ => {}
        }
    }

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join(", "))
    }
}
