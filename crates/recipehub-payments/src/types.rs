//! Wire and domain types shared by the payment flow.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Body of `POST /payments/initiate`.
///
/// Every field defaults when absent so that a missing field surfaces as a
/// validation error rather than a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[serde(default)]
    pub recipe_id: String,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub currency: String,
}

/// Currencies accepted for checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Etb,
    Usd,
    Eur,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Etb => "ETB",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    /// Smallest amount the gateway will charge in this currency.
    pub fn min_amount(&self) -> Decimal {
        match self {
            Currency::Etb => Decimal::new(500, 2),
            Currency::Usd | Currency::Eur => Decimal::new(50, 2),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = String;

    /// Parses an already-normalized (uppercase) currency code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ETB" => Ok(Currency::Etb),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(other.to_string()),
        }
    }
}

/// Lifecycle of a persisted purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Failed,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Completed => "completed",
            PurchaseStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchase row as held by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub id: Uuid,
    pub user_id: String,
    pub recipe_id: String,
    pub tx_ref: String,
    pub amount: Decimal,
    pub status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
}

impl PurchaseRecord {
    /// A freshly initiated purchase awaiting the gateway's webhook.
    pub fn pending(user_id: &str, recipe_id: &str, tx_ref: &str, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            recipe_id: recipe_id.to_string(),
            tx_ref: tx_ref.to_string(),
            amount,
            status: PurchaseStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Result of a successful initiation, returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    pub checkout_url: String,
    pub tx_ref: String,
}

/// Response envelope used by every payment endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse<T> {
    pub code: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ActionResponse<T> {
    pub fn success(message: &str, data: Option<T>) -> Self {
        Self {
            code: "success".to_string(),
            message: message.to_string(),
            data,
        }
    }
}
