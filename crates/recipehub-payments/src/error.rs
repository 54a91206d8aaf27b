use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::Currency;

/// Rejections raised while checking a [`PaymentRequest`](crate::PaymentRequest).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("amount must be greater than 0")]
    InvalidAmount,

    #[error("unsupported currency: {0}. Supported currencies are: ETB, USD, EUR")]
    UnsupportedCurrency(String),

    #[error("minimum amount for {currency} is {floor:.2}")]
    BelowMinimum { currency: Currency, floor: Decimal },
}

/// Errors from the purchase ledger backend.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ledger returned HTTP {status}")]
    Status { status: u16 },

    #[error("ledger query failed: {0}")]
    Query(String),

    #[error("unexpected ledger response: {0}")]
    Decode(String),

    #[error("duplicate transaction reference: {0}")]
    Duplicate(String),
}

/// Errors surfaced by the payment orchestrator.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("unauthorized")]
    Unauthorized,

    /// Non-success response from the payment gateway. `body` is kept for logs only.
    #[error("payment gateway returned HTTP {status}")]
    Gateway { status: u16, body: String },

    #[error("payment gateway validation errors: {0}")]
    GatewayValidation(String),

    #[error("payment gateway timed out")]
    GatewayTimeout,

    #[error("payment gateway unreachable: {0}")]
    GatewayTransport(String),

    /// The gateway accepted the transaction but the pending purchase could not be recorded.
    #[error("payment {tx_ref} initialized but not recorded: {source}")]
    LedgerWriteFailed {
        tx_ref: String,
        #[source]
        source: LedgerError,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("unknown transaction: {0}")]
    UnknownTransaction(String),

    #[error("malformed webhook: {0}")]
    MalformedWebhook(String),
}
