//! Payment initiation and webhook reconciliation for RecipeHub.
//!
//! A client starts a checkout with [`PaymentService::initiate`]; Chapa later
//! reports the outcome to [`PaymentService::handle_webhook`]. The purchase
//! ledger (Hasura) is the only place state lives.

pub mod chapa;
pub mod correlator;
pub mod error;
pub mod ledger;
pub mod service;
pub mod types;
pub mod validation;
pub mod webhook;

pub use chapa::{ChapaClient, ChapaConfig, InitializeTransaction, PaymentProvider};
pub use correlator::{new_reference, TransactionCorrelator};
pub use error::{LedgerError, PaymentError, ValidationError};
pub use ledger::{HasuraConfig, HasuraLedger, InMemoryLedger, PurchaseLedger};
pub use rust_decimal::Decimal;
pub use service::{CheckoutUrls, PaymentService, WebhookOutcome};
pub use types::{ActionResponse, Checkout, Currency, PaymentRequest, PurchaseRecord, PurchaseStatus};
pub use validation::{validate_payment_request, ValidatedPayment};
