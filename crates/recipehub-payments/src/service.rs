//! Payment orchestration: the initiate and webhook flows.
//!
//! Initiate: validate, mint `tx_ref`, initialize at the gateway, then record
//! a `pending` purchase. The ledger write happens strictly after the gateway
//! accepts, so every ledger row corresponds to a real gateway attempt.
//!
//! Webhook: decode, resolve `tx_ref` against the ledger, then apply a
//! conditional status update. Updates are set-to-state, so redelivery is safe.

use std::sync::Arc;

use crate::chapa::{InitializeTransaction, PaymentProvider};
use crate::correlator::{new_reference, TransactionCorrelator};
use crate::error::PaymentError;
use crate::ledger::PurchaseLedger;
use crate::types::{Checkout, PaymentRequest, PurchaseRecord, PurchaseStatus};
use crate::validation::validate_payment_request;
use crate::webhook::{self, ChargeStatus, WebhookEvent};

/// Where the gateway sends the webhook and where it returns the customer.
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    pub callback_url: String,
    pub return_url: String,
}

/// What a webhook delivery did to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Not a `charge.completed` event; acknowledged without action.
    Ignored { event: String },
    /// `changed` is false when the record was already completed.
    Completed { tx_ref: String, changed: bool },
    /// `changed` is false when the record had already left `pending`.
    Failed { tx_ref: String, changed: bool },
    /// A charge status with no ledger transition.
    Unhandled { tx_ref: String, status: String },
}

impl WebhookOutcome {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            WebhookOutcome::Ignored { .. } => "ignored",
            WebhookOutcome::Completed { .. } => "completed",
            WebhookOutcome::Failed { .. } => "failed",
            WebhookOutcome::Unhandled { .. } => "unhandled",
        }
    }
}

#[derive(Clone)]
pub struct PaymentService {
    provider: Arc<dyn PaymentProvider>,
    ledger: Arc<dyn PurchaseLedger>,
    correlator: TransactionCorrelator,
    urls: CheckoutUrls,
}

impl PaymentService {
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        ledger: Arc<dyn PurchaseLedger>,
        urls: CheckoutUrls,
    ) -> Self {
        Self {
            provider,
            correlator: TransactionCorrelator::new(ledger.clone()),
            ledger,
            urls,
        }
    }

    /// Start a checkout for an authenticated user.
    pub async fn initiate(
        &self,
        user_id: &str,
        req: &PaymentRequest,
    ) -> Result<Checkout, PaymentError> {
        if user_id.trim().is_empty() {
            return Err(PaymentError::Unauthorized);
        }

        let payment = validate_payment_request(req)?;
        let tx_ref = new_reference();

        let checkout_url = self
            .provider
            .initialize(&InitializeTransaction {
                amount: payment.amount,
                currency: payment.currency,
                tx_ref: tx_ref.clone(),
                callback_url: self.urls.callback_url.clone(),
                return_url: self.urls.return_url.clone(),
            })
            .await?;

        let record = PurchaseRecord::pending(user_id, &payment.recipe_id, &tx_ref, payment.amount);
        if let Err(source) = self.ledger.create_purchase(&record).await {
            tracing::error!(
                tx_ref = %tx_ref,
                user_id = %user_id,
                error = %source,
                "payment initialized at gateway but purchase was not recorded"
            );
            return Err(PaymentError::LedgerWriteFailed { tx_ref, source });
        }

        tracing::info!(
            tx_ref = %tx_ref,
            user_id = %user_id,
            recipe_id = %payment.recipe_id,
            amount = %payment.amount,
            currency = %payment.currency,
            "payment initiated"
        );

        Ok(Checkout {
            checkout_url,
            tx_ref,
        })
    }

    /// Apply a raw webhook delivery.
    pub async fn handle_webhook(&self, body: &[u8]) -> Result<WebhookOutcome, PaymentError> {
        let (status, tx_ref) = match webhook::decode(body)? {
            WebhookEvent::Other(event) => {
                tracing::debug!(event = %event, "ignoring webhook event");
                return Ok(WebhookOutcome::Ignored { event });
            }
            WebhookEvent::Charge { status, tx_ref } => (status, tx_ref),
        };

        match status {
            ChargeStatus::Success => {
                self.correlator.resolve(&tx_ref).await?;
                let changed = self
                    .ledger
                    .transition(
                        &tx_ref,
                        &[PurchaseStatus::Pending, PurchaseStatus::Failed],
                        PurchaseStatus::Completed,
                    )
                    .await?;
                tracing::info!(tx_ref = %tx_ref, changed = changed > 0, "purchase completed");
                Ok(WebhookOutcome::Completed {
                    tx_ref,
                    changed: changed > 0,
                })
            }
            ChargeStatus::Failed => {
                self.correlator.resolve(&tx_ref).await?;
                let changed = self
                    .ledger
                    .transition(&tx_ref, &[PurchaseStatus::Pending], PurchaseStatus::Failed)
                    .await?;
                tracing::info!(tx_ref = %tx_ref, changed = changed > 0, "purchase failed");
                Ok(WebhookOutcome::Failed {
                    tx_ref,
                    changed: changed > 0,
                })
            }
            ChargeStatus::Other(status) => {
                tracing::info!(tx_ref = %tx_ref, status = %status, "charge status has no ledger transition");
                Ok(WebhookOutcome::Unhandled { tx_ref, status })
            }
        }
    }
}
