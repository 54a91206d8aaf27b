use actix_web::{web, HttpRequest, HttpResponse};
use std::future::Future;

use payments::webhook::{verify_signature, SIGNATURE_HEADER};
use payments::{ActionResponse, PaymentError, PaymentRequest};

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::metrics::{GATEWAY_LATENCY, PAYMENTS_FAILED, PAYMENTS_INITIATED, WEBHOOKS};
use crate::state::AppState;

/// Run payment work on its own task so a client disconnect, which drops the
/// handler future, cannot abort a gateway call halfway through a ledger write.
async fn run_detached<F, T>(work: F) -> Result<T, ApiError>
where
    F: Future<Output = T> + 'static,
    T: 'static,
{
    actix_web::rt::spawn(work)
        .await
        .map_err(|e| ApiError::Internal(format!("payment task failed: {e}")))
}

/// POST /payments/initiate - Start a Chapa checkout for the authenticated user
pub async fn initiate(
    user: AuthenticatedUser,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let request: PaymentRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "undecodable payment request");
        PAYMENTS_FAILED.with_label_values(&["bad_request"]).inc();
        ApiError::BadRequest("Error decoding request body".to_string())
    })?;

    let payments = state.payments.clone();
    let AuthenticatedUser(user_id) = user;

    let timer = GATEWAY_LATENCY.start_timer();
    let result =
        run_detached(async move { payments.initiate(&user_id, &request).await }).await?;
    timer.observe_duration();

    match result {
        Ok(checkout) => {
            PAYMENTS_INITIATED.inc();
            Ok(HttpResponse::Ok().json(ActionResponse::success("Payment initiated", Some(checkout))))
        }
        Err(e) => {
            let err = ApiError::from(e);
            PAYMENTS_FAILED.with_label_values(&[err.code()]).inc();
            Err(err)
        }
    }
}

/// POST /payments/webhook - Chapa charge notifications
///
/// Acknowledged with 200 whenever the payload is well-formed, including for
/// events this service ignores and for unknown transaction references, so
/// the gateway does not keep redelivering. Ledger failures return 500.
pub async fn webhook(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    if let Some(ref secret) = state.config.chapa_webhook_secret {
        let signature = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        let valid = signature
            .map(|sig| verify_signature(secret, &body, sig))
            .unwrap_or(false);
        if !valid {
            tracing::warn!(
                signature_present = signature.is_some(),
                "rejecting webhook with missing or invalid signature"
            );
            WEBHOOKS.with_label_values(&["rejected"]).inc();
            return Err(ApiError::Unauthorized("Invalid webhook signature"));
        }
    }

    let payments = state.payments.clone();
    let result = run_detached(async move { payments.handle_webhook(&body).await }).await?;

    match result {
        Ok(outcome) => {
            WEBHOOKS.with_label_values(&[outcome.label()]).inc();
        }
        Err(PaymentError::UnknownTransaction(tx_ref)) => {
            tracing::warn!(tx_ref = %tx_ref, "webhook for unknown transaction");
            WEBHOOKS.with_label_values(&["unknown_transaction"]).inc();
        }
        Err(e) => {
            let err = ApiError::from(e);
            WEBHOOKS.with_label_values(&[err.code()]).inc();
            return Err(err);
        }
    }

    Ok(HttpResponse::Ok().json(ActionResponse::<()>::success("Webhook processed", None)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/payments/initiate", web::post().to(initiate))
        .route("/payments/webhook", web::post().to(webhook));
}
