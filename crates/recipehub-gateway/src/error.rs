use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use payments::PaymentError;

/// Errors returned by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Missing or invalid bearer token / webhook signature
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Payment(e) => match e {
                PaymentError::Validation(_) => "validation_error",
                PaymentError::Unauthorized => "unauthorized",
                PaymentError::Gateway { .. } | PaymentError::GatewayTransport(_) => {
                    "payment_gateway_error"
                }
                PaymentError::GatewayValidation(_) => "payment_gateway_validation",
                PaymentError::GatewayTimeout => "payment_gateway_timeout",
                PaymentError::LedgerWriteFailed { .. } => "ledger_write_failed",
                PaymentError::Ledger(_) => "ledger_error",
                PaymentError::UnknownTransaction(_) => "unknown_transaction",
                PaymentError::MalformedWebhook(_) => "malformed_webhook",
            },
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to show to the caller. Upstream bodies, ledger details
    /// and internal errors stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::Payment(e) => match e {
                PaymentError::Validation(v) => v.to_string(),
                PaymentError::Unauthorized => "Unauthorized".to_string(),
                PaymentError::GatewayValidation(msg) => {
                    format!("Chapa validation errors: {msg}")
                }
                PaymentError::Gateway { .. } | PaymentError::GatewayTransport(_) => {
                    "Payment gateway rejected the request".to_string()
                }
                PaymentError::GatewayTimeout => "Payment gateway timed out".to_string(),
                PaymentError::LedgerWriteFailed { tx_ref, .. } => {
                    format!("Payment {tx_ref} was initialized but could not be recorded")
                }
                PaymentError::Ledger(_) => "Error updating purchase status".to_string(),
                PaymentError::UnknownTransaction(tx_ref) => {
                    format!("Unknown transaction: {tx_ref}")
                }
                PaymentError::MalformedWebhook(msg) => format!("Invalid payload: {msg}"),
            },
            ApiError::Unauthorized(msg) => (*msg).to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Payment(e) => match e {
                PaymentError::Validation(_)
                | PaymentError::GatewayValidation(_)
                | PaymentError::MalformedWebhook(_) => StatusCode::BAD_REQUEST,
                PaymentError::Unauthorized => StatusCode::UNAUTHORIZED,
                PaymentError::Gateway { .. } | PaymentError::GatewayTransport(_) => {
                    StatusCode::BAD_GATEWAY
                }
                PaymentError::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
                PaymentError::UnknownTransaction(_) => StatusCode::NOT_FOUND,
                PaymentError::LedgerWriteFailed { .. } | PaymentError::Ledger(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
            if let ApiError::Payment(PaymentError::Gateway { status, body }) = self {
                tracing::error!(upstream_status = status, body = %body, "chapa response body");
            }
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }

        HttpResponse::build(status).json(serde_json::json!({
            "error": self.code(),
            "message": self.public_message(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payments::{LedgerError, ValidationError};

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ApiError, u16)> = vec![
            (PaymentError::Validation(ValidationError::InvalidAmount).into(), 400),
            (PaymentError::Unauthorized.into(), 401),
            (PaymentError::GatewayValidation("amount: bad".into()).into(), 400),
            (
                PaymentError::Gateway {
                    status: 500,
                    body: String::new(),
                }
                .into(),
                502,
            ),
            (PaymentError::GatewayTimeout.into(), 504),
            (
                PaymentError::LedgerWriteFailed {
                    tx_ref: "tx".into(),
                    source: LedgerError::Status { status: 503 },
                }
                .into(),
                500,
            ),
            (PaymentError::MalformedWebhook("x".into()).into(), 400),
            (ApiError::Unauthorized("Invalid token"), 401),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code().as_u16(), status, "{err:?}");
        }
    }

    #[test]
    fn test_messages_do_not_leak_upstream() {
        let err: ApiError = PaymentError::Gateway {
            status: 500,
            body: "stack trace with CHASECK-secret".into(),
        }
        .into();
        assert!(!err.public_message().contains("CHASECK"));

        let err = ApiError::Internal("db password wrong".into());
        assert_eq!(err.public_message(), "An internal error occurred");
    }

    #[test]
    fn test_gateway_validation_forwarded() {
        let err: ApiError = PaymentError::GatewayValidation("currency: invalid".into()).into();
        assert_eq!(
            err.public_message(),
            "Chapa validation errors: currency: invalid"
        );
    }
}
