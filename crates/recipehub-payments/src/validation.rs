use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::types::{Currency, PaymentRequest};

/// A payment request that passed validation, with its fields normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPayment {
    pub recipe_id: String,
    pub amount: Decimal,
    pub currency: Currency,
}

/// Check a payment request's shape and business rules.
///
/// Everything downstream uses the returned values, never the raw request.
pub fn validate_payment_request(req: &PaymentRequest) -> Result<ValidatedPayment, ValidationError> {
    let recipe_id = req.recipe_id.trim();
    if recipe_id.is_empty() {
        return Err(ValidationError::MissingField("recipe ID"));
    }

    if req.amount <= Decimal::ZERO {
        return Err(ValidationError::InvalidAmount);
    }

    if req.currency.trim().is_empty() {
        return Err(ValidationError::MissingField("currency"));
    }

    let normalized = req.currency.trim().to_uppercase();
    let currency: Currency = normalized
        .parse()
        .map_err(ValidationError::UnsupportedCurrency)?;

    validate_amount(req.amount, currency)?;
    Ok(ValidatedPayment {
        recipe_id: recipe_id.to_string(),
        amount: req.amount,
        currency,
    })
}

/// Enforce the per-currency minimum charge.
pub fn validate_amount(amount: Decimal, currency: Currency) -> Result<(), ValidationError> {
    let floor = currency.min_amount();
    if amount < floor {
        return Err(ValidationError::BelowMinimum { currency, floor });
    }
    Ok(())
}
