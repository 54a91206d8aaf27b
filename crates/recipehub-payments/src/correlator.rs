//! Minting and resolving transaction references (`tx_ref`).
//!
//! A `tx_ref` is the only link between the client's initiate call and the
//! gateway's later webhook. It is a random v4 UUID so that it cannot be
//! derived from the recipe, user or amount.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::PaymentError;
use crate::ledger::PurchaseLedger;
use crate::types::PurchaseRecord;

/// Mint a new, never-reused transaction reference.
pub fn new_reference() -> String {
    Uuid::new_v4().to_string()
}

/// Maps inbound webhook references back to ledger records.
#[derive(Clone)]
pub struct TransactionCorrelator {
    ledger: Arc<dyn PurchaseLedger>,
}

impl TransactionCorrelator {
    pub fn new(ledger: Arc<dyn PurchaseLedger>) -> Self {
        Self { ledger }
    }

    /// Exact lookup on the unique `tx_ref` column. Unknown references are an error.
    pub async fn resolve(&self, tx_ref: &str) -> Result<PurchaseRecord, PaymentError> {
        self.ledger
            .find_by_tx_ref(tx_ref)
            .await?
            .ok_or_else(|| PaymentError::UnknownTransaction(tx_ref.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    #[test]
    fn test_references_are_unique() {
        let refs: HashSet<String> = (0..10_000).map(|_| new_reference()).collect();
        assert_eq!(refs.len(), 10_000);
    }

    #[test]
    fn test_reference_is_v4_uuid() {
        let parsed = Uuid::parse_str(&new_reference()).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[tokio::test]
    async fn test_resolve_known_and_unknown() {
        let ledger = Arc::new(InMemoryLedger::new());
        let record = PurchaseRecord::pending("u1", "r1", "tx-1", dec!(10));
        ledger.create_purchase(&record).await.unwrap();

        let correlator = TransactionCorrelator::new(ledger);
        assert_eq!(correlator.resolve("tx-1").await.unwrap().id, record.id);

        let err = correlator.resolve("tx-2").await.unwrap_err();
        assert!(matches!(err, PaymentError::UnknownTransaction(ref r) if r == "tx-2"));
    }

    #[tokio::test]
    async fn test_resolve_does_not_prefix_match() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger
            .create_purchase(&PurchaseRecord::pending("u1", "r1", "abc-123", dec!(10)))
            .await
            .unwrap();

        let correlator = TransactionCorrelator::new(ledger);
        assert!(correlator.resolve("abc").await.is_err());
        assert!(correlator.resolve("ABC-123").await.is_err());
    }
}
