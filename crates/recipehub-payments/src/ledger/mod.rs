//! Purchase ledger: the durable, external store of purchase records.
//!
//! The payment flow never caches ledger state; every transition is issued as
//! a conditional update against the backend and the backend's answer is final.

use async_trait::async_trait;

use crate::error::LedgerError;
use crate::types::{PurchaseRecord, PurchaseStatus};

mod hasura;
mod memory;

pub use hasura::{HasuraConfig, HasuraLedger};
pub use memory::InMemoryLedger;

#[async_trait]
pub trait PurchaseLedger: Send + Sync {
    /// Insert a new purchase. Fails with [`LedgerError::Duplicate`] if the
    /// `tx_ref` is already recorded.
    async fn create_purchase(&self, record: &PurchaseRecord) -> Result<(), LedgerError>;

    /// Exact lookup on `tx_ref`.
    async fn find_by_tx_ref(&self, tx_ref: &str) -> Result<Option<PurchaseRecord>, LedgerError>;

    /// Set `status = to` on the record with this `tx_ref`, but only if its
    /// current status is one of `from`. Returns the number of rows changed.
    async fn transition(
        &self,
        tx_ref: &str,
        from: &[PurchaseStatus],
        to: PurchaseStatus,
    ) -> Result<u64, LedgerError>;
}
