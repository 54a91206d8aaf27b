use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::PurchaseLedger;
use crate::error::LedgerError;
use crate::types::{PurchaseRecord, PurchaseStatus};

/// Process-local ledger keyed by `tx_ref`. Used for local runs and tests.
#[derive(Default)]
pub struct InMemoryLedger {
    records: Mutex<HashMap<String, PurchaseRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, PurchaseRecord>>, LedgerError> {
        self.records
            .lock()
            .map_err(|_| LedgerError::Query("ledger lock poisoned".to_string()))
    }

    /// Snapshot of every record, in no particular order.
    pub fn records(&self) -> Vec<PurchaseRecord> {
        self.lock()
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PurchaseLedger for InMemoryLedger {
    async fn create_purchase(&self, record: &PurchaseRecord) -> Result<(), LedgerError> {
        let mut records = self.lock()?;
        if records.contains_key(&record.tx_ref) {
            return Err(LedgerError::Duplicate(record.tx_ref.clone()));
        }
        records.insert(record.tx_ref.clone(), record.clone());
        Ok(())
    }

    async fn find_by_tx_ref(&self, tx_ref: &str) -> Result<Option<PurchaseRecord>, LedgerError> {
        Ok(self.lock()?.get(tx_ref).cloned())
    }

    async fn transition(
        &self,
        tx_ref: &str,
        from: &[PurchaseStatus],
        to: PurchaseStatus,
    ) -> Result<u64, LedgerError> {
        let mut records = self.lock()?;
        match records.get_mut(tx_ref) {
            Some(record) if from.contains(&record.status) => {
                record.status = to;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}
