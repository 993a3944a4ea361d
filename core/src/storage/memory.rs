use std::sync::{Mutex, PoisonError};

use anyhow::Result;

use crate::settlement::{BatchCommitted, RollupState};
use crate::state::Ledger;
use crate::storage::GateStore;

#[derive(Default)]
struct Inner {
    state: Option<RollupState>,
    batches: Vec<BatchCommitted>,
    ledger: Option<Ledger>,
}

/// Non-durable gate store for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryGateStore {
    inner: Mutex<Inner>,
}

impl MemoryGateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepted batch records, oldest first
    pub fn batches(&self) -> Vec<BatchCommitted> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .batches
            .clone()
    }

    /// Ledger written with the latest committed batch
    pub fn ledger(&self) -> Option<Ledger> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ledger
            .clone()
    }
}

impl GateStore for MemoryGateStore {
    fn load(&self) -> Result<Option<RollupState>> {
        Ok(self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .clone())
    }

    fn persist(
        &self,
        state: &RollupState,
        record: Option<&BatchCommitted>,
        ledger: Option<&Ledger>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.state = Some(state.clone());
        if let Some(record) = record {
            inner.batches.push(record.clone());
        }
        if let Some(ledger) = ledger {
            inner.ledger = Some(ledger.clone());
        }
        Ok(())
    }
}
