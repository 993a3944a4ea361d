//! Batch Application
//!
//! Applies an ordered batch of transfers against a ledger whose root matches
//! the caller's claimed old root. The batch runs on a scratch copy; the
//! caller's ledger is never touched, so a failure anywhere leaves no trace.

use thiserror::Error;
use tracing::{debug, warn};

use rollup_field::FieldElement;
use rollup_transaction::Transaction;

use crate::state::{Ledger, TransferError};

// ============================================================================
// Configuration
// ============================================================================

/// Batch size bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Minimum transactions per batch
    pub min_transactions: usize,
    /// Maximum transactions per batch
    pub max_transactions: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            min_transactions: 1,
            max_transactions: 64,
        }
    }
}

impl BatchLimits {
    pub fn from_config(config: &rollup_config::BatchTomlConfig) -> Self {
        Self {
            min_transactions: config.min_transactions.max(1),
            max_transactions: config.max_transactions,
        }
    }

    fn check(&self, count: usize) -> Result<(), BatchError> {
        if count < self.min_transactions {
            return Err(BatchError::EmptyBatch {
                count,
                min: self.min_transactions,
            });
        }
        if count > self.max_transactions {
            return Err(BatchError::TooLarge {
                count,
                max: self.max_transactions,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Errors / Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("state root mismatch: ledger is at {actual}, batch claims {claimed}")]
    StateRootMismatch {
        claimed: FieldElement,
        actual: FieldElement,
    },

    #[error("transaction {index} failed: {cause}")]
    TransactionFailed {
        index: usize,
        #[source]
        cause: TransferError,
    },

    #[error("batch has {count} transactions, at least {min} required")]
    EmptyBatch { count: usize, min: usize },

    #[error("batch has {count} transactions, at most {max} allowed")]
    TooLarge { count: usize, max: usize },
}

/// Result of a fully applied batch
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Ledger after every transaction
    pub ledger: Ledger,
    pub old_root: FieldElement,
    pub new_root: FieldElement,
    /// Number of transactions applied
    pub applied: usize,
    /// [`batch_hash`] of the applied transactions
    pub batch_hash: [u8; 32],
}

// ============================================================================
// Application
// ============================================================================

/// Apply `transactions` in order to a copy of `ledger`.
///
/// Fails if `ledger` does not commit to `old_root`, if the batch size is out
/// of bounds, or on the first failing transaction.
pub fn apply_batch(
    ledger: &Ledger,
    old_root: &FieldElement,
    transactions: &[Transaction],
    limits: &BatchLimits,
) -> Result<BatchOutcome, BatchError> {
    let actual = ledger.snapshot_root();
    if &actual != old_root {
        warn!(claimed = %old_root, actual = %actual, "batch built against stale root");
        return Err(BatchError::StateRootMismatch {
            claimed: old_root.clone(),
            actual,
        });
    }

    limits.check(transactions.len())?;

    let mut scratch = ledger.clone();
    for (index, tx) in transactions.iter().enumerate() {
        scratch
            .apply_transfer(tx)
            .map_err(|cause| BatchError::TransactionFailed { index, cause })?;
    }

    let new_root = scratch.snapshot_root();
    debug!(
        txs = transactions.len(),
        old_root = %old_root,
        new_root = %new_root,
        "batch applied"
    );

    Ok(BatchOutcome {
        ledger: scratch,
        old_root: actual,
        new_root,
        applied: transactions.len(),
        batch_hash: batch_hash(transactions),
    })
}

/// blake3 digest over the ordered transactions
pub fn batch_hash(transactions: &[Transaction]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(transactions.len() as u64).to_le_bytes());
    for tx in transactions {
        hasher.update(&(tx.from as u64).to_le_bytes());
        hasher.update(&(tx.to as u64).to_le_bytes());
        hasher.update(&tx.amount.to_bytes_be());
        hasher.update(&tx.nonce.to_bytes_be());
    }
    hasher.finalize().into()
}
