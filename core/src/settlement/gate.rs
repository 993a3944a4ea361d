//! Proof Gate
//!
//! Accepts `(old_root, new_root, proof)` only when the caller is the operator,
//! `old_root` is the currently accepted root, the public inputs are exactly
//! `[old_root, new_root]`, and the verifier accepts the proof.
//!
//! ```text
//!  submit_batch
//!     │
//!     ├─ caller == operator ?            ── Unauthorized
//!     ├─ claimed_old == current_root ?   ── StateRootMismatch
//!     ├─ inputs == [old, new] ?          ── PublicInputsMismatch
//!     ├─ verifier.verify(proof, inputs)  ── InvalidProof
//!     ├─ store.persist(next, record)     ── Storage
//!     │    (+ post-batch ledger when submitted as a BatchOutcome)
//!     ├─ commit in memory
//!     └─ emit BatchVerified
//! ```
//!
//! The whole sequence runs under one writer lock. Readers see published
//! snapshots through a watch channel and never take the lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use rollup_account::Identity;
use rollup_field::FieldElement;

use super::events::GateEvent;
use crate::execution::BatchOutcome;
use super::verifier::ProofVerifier;
use crate::storage::{GateStore, MemoryGateStore};

/// Buffered events per subscriber before the slowest one starts lagging
const EVENT_CAPACITY: usize = 256;

// ============================================================================
// State / Records
// ============================================================================

/// Everything the gate persists, written atomically as one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupState {
    pub current_root: FieldElement,
    pub batch_count: u64,
    pub operator: Identity,
}

/// Audit record of an accepted batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCommitted {
    /// 1-based; equals `batch_count` after the commit
    pub batch_id: u64,
    pub old_root: FieldElement,
    pub new_root: FieldElement,
    pub submitter: Identity,
    /// Unix seconds
    pub timestamp: i64,
    /// blake3 digest of the applied transactions, when the submitter supplied them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_hash: Option<[u8; 32]>,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("caller {caller} is not the operator")]
    Unauthorized { caller: Identity },

    #[error("state root mismatch: current root is {current}, submission claims {claimed}")]
    StateRootMismatch {
        claimed: FieldElement,
        current: FieldElement,
    },

    #[error("public inputs must be exactly [old_root, new_root]")]
    PublicInputsMismatch,

    #[error("batch ledger commits to {ledger_root}, not to the claimed new root {claimed}")]
    LedgerRootMismatch {
        ledger_root: FieldElement,
        claimed: FieldElement,
    },

    #[error("proof rejected by {verifier} verifier")]
    InvalidProof { verifier: &'static str },

    #[error("operator cannot be the zero identity")]
    ZeroAddress,

    #[error("failed to persist gate state: {0:#}")]
    Storage(#[source] anyhow::Error),
}

// ============================================================================
// Gate
// ============================================================================

pub struct ProofGate {
    /// Writer lock; held for the whole check-then-act sequence
    state: Mutex<RollupState>,
    verifier: Arc<dyn ProofVerifier>,
    store: Arc<dyn GateStore>,
    snapshot: watch::Sender<RollupState>,
    events: broadcast::Sender<GateEvent>,
}

impl ProofGate {
    /// Open the gate over `store`.
    ///
    /// Resumes persisted state when present; otherwise persists a fresh
    /// genesis with `genesis_root`, zero batches and `operator`.
    pub fn open(
        store: Arc<dyn GateStore>,
        verifier: Arc<dyn ProofVerifier>,
        genesis_root: FieldElement,
        operator: Identity,
    ) -> anyhow::Result<Self> {
        let state = match store.load()? {
            Some(state) => {
                info!(
                    root = %state.current_root,
                    batches = state.batch_count,
                    "resuming gate state"
                );
                state
            }
            None => {
                if operator.is_zero() {
                    anyhow::bail!("genesis operator cannot be the zero identity");
                }
                let genesis = RollupState {
                    current_root: genesis_root,
                    batch_count: 0,
                    operator,
                };
                store.persist(&genesis, None, None)?;
                info!(root = %genesis.current_root, operator = %genesis.operator, "gate initialised at genesis");
                genesis
            }
        };

        let (snapshot, _) = watch::channel(state.clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            state: Mutex::new(state),
            verifier,
            store,
            snapshot,
            events,
        })
    }

    /// Gate over an in-memory store
    pub fn in_memory(
        verifier: Arc<dyn ProofVerifier>,
        genesis_root: FieldElement,
        operator: Identity,
    ) -> anyhow::Result<Self> {
        Self::open(Arc::new(MemoryGateStore::new()), verifier, genesis_root, operator)
    }

    fn lock(&self) -> MutexGuard<'_, RollupState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Name of the verifier proofs are checked against
    pub fn verifier_name(&self) -> &'static str {
        self.verifier.name()
    }

    /// Accept a proven state transition.
    pub fn submit_batch(
        &self,
        caller: &Identity,
        proof: &[u8],
        public_inputs: &[FieldElement],
        claimed_old_root: &FieldElement,
        claimed_new_root: &FieldElement,
    ) -> Result<BatchCommitted, SubmitError> {
        self.commit(caller, proof, public_inputs, claimed_old_root, claimed_new_root, None)
    }

    /// Accept a proven batch together with the ledger it produced.
    ///
    /// The post-batch ledger and the batch hash are persisted in the same
    /// atomic write as the new root, so a restart always finds a ledger that
    /// links to the accepted root.
    pub fn submit_outcome(
        &self,
        caller: &Identity,
        proof: &[u8],
        public_inputs: &[FieldElement],
        outcome: &BatchOutcome,
    ) -> Result<BatchCommitted, SubmitError> {
        let ledger_root = outcome.ledger.snapshot_root();
        if ledger_root != outcome.new_root {
            return Err(SubmitError::LedgerRootMismatch {
                ledger_root,
                claimed: outcome.new_root.clone(),
            });
        }
        self.commit(
            caller,
            proof,
            public_inputs,
            &outcome.old_root,
            &outcome.new_root,
            Some(outcome),
        )
    }

    fn commit(
        &self,
        caller: &Identity,
        proof: &[u8],
        public_inputs: &[FieldElement],
        claimed_old_root: &FieldElement,
        claimed_new_root: &FieldElement,
        outcome: Option<&BatchOutcome>,
    ) -> Result<BatchCommitted, SubmitError> {
        let mut state = self.lock();

        if caller != &state.operator {
            warn!(caller = %caller, "batch submission from non-operator");
            return Err(SubmitError::Unauthorized { caller: *caller });
        }

        if claimed_old_root != &state.current_root {
            warn!(
                claimed = %claimed_old_root,
                current = %state.current_root,
                "batch submitted against stale root"
            );
            return Err(SubmitError::StateRootMismatch {
                claimed: claimed_old_root.clone(),
                current: state.current_root.clone(),
            });
        }

        let bound = matches!(
            public_inputs,
            [old, new] if old == claimed_old_root && new == claimed_new_root
        );
        if !bound {
            warn!("public inputs not bound to [old_root, new_root]");
            return Err(SubmitError::PublicInputsMismatch);
        }

        if !self.verifier.verify(proof, public_inputs) {
            warn!(verifier = self.verifier.name(), "batch proof rejected");
            return Err(SubmitError::InvalidProof {
                verifier: self.verifier.name(),
            });
        }

        let next = RollupState {
            current_root: claimed_new_root.clone(),
            batch_count: state.batch_count + 1,
            operator: state.operator,
        };
        let record = BatchCommitted {
            batch_id: next.batch_count,
            old_root: claimed_old_root.clone(),
            new_root: claimed_new_root.clone(),
            submitter: *caller,
            timestamp: chrono::Utc::now().timestamp(),
            batch_hash: outcome.map(|o| o.batch_hash),
        };

        self.store
            .persist(&next, Some(&record), outcome.map(|o| &o.ledger))
            .map_err(SubmitError::Storage)?;

        *state = next;
        self.snapshot.send_replace(state.clone());
        drop(state);

        info!(
            batch_id = record.batch_id,
            old_root = %record.old_root,
            new_root = %record.new_root,
            "batch verified"
        );
        let _ = self.events.send(GateEvent::BatchVerified {
            batch_id: record.batch_id,
            old_root: record.old_root.clone(),
            new_root: record.new_root.clone(),
            submitter: record.submitter,
            timestamp: record.timestamp,
        });

        Ok(record)
    }

    /// Hand the operator role to `new_operator`.
    pub fn set_operator(&self, caller: &Identity, new_operator: Identity) -> Result<(), SubmitError> {
        let mut state = self.lock();

        if caller != &state.operator {
            warn!(caller = %caller, "operator change from non-operator");
            return Err(SubmitError::Unauthorized { caller: *caller });
        }
        if new_operator.is_zero() {
            return Err(SubmitError::ZeroAddress);
        }

        let old = state.operator;
        let next = RollupState {
            operator: new_operator,
            ..state.clone()
        };
        self.store.persist(&next, None, None).map_err(SubmitError::Storage)?;

        *state = next;
        self.snapshot.send_replace(state.clone());
        drop(state);

        info!(old = %old, new = %new_operator, "operator changed");
        let _ = self.events.send(GateEvent::OperatorChanged {
            old,
            new: new_operator,
        });
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Reads (lock-free snapshots)
    // ------------------------------------------------------------------------

    pub fn state(&self) -> RollupState {
        self.snapshot.borrow().clone()
    }

    pub fn get_current_root(&self) -> FieldElement {
        self.snapshot.borrow().current_root.clone()
    }

    pub fn get_batch_count(&self) -> u64 {
        self.snapshot.borrow().batch_count
    }

    pub fn get_operator(&self) -> Identity {
        self.snapshot.borrow().operator
    }

    /// Receiver that observes every published snapshot
    pub fn watch_state(&self) -> watch::Receiver<RollupState> {
        self.snapshot.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GateEvent> {
        self.events.subscribe()
    }
}
