//! Async Gate Service
//!
//! Single-writer actor in front of a [`ProofGate`]. Mutations queue on an mpsc
//! mailbox and run one at a time on a dedicated thread; proof verification can
//! be CPU-heavy and stays off the tokio runtime. Reads go straight to the
//! gate's snapshot.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, oneshot};

use rollup_account::Identity;
use rollup_field::FieldElement;

use super::events::GateEvent;
use super::gate::{BatchCommitted, ProofGate, RollupState, SubmitError};

/// Queued gate mutation
pub enum GateRequest {
    SubmitBatch {
        caller: Identity,
        proof: Vec<u8>,
        public_inputs: Vec<FieldElement>,
        old_root: FieldElement,
        new_root: FieldElement,
        reply: oneshot::Sender<Result<BatchCommitted, SubmitError>>,
    },
    SetOperator {
        caller: Identity,
        new_operator: Identity,
        reply: oneshot::Sender<Result<(), SubmitError>>,
    },
}

#[derive(Clone)]
pub struct GateService {
    request_tx: mpsc::Sender<GateRequest>,
    gate: Arc<ProofGate>,
}

impl GateService {
    /// Start the writer thread for `gate`
    pub fn start(gate: Arc<ProofGate>) -> Self {
        let (request_tx, mut request_rx) = mpsc::channel::<GateRequest>(32);
        let writer = Arc::clone(&gate);

        std::thread::spawn(move || {
            while let Some(request) = request_rx.blocking_recv() {
                match request {
                    GateRequest::SubmitBatch {
                        caller,
                        proof,
                        public_inputs,
                        old_root,
                        new_root,
                        reply,
                    } => {
                        let result =
                            writer.submit_batch(&caller, &proof, &public_inputs, &old_root, &new_root);
                        let _ = reply.send(result);
                    }
                    GateRequest::SetOperator {
                        caller,
                        new_operator,
                        reply,
                    } => {
                        let _ = reply.send(writer.set_operator(&caller, new_operator));
                    }
                }
            }
            tracing::debug!("gate service stopped");
        });

        Self { request_tx, gate }
    }

    pub async fn submit_batch(
        &self,
        caller: Identity,
        proof: Vec<u8>,
        public_inputs: Vec<FieldElement>,
        old_root: FieldElement,
        new_root: FieldElement,
    ) -> Result<Result<BatchCommitted, SubmitError>> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.request_tx
            .send(GateRequest::SubmitBatch {
                caller,
                proof,
                public_inputs,
                old_root,
                new_root,
                reply: reply_tx,
            })
            .await
            .context("gate service unavailable")?;

        reply_rx.await.context("gate service crashed")
    }

    pub async fn set_operator(
        &self,
        caller: Identity,
        new_operator: Identity,
    ) -> Result<Result<(), SubmitError>> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.request_tx
            .send(GateRequest::SetOperator {
                caller,
                new_operator,
                reply: reply_tx,
            })
            .await
            .context("gate service unavailable")?;

        reply_rx.await.context("gate service crashed")
    }

    pub fn state(&self) -> RollupState {
        self.gate.state()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GateEvent> {
        self.gate.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::prover::mock_proof_digest;
    use crate::settlement::verifier::MockVerifier;

    fn fe(v: u64) -> FieldElement {
        FieldElement::from(v)
    }

    #[tokio::test]
    async fn test_concurrent_submissions_commit_once() {
        let operator = Identity::derive("operator");
        let gate = ProofGate::in_memory(Arc::new(MockVerifier), fe(1), operator).unwrap();
        let service = GateService::start(Arc::new(gate));

        let proof = mock_proof_digest(&[fe(1), fe(2)]).to_vec();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let proof = proof.clone();
            handles.push(tokio::spawn(async move {
                service
                    .submit_batch(operator, proof, vec![fe(1), fe(2)], fe(1), fe(2))
                    .await
                    .unwrap()
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(e) => assert!(matches!(e, SubmitError::StateRootMismatch { .. })),
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(service.state().batch_count, 1);
        assert_eq!(service.state().current_root, fe(2));
    }

    #[tokio::test]
    async fn test_set_operator_through_service() {
        let operator = Identity::derive("operator");
        let alice = Identity::derive("alice");
        let gate = ProofGate::in_memory(Arc::new(MockVerifier), fe(1), operator).unwrap();
        let service = GateService::start(Arc::new(gate));
        let mut events = service.subscribe();

        service.set_operator(operator, alice).await.unwrap().unwrap();
        assert_eq!(service.state().operator, alice);
        assert_eq!(
            events.recv().await.unwrap(),
            GateEvent::OperatorChanged {
                old: operator,
                new: alice
            }
        );
    }
}
