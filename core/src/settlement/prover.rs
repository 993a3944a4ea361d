//! Prover Integration
//!
//! Off-core side of a batch proof: what the submitter builds and hands to the
//! gate.
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  Batch Proof                     │
//! │                                                  │
//! │  Public Inputs (in this order):                  │
//! │    • old_state_root   (root before the batch)    │
//! │    • new_state_root   (root after the batch)     │
//! │                                                  │
//! │  Private Witness:                                │
//! │    • pre-batch accounts                          │
//! │    • ordered transactions                        │
//! │    • inclusion path for every account            │
//! └──────────────────────────────────────────────────┘
//! ```

use anyhow::Result;

use rollup_account::Account;
use rollup_field::FieldElement;
use rollup_transaction::Transaction;

use crate::execution::BatchOutcome;
use crate::state::{Ledger, MerklePath};

/// Domain tag for mock proof digests
const MOCK_PROOF_DOMAIN: &[u8] = b"rollup-mock-proof-v1";

// ============================================================================
// Proof Types
// ============================================================================

/// Public inputs for a batch proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPublicInputs {
    /// State root before batch execution
    pub old_state_root: FieldElement,
    /// State root after batch execution
    pub new_state_root: FieldElement,
}

impl BatchPublicInputs {
    pub fn new(old_state_root: FieldElement, new_state_root: FieldElement) -> Self {
        Self {
            old_state_root,
            new_state_root,
        }
    }

    /// `[old_state_root, new_state_root]`, the order every verifier binds to
    pub fn to_vec(&self) -> Vec<FieldElement> {
        vec![self.old_state_root.clone(), self.new_state_root.clone()]
    }
}

/// A generated batch proof
#[derive(Debug, Clone)]
pub struct BatchProof {
    pub public_inputs: BatchPublicInputs,
    pub proof_bytes: Vec<u8>,
}

/// Witness data for batch proving
#[derive(Debug, Clone)]
pub struct BatchWitness {
    pub pre_accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    /// Inclusion path of every pre-batch account
    pub pre_paths: Vec<MerklePath>,
}

impl BatchWitness {
    pub fn build(pre_ledger: &Ledger, transactions: &[Transaction]) -> Self {
        let tree = pre_ledger.tree();
        Self {
            pre_accounts: pre_ledger.accounts().to_vec(),
            transactions: transactions.to_vec(),
            pre_paths: (0..pre_ledger.len()).filter_map(|i| tree.path(i)).collect(),
        }
    }
}

/// Build public inputs from an applied batch
pub fn build_public_inputs(outcome: &BatchOutcome) -> BatchPublicInputs {
    BatchPublicInputs::new(outcome.old_root.clone(), outcome.new_root.clone())
}

/// Digest a mock proof commits to: blake3 over the ordered public inputs
pub fn mock_proof_digest(public_inputs: &[FieldElement]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(MOCK_PROOF_DOMAIN);
    hasher.update(&(public_inputs.len() as u64).to_le_bytes());
    for input in public_inputs {
        hasher.update(&input.to_bytes_be());
    }
    *hasher.finalize().as_bytes()
}

// ============================================================================
// Prover Trait
// ============================================================================

/// Trait for batch proof generation
pub trait BatchProver: Send + Sync {
    /// Generate a proof for a batch
    fn prove(&self, inputs: &BatchPublicInputs, witness: &BatchWitness) -> Result<BatchProof>;

    /// Hash identifying the verification key the proofs are checked against
    fn verification_key_hash(&self) -> [u8; 32];
}

// ============================================================================
// Mock Prover
// ============================================================================

/// Produces proofs accepted by [`MockVerifier`](super::verifier::MockVerifier).
///
/// The proof is only a digest of the public inputs. It binds a proof to one
/// transition but attests nothing about how the transition was computed.
pub struct MockProver {
    vk_hash: [u8; 32],
}

impl MockProver {
    pub fn new() -> Self {
        Self {
            vk_hash: *blake3::hash(b"rollup-mock-vk-v1").as_bytes(),
        }
    }
}

impl Default for MockProver {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchProver for MockProver {
    fn prove(&self, inputs: &BatchPublicInputs, _witness: &BatchWitness) -> Result<BatchProof> {
        Ok(BatchProof {
            public_inputs: inputs.clone(),
            proof_bytes: mock_proof_digest(&inputs.to_vec()).to_vec(),
        })
    }

    fn verification_key_hash(&self) -> [u8; 32] {
        self.vk_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{BatchLimits, apply_batch};

    fn scenario() -> (Ledger, Vec<Transaction>) {
        let ledger =
            Ledger::new(vec![Account::with_balance(1, 1000), Account::with_balance(2, 500)]).unwrap();
        (ledger, vec![Transaction::new(0, 1, 100, 0), Transaction::new(1, 0, 50, 0)])
    }

    #[test]
    fn test_mock_prover_binds_inputs() {
        let prover = MockProver::new();
        let (ledger, txs) = scenario();
        let witness = BatchWitness::build(&ledger, &txs);

        let a = BatchPublicInputs::new(FieldElement::from(1), FieldElement::from(2));
        let b = BatchPublicInputs::new(FieldElement::from(2), FieldElement::from(1));

        let proof_a = prover.prove(&a, &witness).unwrap();
        let proof_b = prover.prove(&b, &witness).unwrap();
        assert_eq!(proof_a.proof_bytes.len(), 32);
        assert_ne!(proof_a.proof_bytes, proof_b.proof_bytes);
        assert_eq!(proof_a.proof_bytes, mock_proof_digest(&a.to_vec()).to_vec());
    }

    #[test]
    fn test_witness_paths_verify() {
        let (ledger, txs) = scenario();
        let witness = BatchWitness::build(&ledger, &txs);
        let root = ledger.snapshot_root();

        assert_eq!(witness.pre_paths.len(), 2);
        for (account, path) in witness.pre_accounts.iter().zip(&witness.pre_paths) {
            assert!(path.verify(&crate::state::account_leaf(account), &root));
        }
    }

    #[test]
    fn test_public_inputs_from_outcome() {
        let (ledger, txs) = scenario();
        let root = ledger.snapshot_root();
        let outcome = apply_batch(&ledger, &root, &txs, &BatchLimits::default()).unwrap();

        let inputs = build_public_inputs(&outcome);
        assert_eq!(inputs.to_vec(), vec![outcome.old_root.clone(), outcome.new_root.clone()]);
    }

    #[test]
    fn test_verification_key_hash() {
        assert_ne!(MockProver::new().verification_key_hash(), [0u8; 32]);
    }
}
