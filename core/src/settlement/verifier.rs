//! Proof Verifiers
//!
//! The gate treats verification as a black box over `(proof, public_inputs)`.
//! Binding the public inputs to `[old_root, new_root]` is the gate's job, not
//! the verifier's.

use anyhow::{Context, Result};
use ark_bn254::{Bn254, Fr};
use ark_ff::PrimeField;
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use tracing::{debug, info};

use rollup_field::FieldElement;

use super::prover::mock_proof_digest;

pub trait ProofVerifier: Send + Sync {
    fn verify(&self, proof: &[u8], public_inputs: &[FieldElement]) -> bool;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Accepts exactly the digests produced by `MockProver`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockVerifier;

impl ProofVerifier for MockVerifier {
    fn verify(&self, proof: &[u8], public_inputs: &[FieldElement]) -> bool {
        proof == mock_proof_digest(public_inputs).as_slice()
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Accepts any proof. Only for exercising gate logic in isolation.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllVerifier;

impl ProofVerifier for AcceptAllVerifier {
    fn verify(&self, _proof: &[u8], _public_inputs: &[FieldElement]) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "accept-all"
    }
}

// ============================================================================
// Groth16 (BN254)
// ============================================================================

/// Groth16 verifier over BN254 using arkworks.
///
/// Keys and proofs use arkworks' compressed canonical serialization.
pub struct Groth16Verifier {
    prepared: PreparedVerifyingKey<Bn254>,
    vk_hash: [u8; 32],
}

impl Groth16Verifier {
    pub fn new(verifying_key: VerifyingKey<Bn254>) -> Result<Self> {
        let vk_hash = Self::compute_vk_hash(&verifying_key)?;
        info!(vk_hash = %hex::encode(vk_hash), "Loaded Groth16 verifying key");
        Ok(Self {
            prepared: Groth16::<Bn254>::process_vk(&verifying_key)
                .map_err(|e| anyhow::anyhow!("Failed to prepare verifying key: {}", e))?,
            vk_hash,
        })
    }

    /// Create a verifier from a serialized verifying key
    pub fn from_bytes(vk_bytes: &[u8]) -> Result<Self> {
        let verifying_key = VerifyingKey::<Bn254>::deserialize_compressed(vk_bytes)
            .map_err(|e| anyhow::anyhow!("Failed to deserialize verifying key: {}", e))?;
        Self::new(verifying_key)
    }

    /// Load verifier from file
    pub fn from_file(vk_path: &str) -> Result<Self> {
        let vk_bytes = std::fs::read(vk_path)
            .with_context(|| format!("Failed to read verifying key from {}", vk_path))?;
        Self::from_bytes(&vk_bytes)
    }

    fn compute_vk_hash(vk: &VerifyingKey<Bn254>) -> Result<[u8; 32]> {
        let mut vk_bytes = Vec::new();
        vk.serialize_compressed(&mut vk_bytes)
            .map_err(|e| anyhow::anyhow!("Failed to serialize VK: {}", e))?;
        Ok(*blake3::hash(&vk_bytes).as_bytes())
    }

    pub fn verification_key_hash(&self) -> [u8; 32] {
        self.vk_hash
    }

    /// Same integer, same element: both sides reduce modulo the BN254 scalar order
    pub fn public_input_to_fr(input: &FieldElement) -> Fr {
        Fr::from_be_bytes_mod_order(&input.to_bytes_be())
    }
}

impl ProofVerifier for Groth16Verifier {
    fn verify(&self, proof: &[u8], public_inputs: &[FieldElement]) -> bool {
        let proof = match Proof::<Bn254>::deserialize_compressed(proof) {
            Ok(proof) => proof,
            Err(e) => {
                debug!("malformed groth16 proof: {}", e);
                return false;
            }
        };

        let inputs: Vec<Fr> = public_inputs.iter().map(Self::public_input_to_fr).collect();

        match Groth16::<Bn254>::verify_with_processed_vk(&self.prepared, &inputs, &proof) {
            Ok(valid) => valid,
            Err(e) => {
                debug!("groth16 verification error: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "groth16"
    }
}
