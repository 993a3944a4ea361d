pub mod events;
pub mod gate;
pub mod prover;
pub mod service;
pub mod verifier;

pub use events::GateEvent;
pub use gate::{BatchCommitted, ProofGate, RollupState, SubmitError};
pub use prover::{BatchProof, BatchProver, BatchPublicInputs, BatchWitness, MockProver};
pub use service::GateService;
pub use verifier::{AcceptAllVerifier, Groth16Verifier, MockVerifier, ProofVerifier};
