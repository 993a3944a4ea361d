//! Rollup state-transition engine.
//!
//! ```text
//! Ledger ──snapshot_root──▶ old_root
//!    │
//!    └─ apply_batch(txs) ──▶ new ledger, new_root
//!                                  │
//!              prover ── proof ────┤
//!                                  ▼
//!              ProofGate::submit_batch(old_root, new_root, proof)
//! ```

pub mod execution;
pub mod settlement;
pub mod state;
pub mod storage;

#[cfg(test)]
mod tests;
