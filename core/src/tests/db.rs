use std::sync::Arc;

use tempfile::TempDir;

use rollup_account::{Account, Identity};
use rollup_field::FieldElement;
use rollup_transaction::{BatchInput, Transaction};

use crate::execution::{BatchLimits, apply_batch, batch_hash};
use crate::settlement::prover::mock_proof_digest;
use crate::settlement::{BatchCommitted, MockVerifier, ProofGate, RollupState};
use crate::state::Ledger;
use crate::storage::{GateStore, RocksDbStore};

/// Create a temporary DB for each test; the directory lives as long as the guard
fn temp_db() -> (TempDir, RocksDbStore) {
    let dir = TempDir::new().unwrap();
    let db = RocksDbStore::open(dir.path()).unwrap();
    (dir, db)
}

fn fe(v: u64) -> FieldElement {
    FieldElement::from(v)
}

fn state(root: u64, count: u64) -> RollupState {
    RollupState {
        current_root: fe(root),
        batch_count: count,
        operator: Identity::derive("operator"),
    }
}

#[test]
fn fresh_store_has_no_state() {
    let (_dir, db) = temp_db();
    assert!(db.load().unwrap().is_none());
    assert!(db.load_ledger().unwrap().is_none());
    assert!(db.get_all_batches().unwrap().is_empty());
}

#[test]
fn persist_writes_state_and_record_together() {
    let (_dir, db) = temp_db();
    let record = BatchCommitted {
        batch_id: 1,
        old_root: fe(10),
        new_root: fe(20),
        submitter: Identity::derive("operator"),
        timestamp: 1_700_000_000,
        batch_hash: Some([7u8; 32]),
    };

    db.persist(&state(20, 1), Some(&record), None).unwrap();

    assert_eq!(db.load().unwrap(), Some(state(20, 1)));
    assert_eq!(db.get_batch(1).unwrap(), Some(record.clone()));
    assert_eq!(db.get_batch(2).unwrap(), None);
    assert_eq!(db.get_all_batches().unwrap(), vec![record]);
}

#[test]
fn state_overwrite_works() {
    let (_dir, db) = temp_db();
    db.persist(&state(1, 0), None, None).unwrap();
    db.persist(&state(2, 1), None, None).unwrap();
    assert_eq!(db.load().unwrap(), Some(state(2, 1)));
}

#[test]
fn ledger_roundtrip() {
    let (_dir, db) = temp_db();
    let ledger = Ledger::new(vec![
        Account::with_balance(1, 1000),
        Account::new(fe(2), fe(550), fe(3)),
        Account::with_balance(3, 0),
    ])
    .unwrap();

    db.persist(&state(0, 0), None, Some(&ledger)).unwrap();
    let loaded = db.load_ledger().unwrap().unwrap();

    assert_eq!(loaded, ledger);
    assert_eq!(loaded.snapshot_root(), ledger.snapshot_root());
}

#[test]
fn ledger_links_to_gate_root_across_reopen() {
    let dir = TempDir::new().unwrap();
    let operator = Identity::derive("operator");
    let input = BatchInput::default_scenario();
    let genesis = Ledger::new(input.accounts.clone()).unwrap();

    {
        let db = Arc::new(RocksDbStore::open(dir.path()).unwrap());
        let gate = ProofGate::open(db, Arc::new(MockVerifier), genesis.snapshot_root(), operator).unwrap();
        let outcome = apply_batch(
            &genesis,
            &gate.get_current_root(),
            &input.transactions,
            &BatchLimits::default(),
        )
        .unwrap();
        let inputs = [outcome.old_root.clone(), outcome.new_root.clone()];
        gate.submit_outcome(&operator, &mock_proof_digest(&inputs), &inputs, &outcome)
            .unwrap();
    }

    // Nothing else is written between runs: the ledger came with the commit
    let db = Arc::new(RocksDbStore::open(dir.path()).unwrap());
    let ledger = db.load_ledger().unwrap().unwrap();
    let gate = ProofGate::open(db.clone(), Arc::new(MockVerifier), fe(0), operator).unwrap();
    assert_eq!(ledger.snapshot_root(), gate.get_current_root());
    assert_eq!(gate.get_current_root(), fe(12_597_363));

    let txs = vec![Transaction::new(0, 1, 10, 1)];
    let outcome = apply_batch(&ledger, &gate.get_current_root(), &txs, &BatchLimits::default()).unwrap();
    let inputs = [outcome.old_root.clone(), outcome.new_root.clone()];
    let second = gate
        .submit_outcome(&operator, &mock_proof_digest(&inputs), &inputs, &outcome)
        .unwrap();

    assert_eq!(second.batch_id, 2);
    assert_eq!(second.batch_hash, Some(batch_hash(&txs)));
    assert_eq!(db.load_ledger().unwrap().unwrap().snapshot_root(), gate.get_current_root());
    assert_eq!(db.get_all_batches().unwrap().len(), 2);
}

#[test]
fn gate_resumes_after_reopen() {
    let dir = TempDir::new().unwrap();
    let operator = Identity::derive("operator");

    {
        let db = Arc::new(RocksDbStore::open(dir.path()).unwrap());
        let gate = ProofGate::open(db, Arc::new(MockVerifier), fe(10), operator).unwrap();
        let proof = mock_proof_digest(&[fe(10), fe(20)]);
        gate.submit_batch(&operator, &proof, &[fe(10), fe(20)], &fe(10), &fe(20))
            .unwrap();
    }

    let db = Arc::new(RocksDbStore::open(dir.path()).unwrap());
    // Genesis arguments are ignored once state exists
    let gate = ProofGate::open(db.clone(), Arc::new(MockVerifier), fe(999), Identity::derive("other")).unwrap();

    assert_eq!(gate.get_current_root(), fe(20));
    assert_eq!(gate.get_batch_count(), 1);
    assert_eq!(gate.get_operator(), operator);
    assert_eq!(db.get_batch(1).unwrap().unwrap().new_root, fe(20));
}
