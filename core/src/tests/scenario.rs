//! End-to-end: captured batch -> ledger -> batch -> proof -> gate.

use std::sync::Arc;

use rollup_account::{Account, Identity};
use rollup_field::FieldElement;
use rollup_transaction::{BatchInput, Transaction};

use crate::execution::{BatchError, BatchLimits, apply_batch};
use crate::settlement::prover::build_public_inputs;
use crate::settlement::{
    BatchProver, BatchWitness, GateEvent, MockProver, MockVerifier, ProofGate, SubmitError,
};
use crate::state::{Ledger, TransferError};
use crate::storage::MemoryGateStore;

fn fe(v: u64) -> FieldElement {
    FieldElement::from(v)
}

fn operator() -> Identity {
    Identity::derive("operator")
}

#[test]
fn default_scenario_end_to_end() {
    let input = BatchInput::default_scenario();
    let ledger = Ledger::new(input.accounts.clone()).unwrap();
    let old_root = ledger.snapshot_root();
    assert_eq!(old_root, fe(3_016_020));

    let outcome = apply_batch(&ledger, &old_root, &input.transactions, &BatchLimits::default()).unwrap();
    assert_eq!(outcome.ledger.get_account(0).unwrap(), &Account::new(fe(1), fe(950), fe(1)));
    assert_eq!(outcome.ledger.get_account(1).unwrap(), &Account::new(fe(2), fe(550), fe(1)));
    assert_eq!(outcome.new_root, fe(12_597_363));

    let inputs = build_public_inputs(&outcome);
    let proof = MockProver::new()
        .prove(&inputs, &BatchWitness::build(&ledger, &input.transactions))
        .unwrap();

    let store = Arc::new(MemoryGateStore::new());
    let gate = ProofGate::open(store.clone(), Arc::new(MockVerifier), old_root.clone(), operator()).unwrap();
    let mut events = gate.subscribe();

    let committed = gate
        .submit_batch(
            &operator(),
            &proof.proof_bytes,
            &inputs.to_vec(),
            &outcome.old_root,
            &outcome.new_root,
        )
        .unwrap();

    assert_eq!(gate.get_current_root(), outcome.new_root);
    assert_eq!(gate.get_batch_count(), 1);
    assert_eq!(committed.batch_id, 1);
    assert_eq!(store.batches(), vec![committed.clone()]);
    assert!(matches!(events.try_recv().unwrap(), GateEvent::BatchVerified { batch_id: 1, .. }));

    // Same transition again: the gate has moved on
    let err = gate
        .submit_batch(
            &operator(),
            &proof.proof_bytes,
            &inputs.to_vec(),
            &outcome.old_root,
            &outcome.new_root,
        )
        .unwrap_err();
    assert!(matches!(err, SubmitError::StateRootMismatch { .. }));
    assert_eq!(gate.get_batch_count(), 1);
}

#[test]
fn chained_batches_follow_the_gate() {
    let mut ledger = Ledger::new(BatchInput::default_scenario().accounts).unwrap();
    let gate = ProofGate::in_memory(Arc::new(MockVerifier), ledger.snapshot_root(), operator()).unwrap();
    let prover = MockProver::new();

    let batches = [
        vec![Transaction::new(0, 1, 100, 0), Transaction::new(1, 0, 50, 0)],
        vec![Transaction::new(0, 1, 10, 1)],
        vec![Transaction::new(1, 0, 560, 1)],
    ];

    for (i, txs) in batches.iter().enumerate() {
        let old_root = gate.get_current_root();
        let outcome = apply_batch(&ledger, &old_root, txs, &BatchLimits::default()).unwrap();
        let inputs = build_public_inputs(&outcome);
        let proof = prover.prove(&inputs, &BatchWitness::build(&ledger, txs)).unwrap();

        let committed = gate
            .submit_batch(&operator(), &proof.proof_bytes, &inputs.to_vec(), &old_root, &outcome.new_root)
            .unwrap();
        assert_eq!(committed.batch_id, i as u64 + 1);
        ledger = outcome.ledger;
    }

    assert_eq!(gate.get_batch_count(), 3);
    assert_eq!(gate.get_current_root(), ledger.snapshot_root());
    assert_eq!(ledger.total_supply().unwrap(), fe(1500));
    assert_eq!(ledger.get_account(0).unwrap().balance, fe(1500));
    assert_eq!(ledger.get_account(1).unwrap().balance, fe(0));
}

#[test]
fn failed_batch_leaves_everything_untouched() {
    let ledger = Ledger::new(BatchInput::default_scenario().accounts).unwrap();
    let gate = ProofGate::in_memory(Arc::new(MockVerifier), ledger.snapshot_root(), operator()).unwrap();
    let before = ledger.clone();

    let txs = vec![Transaction::new(0, 1, 100, 0), Transaction::new(1, 0, 10_000, 0)];
    let err = apply_batch(&ledger, &gate.get_current_root(), &txs, &BatchLimits::default()).unwrap_err();

    assert!(matches!(
        err,
        BatchError::TransactionFailed {
            index: 1,
            cause: TransferError::InsufficientBalance { .. }
        }
    ));
    assert_eq!(ledger, before);
    assert_eq!(gate.get_batch_count(), 0);
}

#[test]
fn captured_file_roots_are_checked() {
    let json = r#"{
        "accountA": { "address": "0x01", "pubkeyId": 1 },
        "accountB": { "address": "0x02", "pubkeyId": 2 },
        "initialBalanceA": "1000",
        "initialBalanceB": "500",
        "transactions": [
            { "from": 0, "to": 1, "amount": "100", "nonce": 0 },
            { "from": 1, "to": 0, "amount": "50", "nonce": 0 }
        ],
        "computedRoots": { "oldStateRoot": "3016020", "newStateRoot": "12597363" }
    }"#;

    let input = BatchInput::from_json_str(json).unwrap();
    let ledger = Ledger::new(input.accounts.clone()).unwrap();
    let outcome = apply_batch(
        &ledger,
        &ledger.snapshot_root(),
        &input.transactions,
        &BatchLimits::default(),
    )
    .unwrap();

    let roots = input.computed_roots.unwrap();
    assert!(roots.check(&outcome.old_root, &outcome.new_root).is_ok());
    assert!(roots.check(&outcome.new_root, &outcome.old_root).is_err());
}
