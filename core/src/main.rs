use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, fs};

use anyhow::{Context, Result, bail};
use log::{info, warn};
use serde_json::{Map, Value, json};

use rollup_account::Identity;
use rollup_config::{RollupConfig, VerifierModeToml};
use rollup_core::execution::{BatchLimits, BatchOutcome, apply_batch};
use rollup_core::settlement::prover::build_public_inputs;
use rollup_core::settlement::{
    BatchProver, BatchWitness, Groth16Verifier, MockProver, MockVerifier, ProofGate, ProofVerifier,
};
use rollup_core::state::Ledger;
use rollup_core::storage::{GateStore, RocksDbStore};
use rollup_field::FieldElement;
use rollup_transaction::BatchInput;

const DEFAULT_OUT_DIR: &str = "build";

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let cmd = &args[1];
    let rest = &args[2..];

    let result = match cmd.as_str() {
        "roots" => roots(flag(rest, "--tx-file"), flag(rest, "--out")),
        "submit" => submit(flag(rest, "--tx-file"), flag(rest, "--proof")),
        "state" => show_state(),
        "batches" => show_batches(),
        "set-operator" => match rest.first() {
            Some(new_operator) => set_operator(new_operator),
            None => {
                println!("Usage: rollup set-operator <hex identity>");
                return;
            }
        },
        "sample-config" => {
            println!("{}", RollupConfig::generate_sample());
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        _ => {
            println!("❌ Unknown command: {}", cmd);
            println!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error running {}: {:#}", cmd, e);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("rollup - proof-gated state transition engine");
    println!();
    println!("USAGE:");
    println!("  rollup <command> [args]");
    println!();
    println!("COMMANDS:");
    println!("  roots [--tx-file <path>] [--out <dir>]     Compute roots, write input.json + state_roots.json");
    println!("  submit [--tx-file <path>] [--proof <path>] Apply a batch and submit it through the gate");
    println!("  state                                      Print current root, batch count, operator");
    println!("  batches                                    List accepted batches");
    println!("  set-operator <hex>                         Hand the operator role to another identity");
    println!("  sample-config                              Print a sample config.toml");
    println!();
    println!("Without --tx-file the built-in two-account scenario is used.");
}

/// Value following `name`, if present
fn flag(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

// ============================================================================
// Helpers
// ============================================================================

fn load_input(tx_file: Option<&str>) -> Result<BatchInput> {
    match tx_file {
        Some(path) => {
            info!("Reading captured transactions from {}", path);
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read transaction file {}", path))?;
            Ok(BatchInput::from_json_str(&json)?)
        }
        None => Ok(BatchInput::default_scenario()),
    }
}

fn operator_identity(config: &RollupConfig) -> Result<Identity> {
    match &config.gate.operator {
        Some(hex) => Identity::from_hex(hex).context("Invalid operator identity in config"),
        None => Ok(Identity::derive(&config.gate.operator_label)),
    }
}

/// Genesis root for a fresh gate; a configured root must match the initial ledger
fn genesis_root(configured: Option<&str>, ledger: &Ledger) -> Result<FieldElement> {
    let ledger_root = ledger.snapshot_root();
    let Some(root) = configured else {
        return Ok(ledger_root);
    };

    let root = FieldElement::parse(root).context("Invalid genesis root in config")?;
    if root != ledger_root {
        bail!(
            "genesis_root {} does not match the initial ledger root {}; no batch could ever link to it",
            root,
            ledger_root
        );
    }
    Ok(root)
}

fn build_verifier(config: &RollupConfig) -> Result<Arc<dyn ProofVerifier>> {
    match config.gate.verifier {
        VerifierModeToml::Mock => Ok(Arc::new(MockVerifier)),
        VerifierModeToml::Groth16 => {
            let path = config
                .gate
                .verifying_key_path
                .as_deref()
                .context("verifier = \"groth16\" requires verifying_key_path")?;
            Ok(Arc::new(Groth16Verifier::from_file(path)?))
        }
    }
}

fn open_store(config: &RollupConfig) -> Result<RocksDbStore> {
    RocksDbStore::open(&config.database.path)
        .with_context(|| format!("Failed to open database at {}", config.database.path))
}

fn circuit_input(ledger: &Ledger, input: &BatchInput, outcome: &BatchOutcome) -> Value {
    let mut fields = Map::new();
    fields.insert("oldStateRoot".into(), json!(outcome.old_root.to_string()));
    fields.insert("newStateRoot".into(), json!(outcome.new_root.to_string()));

    for (i, account) in ledger.accounts().iter().enumerate() {
        fields.insert(format!("pubkey_{i}"), json!(account.public_identifier.to_string()));
        fields.insert(format!("balance_{i}"), json!(account.balance.to_string()));
        fields.insert(format!("nonce_{i}"), json!(account.nonce.to_string()));
    }

    // Transactions are 1-based in the circuit's naming
    for (k, tx) in input.transactions.iter().enumerate() {
        let n = k + 1;
        fields.insert(format!("tx{n}_from"), json!(tx.from.to_string()));
        fields.insert(format!("tx{n}_to"), json!(tx.to.to_string()));
        fields.insert(format!("tx{n}_amount"), json!(tx.amount.to_string()));
        fields.insert(format!("tx{n}_nonce"), json!(tx.nonce.to_string()));
    }

    Value::Object(fields)
}

// ============================================================================
// Commands
// ============================================================================

fn roots(tx_file: Option<String>, out_dir: Option<String>) -> Result<()> {
    let config = RollupConfig::global();
    let input = load_input(tx_file.as_deref())?;
    let ledger = Ledger::new(input.accounts.clone())?;
    let limits = BatchLimits::from_config(&config.batch);

    let outcome = apply_batch(&ledger, &ledger.snapshot_root(), &input.transactions, &limits)?;
    if let Some(claimed) = &input.computed_roots {
        claimed.check(&outcome.old_root, &outcome.new_root)?;
    }

    for (i, account) in ledger.accounts().iter().enumerate() {
        info!(
            "Account {}: pubkey={}, balance={}, nonce={}",
            i, account.public_identifier, account.balance, account.nonce
        );
    }

    let out_dir = PathBuf::from(out_dir.as_deref().unwrap_or(DEFAULT_OUT_DIR));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let input_path = out_dir.join("input.json");
    write_json(&input_path, &circuit_input(&ledger, &input, &outcome))?;

    let roots_path = out_dir.join("state_roots.json");
    write_json(
        &roots_path,
        &json!({
            "oldStateRoot": outcome.old_root.to_string(),
            "newStateRoot": outcome.new_root.to_string(),
        }),
    )?;

    println!("Old state root: {}", outcome.old_root);
    println!("New state root: {}", outcome.new_root);
    println!("✅ Wrote {} and {}", input_path.display(), roots_path.display());
    Ok(())
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let pretty = serde_json::to_string_pretty(value)?;
    fs::write(path, pretty).with_context(|| format!("Failed to write {}", path.display()))
}

fn submit(tx_file: Option<String>, proof_file: Option<String>) -> Result<()> {
    let config = RollupConfig::global();
    let input = load_input(tx_file.as_deref())?;
    let operator = operator_identity(config)?;
    let limits = BatchLimits::from_config(&config.batch);

    let db = open_store(config)?;
    let ledger = match db.load_ledger()? {
        Some(ledger) => {
            if ledger.accounts() != input.accounts.as_slice() {
                warn!("Stored ledger differs from the batch file's accounts; applying to stored ledger");
            }
            ledger
        }
        None => Ledger::new(input.accounts.clone())?,
    };

    // Only a fresh store uses the genesis root
    let genesis = match db.load()? {
        Some(state) => state.current_root,
        None => genesis_root(config.gate.genesis_root.as_deref(), &ledger)?,
    };
    let store: Arc<dyn GateStore> = Arc::new(db.clone());
    let gate = ProofGate::open(store, build_verifier(config)?, genesis, operator)?;

    let old_root = gate.get_current_root();
    let outcome = apply_batch(&ledger, &old_root, &input.transactions, &limits)?;
    if let Some(claimed) = &input.computed_roots {
        claimed.check(&outcome.old_root, &outcome.new_root)?;
    }

    let public_inputs = build_public_inputs(&outcome);
    let proof = match proof_file {
        Some(path) => fs::read(&path).with_context(|| format!("Failed to read proof {}", path))?,
        None => {
            let witness = BatchWitness::build(&ledger, &input.transactions);
            MockProver::new().prove(&public_inputs, &witness)?.proof_bytes
        }
    };

    // New root, batch record and ledger land in one write
    let committed = gate.submit_outcome(&operator, &proof, &public_inputs.to_vec(), &outcome)?;

    println!("✅ Batch {} verified", committed.batch_id);
    println!("   Old root:  {}", committed.old_root);
    println!("   New root:  {}", committed.new_root);
    println!("   Submitter: {}", committed.submitter);
    Ok(())
}

fn open_gate(config: &RollupConfig, db: &RocksDbStore) -> Result<ProofGate> {
    if db.load()?.is_none() {
        bail!("No rollup state in {}; run `rollup submit` first", config.database.path);
    }
    let store: Arc<dyn GateStore> = Arc::new(db.clone());
    // Genesis values are unused once state exists
    ProofGate::open(
        store,
        build_verifier(config)?,
        FieldElement::zero(),
        operator_identity(config)?,
    )
}

fn show_state() -> Result<()> {
    let config = RollupConfig::global();
    let db = open_store(config)?;
    let gate = open_gate(config, &db)?;

    println!("{}", serde_json::to_string_pretty(&gate.state())?);
    println!("verifier: {}", gate.verifier_name());
    Ok(())
}

fn show_batches() -> Result<()> {
    let config = RollupConfig::global();
    let db = open_store(config)?;

    for batch in db.get_all_batches()? {
        println!(
            "#{} {} -> {} by {} at {} (txs {})",
            batch.batch_id,
            batch.old_root,
            batch.new_root,
            batch.submitter,
            chrono::DateTime::from_timestamp(batch.timestamp, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| batch.timestamp.to_string()),
            batch.batch_hash.map(hex::encode).unwrap_or_else(|| "-".into())
        );
    }
    Ok(())
}

fn set_operator(new_operator: &str) -> Result<()> {
    let config = RollupConfig::global();
    let new_operator = Identity::from_hex(new_operator)?;
    let db = open_store(config)?;
    let gate = open_gate(config, &db)?;

    gate.set_operator(&operator_identity(config)?, new_operator)?;
    println!("✅ Operator is now {}", gate.get_operator());
    Ok(())
}
