use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;

use rollup_account::Account;

use crate::settlement::{BatchCommitted, RollupState};
use crate::state::Ledger;
use crate::storage::GateStore;

const CF_ROLLUP_STATE: &str = "rollup_state";
const CF_BATCHES: &str = "batches";
const CF_ACCOUNTS: &str = "accounts";

const KEY_STATE: &[u8] = b"state";
const KEY_ACCOUNT_COUNT: &[u8] = b"account_count";

/// A thread-safe wrapper around RocksDB.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![
            ColumnFamilyDescriptor::new(CF_ROLLUP_STATE, Options::default()),
            ColumnFamilyDescriptor::new(CF_BATCHES, Options::default()),
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, families)
            .map_err(|e| anyhow::anyhow!("Failed to open RocksDB: {}", e))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Accepted batch record by id
    pub fn get_batch(&self, batch_id: u64) -> Result<Option<BatchCommitted>> {
        let cf = self.db.cf_handle(CF_BATCHES).context("batches CF missing")?;

        match self.db.get_cf(cf, batch_id.to_be_bytes())? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).context("corrupt batch record")?,
            )),
            None => Ok(None),
        }
    }

    /// All accepted batch records in id order
    pub fn get_all_batches(&self) -> Result<Vec<BatchCommitted>> {
        let cf = self.db.cf_handle(CF_BATCHES).context("batches CF missing")?;

        let mut batches = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            batches.push(serde_json::from_slice(&value).context("corrupt batch record")?);
        }
        Ok(batches)
    }

    // =========================================================================
    // Sequencer ledger
    // =========================================================================

    /// Stage `ledger` into `batch`, replacing whatever ledger is stored
    fn put_ledger(&self, batch: &mut WriteBatch, ledger: &Ledger) -> Result<()> {
        let cf_accounts = self.db.cf_handle(CF_ACCOUNTS).context("accounts CF missing")?;

        for (index, account) in ledger.accounts().iter().enumerate() {
            batch.put_cf(cf_accounts, (index as u64).to_be_bytes(), serde_json::to_vec(account)?);
        }
        batch.put_cf(cf_accounts, KEY_ACCOUNT_COUNT, (ledger.len() as u64).to_be_bytes());
        Ok(())
    }

    /// Stored ledger, `None` if none has been written
    pub fn load_ledger(&self) -> Result<Option<Ledger>> {
        let cf = self.db.cf_handle(CF_ACCOUNTS).context("accounts CF missing")?;

        let Some(count) = self.db.get_cf(cf, KEY_ACCOUNT_COUNT)? else {
            return Ok(None);
        };
        let count = u64::from_be_bytes(
            count
                .as_slice()
                .try_into()
                .context("invalid account count length")?,
        );

        let mut accounts = Vec::new();
        for index in 0..count {
            let bytes = self
                .db
                .get_cf(cf, index.to_be_bytes())?
                .with_context(|| format!("account {} missing from ledger", index))?;
            let account: Account = serde_json::from_slice(&bytes).context("corrupt account")?;
            accounts.push(account);
        }

        Ok(Some(Ledger::new(accounts)?))
    }
}

impl GateStore for RocksDbStore {
    fn load(&self) -> Result<Option<RollupState>> {
        let cf = self
            .db
            .cf_handle(CF_ROLLUP_STATE)
            .context("rollup_state CF missing")?;

        match self.db.get_cf(cf, KEY_STATE)? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).context("corrupt rollup state")?,
            )),
            None => Ok(None),
        }
    }

    fn persist(
        &self,
        state: &RollupState,
        record: Option<&BatchCommitted>,
        ledger: Option<&Ledger>,
    ) -> Result<()> {
        let cf_state = self
            .db
            .cf_handle(CF_ROLLUP_STATE)
            .context("rollup_state CF missing")?;
        let cf_batches = self.db.cf_handle(CF_BATCHES).context("batches CF missing")?;

        let mut batch = WriteBatch::default();
        batch.put_cf(cf_state, KEY_STATE, serde_json::to_vec(state)?);
        if let Some(record) = record {
            batch.put_cf(cf_batches, record.batch_id.to_be_bytes(), serde_json::to_vec(record)?);
        }
        if let Some(ledger) = ledger {
            self.put_ledger(&mut batch, ledger)?;
        }

        self.db.write(batch)?;
        Ok(())
    }
}
