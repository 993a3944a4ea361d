pub mod commitment;
pub mod ledger;

pub use commitment::{MerklePath, StateTree, account_leaf, accounts_root, state_root};
pub use ledger::{Ledger, LedgerError, TransferError};
