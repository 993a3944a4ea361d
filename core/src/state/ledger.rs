//! Account Ledger
//!
//! In-memory balances and nonces for a fixed, ordered set of accounts.
//! An account's identity is its index. The root is recomputed from the
//! accounts on every call and never cached across mutations.

use thiserror::Error;
use tracing::debug;

use rollup_account::{Account, AccountIndex};
use rollup_field::FieldElement;
use rollup_transaction::Transaction;

use super::commitment::{StateTree, account_leaf, accounts_root};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("account index {index} out of range (ledger has {accounts} accounts)")]
    UnknownAccount {
        index: AccountIndex,
        accounts: usize,
    },

    #[error("insufficient balance: account {index} has {balance}, transfer needs {amount}")]
    InsufficientBalance {
        index: AccountIndex,
        balance: FieldElement,
        amount: FieldElement,
    },

    #[error("nonce mismatch on account {index}: expected {expected}, got {got}")]
    NonceMismatch {
        index: AccountIndex,
        expected: FieldElement,
        got: FieldElement,
    },

    #[error("invalid transaction: {0}")]
    InvalidTransaction(&'static str),

    #[error("balance overflow crediting account {index}")]
    BalanceOverflow { index: AccountIndex },

    #[error("nonce overflow on account {index}")]
    NonceOverflow { index: AccountIndex },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger must hold at least one account")]
    Empty,
}

/// Ordered account set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    accounts: Vec<Account>,
}

impl Ledger {
    pub fn new(accounts: Vec<Account>) -> Result<Self, LedgerError> {
        if accounts.is_empty() {
            return Err(LedgerError::Empty);
        }
        Ok(Self { accounts })
    }

    pub fn get_account(&self, index: AccountIndex) -> Result<&Account, TransferError> {
        self.accounts.get(index).ok_or(TransferError::UnknownAccount {
            index,
            accounts: self.accounts.len(),
        })
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn leaves(&self) -> Vec<FieldElement> {
        self.accounts.iter().map(account_leaf).collect()
    }

    /// Full commitment tree, for inclusion paths
    pub fn tree(&self) -> StateTree {
        StateTree::from_accounts(&self.accounts)
    }

    /// Recompute the state root from the current accounts.
    pub fn snapshot_root(&self) -> FieldElement {
        accounts_root(&self.accounts)
    }

    /// Sum of all balances. `None` if the exact sum leaves the field.
    pub fn total_supply(&self) -> Option<FieldElement> {
        self.accounts
            .iter()
            .try_fold(FieldElement::zero(), |acc, a| acc.checked_add(&a.balance))
    }

    /// Apply one transfer.
    ///
    /// Every check runs before any field is written, so on error the ledger
    /// is exactly as it was.
    pub fn apply_transfer(&mut self, tx: &Transaction) -> Result<(), TransferError> {
        let sender = self.get_account(tx.from)?;
        let receiver = self.get_account(tx.to)?;

        if tx.from == tx.to {
            return Err(TransferError::InvalidTransaction("sender and receiver are the same account"));
        }
        if tx.amount.is_zero() {
            return Err(TransferError::InvalidTransaction("amount must be greater than zero"));
        }
        if tx.nonce != sender.nonce {
            return Err(TransferError::NonceMismatch {
                index: tx.from,
                expected: sender.nonce.clone(),
                got: tx.nonce.clone(),
            });
        }

        let sender_balance =
            sender
                .balance
                .checked_sub(&tx.amount)
                .ok_or_else(|| TransferError::InsufficientBalance {
                    index: tx.from,
                    balance: sender.balance.clone(),
                    amount: tx.amount.clone(),
                })?;
        let sender_nonce = sender
            .nonce
            .checked_add(&FieldElement::one())
            .ok_or(TransferError::NonceOverflow { index: tx.from })?;
        let receiver_balance = receiver
            .balance
            .checked_add(&tx.amount)
            .ok_or(TransferError::BalanceOverflow { index: tx.to })?;

        // Commit
        let sender = &mut self.accounts[tx.from];
        sender.balance = sender_balance;
        sender.nonce = sender_nonce;
        self.accounts[tx.to].balance = receiver_balance;

        debug!(from = tx.from, to = tx.to, amount = %tx.amount, "transfer applied");
        Ok(())
    }
}
