//! Captured Batch Input
//!
//! The JSON artifact produced by the transaction-capture tooling. Two shapes
//! are accepted:
//!
//! ```text
//! // generalized, any number of accounts
//! { "accounts": [{ "pubkeyId": 1, "balance": 1000, "nonce": 0 }, ...],
//!   "transactions": [{ "from": 0, "to": 1, "amount": 100, "nonce": 0 }],
//!   "computedRoots": { "oldStateRoot": "...", "newStateRoot": "..." } }
//!
//! // two-account capture
//! { "accountA": { "address": "0x..", "pubkeyId": 1 }, "accountB": { ... },
//!   "initialBalanceA": "1000", "initialBalanceB": "500",
//!   "initialNonceA": 0, "initialNonceB": 0,
//!   "transactions": [...], "computedRoots": { ... } }
//! ```
//!
//! Files are parsed into loose wire structs first and then validated into a
//! [`BatchInput`]; nothing malformed makes it past this module.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use rollup_account::{Account, AccountIndex};
use rollup_field::FieldElement;

use crate::Transaction;

/// Default identifiers for the two-account capture when `pubkeyId` is absent
const DEFAULT_PUBKEY_A: u64 = 1;
const DEFAULT_PUBKEY_B: u64 = 2;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("malformed batch file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("batch file has no accounts")]
    NoAccounts,

    #[error("batch file has no transactions")]
    NoTransactions,

    #[error("transaction {tx} references account {index}, but only {accounts} accounts exist")]
    AccountOutOfRange {
        tx: usize,
        index: AccountIndex,
        accounts: usize,
    },

    #[error("computed {which} root {claimed} does not match recomputed root {actual}")]
    ComputedRootMismatch {
        which: &'static str,
        claimed: FieldElement,
        actual: FieldElement,
    },
}

/// Roots the capture tool claims for the batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedRoots {
    pub old_state_root: FieldElement,
    pub new_state_root: FieldElement,
}

impl ComputedRoots {
    /// Compare against recomputed roots.
    pub fn check(&self, old_root: &FieldElement, new_root: &FieldElement) -> Result<(), CaptureError> {
        if &self.old_state_root != old_root {
            return Err(CaptureError::ComputedRootMismatch {
                which: "old",
                claimed: self.old_state_root.clone(),
                actual: old_root.clone(),
            });
        }
        if &self.new_state_root != new_root {
            return Err(CaptureError::ComputedRootMismatch {
                which: "new",
                claimed: self.new_state_root.clone(),
                actual: new_root.clone(),
            });
        }
        Ok(())
    }
}

/// A validated batch: the pre-batch accounts and the ordered transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInput {
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    pub computed_roots: Option<ComputedRoots>,
}

impl BatchInput {
    /// Parse and validate a captured batch file.
    pub fn from_json_str(json: &str) -> Result<Self, CaptureError> {
        let value: Value = serde_json::from_str(json)?;

        let input = if value.get("accounts").is_some() {
            serde_json::from_value::<AccountsFile>(value)?.into_input()
        } else {
            serde_json::from_value::<PairFile>(value)?.into_input()
        };

        input.validate()?;
        Ok(input)
    }

    /// Two accounts, two transfers:
    /// A(1, 1000, 0), B(2, 500, 0); A -> B 100 (nonce 0), B -> A 50 (nonce 0).
    pub fn default_scenario() -> Self {
        Self {
            accounts: vec![
                Account::with_balance(DEFAULT_PUBKEY_A, 1000),
                Account::with_balance(DEFAULT_PUBKEY_B, 500),
            ],
            transactions: vec![Transaction::new(0, 1, 100, 0), Transaction::new(1, 0, 50, 0)],
            computed_roots: None,
        }
    }

    fn validate(&self) -> Result<(), CaptureError> {
        if self.accounts.is_empty() {
            return Err(CaptureError::NoAccounts);
        }
        if self.transactions.is_empty() {
            return Err(CaptureError::NoTransactions);
        }

        let accounts = self.accounts.len();
        for (tx_index, tx) in self.transactions.iter().enumerate() {
            for index in [tx.from, tx.to] {
                if index >= accounts {
                    return Err(CaptureError::AccountOutOfRange {
                        tx: tx_index,
                        index,
                        accounts,
                    });
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Wire shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct CapturedTransaction {
    from: AccountIndex,
    to: AccountIndex,
    amount: FieldElement,
    nonce: FieldElement,
}

impl From<CapturedTransaction> for Transaction {
    fn from(tx: CapturedTransaction) -> Self {
        Transaction {
            from: tx.from,
            to: tx.to,
            amount: tx.amount,
            nonce: tx.nonce,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CapturedAccount {
    pubkey_id: FieldElement,
    balance: FieldElement,
    #[serde(default)]
    nonce: FieldElement,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountsFile {
    accounts: Vec<CapturedAccount>,
    transactions: Vec<CapturedTransaction>,
    #[serde(default)]
    computed_roots: Option<ComputedRoots>,
}

impl AccountsFile {
    fn into_input(self) -> BatchInput {
        BatchInput {
            accounts: self
                .accounts
                .into_iter()
                .map(|a| Account::new(a.pubkey_id, a.balance, a.nonce))
                .collect(),
            transactions: self.transactions.into_iter().map(Into::into).collect(),
            computed_roots: self.computed_roots,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairAccount {
    #[serde(default)]
    pubkey_id: Option<FieldElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairFile {
    #[serde(default, rename = "accountA")]
    account_a: PairAccount,
    #[serde(default, rename = "accountB")]
    account_b: PairAccount,
    #[serde(rename = "initialBalanceA")]
    initial_balance_a: FieldElement,
    #[serde(rename = "initialBalanceB")]
    initial_balance_b: FieldElement,
    #[serde(default, rename = "initialNonceA")]
    initial_nonce_a: FieldElement,
    #[serde(default, rename = "initialNonceB")]
    initial_nonce_b: FieldElement,
    transactions: Vec<CapturedTransaction>,
    #[serde(default)]
    computed_roots: Option<ComputedRoots>,
}

impl PairFile {
    fn into_input(self) -> BatchInput {
        let pubkey_a = self
            .account_a
            .pubkey_id
            .unwrap_or_else(|| FieldElement::from(DEFAULT_PUBKEY_A));
        let pubkey_b = self
            .account_b
            .pubkey_id
            .unwrap_or_else(|| FieldElement::from(DEFAULT_PUBKEY_B));

        BatchInput {
            accounts: vec![
                Account::new(pubkey_a, self.initial_balance_a, self.initial_nonce_a),
                Account::new(pubkey_b, self.initial_balance_b, self.initial_nonce_b),
            ],
            transactions: self.transactions.into_iter().map(Into::into).collect(),
            computed_roots: self.computed_roots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generalized_shape() {
        let json = r#"{
            "accounts": [
                { "pubkeyId": 1, "balance": "1000", "nonce": 0, "address": "0xaa" },
                { "pubkeyId": "2", "balance": 500 },
                { "pubkeyId": 3, "balance": 0 }
            ],
            "transactions": [{ "from": 0, "to": 2, "amount": 10, "nonce": 0, "txHash": "0x01" }]
        }"#;

        let input = BatchInput::from_json_str(json).unwrap();
        assert_eq!(input.accounts.len(), 3);
        assert_eq!(input.accounts[1].nonce, FieldElement::zero());
        assert_eq!(input.transactions, vec![Transaction::new(0, 2, 10, 0)]);
        assert!(input.computed_roots.is_none());
    }

    #[test]
    fn test_parse_two_account_shape() {
        let json = r#"{
            "accountA": { "address": "0xabc", "pubkeyId": "7" },
            "initialBalanceA": "1000",
            "initialBalanceB": "500",
            "initialNonceA": 3,
            "transactions": [
                { "from": 0, "to": 1, "amount": 100, "nonce": 3 },
                { "from": 1, "to": 0, "amount": 50, "nonce": 0 }
            ],
            "computedRoots": { "oldStateRoot": "11", "newStateRoot": "22" }
        }"#;

        let input = BatchInput::from_json_str(json).unwrap();
        assert_eq!(input.accounts[0].public_identifier, FieldElement::from(7));
        assert_eq!(input.accounts[0].nonce, FieldElement::from(3));
        // accountB falls back to the default identifier
        assert_eq!(input.accounts[1].public_identifier, FieldElement::from(2));
        assert_eq!(input.transactions.len(), 2);

        let roots = input.computed_roots.unwrap();
        assert_eq!(roots.old_state_root, FieldElement::from(11));
        assert_eq!(roots.new_state_root, FieldElement::from(22));
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let json = r#"{
            "initialBalanceA": 1, "initialBalanceB": 1,
            "transactions": [{ "from": 0, "to": 2, "amount": 1, "nonce": 0 }]
        }"#;

        let err = BatchInput::from_json_str(json).unwrap_err();
        assert!(matches!(
            err,
            CaptureError::AccountOutOfRange { tx: 0, index: 2, accounts: 2 }
        ));
    }

    #[test]
    fn test_rejects_malformed_values() {
        let negative = r#"{ "accounts": [{ "pubkeyId": 1, "balance": -5 }], "transactions": [] }"#;
        assert!(matches!(
            BatchInput::from_json_str(negative),
            Err(CaptureError::Json(_))
        ));

        let text = r#"{ "initialBalanceA": "lots", "initialBalanceB": 1, "transactions": [] }"#;
        assert!(matches!(BatchInput::from_json_str(text), Err(CaptureError::Json(_))));
    }

    #[test]
    fn test_rejects_empty_batches() {
        let no_tx = r#"{ "accounts": [{ "pubkeyId": 1, "balance": 5 }], "transactions": [] }"#;
        assert!(matches!(
            BatchInput::from_json_str(no_tx),
            Err(CaptureError::NoTransactions)
        ));

        let no_accounts = r#"{ "accounts": [], "transactions": [] }"#;
        assert!(matches!(
            BatchInput::from_json_str(no_accounts),
            Err(CaptureError::NoAccounts)
        ));
    }

    #[test]
    fn test_computed_roots_check() {
        let roots = ComputedRoots {
            old_state_root: FieldElement::from(1),
            new_state_root: FieldElement::from(2),
        };
        assert!(roots.check(&FieldElement::from(1), &FieldElement::from(2)).is_ok());
        assert!(matches!(
            roots.check(&FieldElement::from(1), &FieldElement::from(3)),
            Err(CaptureError::ComputedRootMismatch { which: "new", .. })
        ));
    }

    #[test]
    fn test_default_scenario() {
        let input = BatchInput::default_scenario();
        assert_eq!(input.accounts[0], Account::with_balance(1, 1000));
        assert_eq!(input.accounts[1], Account::with_balance(2, 500));
        assert_eq!(input.transactions[1], Transaction::new(1, 0, 50, 0));
    }
}
