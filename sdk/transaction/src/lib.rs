use serde::{Deserialize, Serialize};

use rollup_account::AccountIndex;
use rollup_field::FieldElement;

pub mod capture;
pub use capture::{BatchInput, CaptureError, ComputedRoots};

/// A transfer between two ledger accounts.
///
/// `nonce` must equal the sender's current nonce for the transfer to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: AccountIndex,
    pub to: AccountIndex,
    pub amount: FieldElement,
    pub nonce: FieldElement,
}

impl Transaction {
    pub fn new(from: AccountIndex, to: AccountIndex, amount: u64, nonce: u64) -> Self {
        Self {
            from,
            to,
            amount: FieldElement::from(amount),
            nonce: FieldElement::from(nonce),
        }
    }
}
