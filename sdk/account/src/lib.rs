use std::fmt;
use std::str::FromStr;

use rollup_field::FieldElement;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Position of an account in the ledger. Identity of an account is its index.
pub type AccountIndex = usize;

/// The state of an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub public_identifier: FieldElement,
    pub balance: FieldElement,
    pub nonce: FieldElement,
}

impl Account {
    pub fn new(public_identifier: FieldElement, balance: FieldElement, nonce: FieldElement) -> Self {
        Self {
            public_identifier,
            balance,
            nonce,
        }
    }

    /// Fresh account with nonce 0
    pub fn with_balance(public_identifier: u64, balance: u64) -> Self {
        Self::new(
            FieldElement::from(public_identifier),
            FieldElement::from(balance),
            FieldElement::zero(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("identity must be 32 bytes of hex, got {0:?}")]
    InvalidHex(String),
}

/// A 32-byte caller identity (operator, submitter).
///
/// The all-zero value is the null identity and is never a valid operator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identity(pub [u8; 32]);

impl Identity {
    pub const ZERO: Identity = Identity([0u8; 32]);

    /// Deterministically derive an identity from a label.
    /// Formula: SHA256( label )
    pub fn derive(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(label.as_bytes());
        Identity(hasher.finalize().into())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse 64 hex digits, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, IdentityError> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| IdentityError::InvalidHex(s.to_string()))?;
        Ok(Identity(bytes))
    }
}

impl AsRef<[u8]> for Identity {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.to_hex())
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Identity::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
