//! BN254 Scalar Field Arithmetic
//!
//! Exact arithmetic modulo the BN254 scalar field order, the field the batch
//! proof system works over. Every [`FieldElement`] is kept in `[0, P)`:
//! constructors either reduce or reject, and subtraction adds `P` before
//! reducing so a negative intermediate is never observable.
//!
//! Values from external files go through [`FieldElement::parse`], which rejects
//! anything that is not already a canonical field element.

use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;
use std::sync::LazyLock;

use num_bigint::BigUint;
use num_traits::{Num, One, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub mod hash;

pub use hash::{hash_three, hash_two};

/// BN254 scalar field modulus (Fr)
/// q = 21888242871839275222246405745257275088548364400416034343698204186575808495617
pub const MODULUS_DECIMAL: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

/// Size of the canonical big-endian encoding
pub const FIELD_BYTES: usize = 32;

static MODULUS: LazyLock<BigUint> = LazyLock::new(|| {
    BigUint::parse_bytes(MODULUS_DECIMAL.as_bytes(), 10).expect("Invalid modulus")
});

/// Field element parse/decode errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("empty field element")]
    Empty,

    #[error("malformed field element: {0:?}")]
    Malformed(String),

    #[error("value {0} is not below the BN254 scalar modulus")]
    OutOfRange(String),
}

/// An element of the BN254 scalar field.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FieldElement(BigUint);

impl FieldElement {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn one() -> Self {
        Self(BigUint::one())
    }

    /// The field order `P`
    pub fn modulus() -> &'static BigUint {
        &MODULUS
    }

    /// Reduce an arbitrary integer into the field.
    pub fn reduce(value: BigUint) -> Self {
        Self(value % &*MODULUS)
    }

    /// Accept an integer only if it is already canonical (`< P`).
    pub fn try_from_biguint(value: BigUint) -> Result<Self, FieldError> {
        if value >= *MODULUS {
            return Err(FieldError::OutOfRange(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Parse a decimal or `0x`-prefixed hex string.
    ///
    /// Signs, whitespace inside the number and values `>= P` are rejected.
    pub fn parse(input: &str) -> Result<Self, FieldError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(FieldError::Empty);
        }

        let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => (hex, 16),
            None => (s, 10),
        };

        let well_formed = !digits.is_empty()
            && digits.chars().all(|c| match radix {
                16 => c.is_ascii_hexdigit(),
                _ => c.is_ascii_digit(),
            });
        if !well_formed {
            return Err(FieldError::Malformed(input.to_string()));
        }

        let value = BigUint::from_str_radix(digits, radix)
            .map_err(|_| FieldError::Malformed(input.to_string()))?;
        Self::try_from_biguint(value)
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Integer addition that refuses to wrap around `P`.
    ///
    /// Balances and nonces are counters, not field values; a credit that would
    /// reduce modulo `P` must be rejected rather than silently wrapped.
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        let sum = &self.0 + &other.0;
        (sum < *MODULUS).then_some(Self(sum))
    }

    /// Integer subtraction, `None` if `other > self`.
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        (self.0 >= other.0).then(|| Self(&self.0 - &other.0))
    }

    /// Canonical 32-byte big-endian encoding
    pub fn to_bytes_be(&self) -> [u8; FIELD_BYTES] {
        let bytes = self.0.to_bytes_be();
        let mut out = [0u8; FIELD_BYTES];
        let start = FIELD_BYTES.saturating_sub(bytes.len());
        out[start..].copy_from_slice(&bytes);
        out
    }

    /// Decode a canonical 32-byte big-endian encoding.
    pub fn from_bytes_be(bytes: &[u8; FIELD_BYTES]) -> Result<Self, FieldError> {
        Self::try_from_biguint(BigUint::from_bytes_be(bytes))
    }

    /// `0x`-prefixed, zero-padded 64-digit hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes_be()))
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

impl<'b> Add<&'b FieldElement> for &FieldElement {
    type Output = FieldElement;

    fn add(self, rhs: &'b FieldElement) -> FieldElement {
        FieldElement::reduce(&self.0 + &rhs.0)
    }
}

impl<'b> Sub<&'b FieldElement> for &FieldElement {
    type Output = FieldElement;

    /// `(a + P - b) mod P`, so the result is never negative
    fn sub(self, rhs: &'b FieldElement) -> FieldElement {
        FieldElement::reduce(&self.0 + &*MODULUS - &rhs.0)
    }
}

impl<'b> Mul<&'b FieldElement> for &FieldElement {
    type Output = FieldElement;

    fn mul(self, rhs: &'b FieldElement) -> FieldElement {
        FieldElement::reduce(&self.0 * &rhs.0)
    }
}

macro_rules! forward_owned_op {
    ($trait:ident, $method:ident) => {
        impl $trait for FieldElement {
            type Output = FieldElement;

            fn $method(self, rhs: FieldElement) -> FieldElement {
                (&self).$method(&rhs)
            }
        }
    };
}

forward_owned_op!(Add, add);
forward_owned_op!(Sub, sub);
forward_owned_op!(Mul, mul);

// ============================================================================
// Conversions
// ============================================================================

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl FromStr for FieldElement {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<BigUint> for FieldElement {
    type Error = FieldError;

    fn try_from(value: BigUint) -> Result<Self, Self::Error> {
        Self::try_from_biguint(value)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.0)
    }
}

// ============================================================================
// Serde (decimal strings, matching the circuit input files)
// ============================================================================

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

struct FieldElementVisitor;

impl<'de> Visitor<'de> for FieldElementVisitor {
    type Value = FieldElement;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer below the BN254 scalar modulus")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(FieldElement::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map(FieldElement::from)
            .map_err(|_| E::custom(FieldError::Malformed(v.to_string())))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        FieldElement::parse(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FieldElementVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fe(v: u64) -> FieldElement {
        FieldElement::from(v)
    }

    fn p_minus(v: u64) -> FieldElement {
        FieldElement::reduce(FieldElement::modulus() - BigUint::from(v))
    }

    #[test]
    fn test_add_wraps_at_modulus() {
        assert_eq!(&p_minus(1) + &fe(1), FieldElement::zero());
        assert_eq!(&p_minus(1) + &fe(5), fe(4));
    }

    #[test]
    fn test_sub_never_negative() {
        // 3 - 5 = -2 = P - 2
        assert_eq!(&fe(3) - &fe(5), p_minus(2));
        assert_eq!(&fe(5) - &fe(3), fe(2));
    }

    #[test]
    fn test_mul_reduces() {
        // (P - 1)^2 = 1 mod P
        assert_eq!(&p_minus(1) * &p_minus(1), FieldElement::one());
        assert_eq!(fe(6) * fe(7), fe(42));
    }

    #[test]
    fn test_checked_add_refuses_wrap() {
        assert_eq!(fe(2).checked_add(&fe(3)), Some(fe(5)));
        assert_eq!(p_minus(1).checked_add(&fe(1)), None);
        assert_eq!(p_minus(2).checked_add(&fe(1)), Some(p_minus(1)));
    }

    #[test]
    fn test_checked_sub() {
        assert_eq!(fe(10).checked_sub(&fe(4)), Some(fe(6)));
        assert_eq!(fe(4).checked_sub(&fe(10)), None);
    }

    #[test]
    fn test_parse_decimal_and_hex() {
        assert_eq!(FieldElement::parse("1000").unwrap(), fe(1000));
        assert_eq!(FieldElement::parse("0x3e8").unwrap(), fe(1000));
        assert_eq!(FieldElement::parse(" 7 ").unwrap(), fe(7));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(FieldElement::parse(""), Err(FieldError::Empty));
        assert!(matches!(FieldElement::parse("-5"), Err(FieldError::Malformed(_))));
        assert!(matches!(FieldElement::parse("+5"), Err(FieldError::Malformed(_))));
        assert!(matches!(FieldElement::parse("12a"), Err(FieldError::Malformed(_))));
        assert!(matches!(FieldElement::parse("0x"), Err(FieldError::Malformed(_))));
        assert!(matches!(
            FieldElement::parse(MODULUS_DECIMAL),
            Err(FieldError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_bytes_roundtrip_and_range_check() {
        let v = p_minus(12345);
        assert_eq!(FieldElement::from_bytes_be(&v.to_bytes_be()).unwrap(), v);

        let too_big = [0xffu8; FIELD_BYTES];
        assert!(FieldElement::from_bytes_be(&too_big).is_err());
    }

    #[test]
    fn test_hex_is_padded() {
        let h = fe(255).to_hex();
        assert_eq!(h.len(), 66);
        assert!(h.ends_with("ff"));
    }

    #[test]
    fn test_serde_accepts_strings_and_numbers() {
        let from_str: FieldElement = serde_json::from_str("\"500\"").unwrap();
        let from_num: FieldElement = serde_json::from_str("500").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(serde_json::to_string(&from_num).unwrap(), "\"500\"");

        assert!(serde_json::from_str::<FieldElement>("-1").is_err());
        assert!(serde_json::from_str::<FieldElement>("\"abc\"").is_err());
    }
}
