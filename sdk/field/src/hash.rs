//! Algebraic Hash
//!
//! `H(a, b) = a*b + a + b + 1 (mod P)`
//!
//! A degree-2 polynomial chosen so a batch circuit can check it with a single
//! multiplication constraint. It is NOT collision resistant in general; it only
//! has to agree bit-for-bit with the circuit paired with the engine. Changing
//! the formula or the composition order is a breaking protocol change.

use crate::FieldElement;

/// Hash 2 field elements: `(a*b + a + b + 1) mod P`
pub fn hash_two(a: &FieldElement, b: &FieldElement) -> FieldElement {
    let product = a * b;
    let sum = &(&product + a) + b;
    &sum + &FieldElement::one()
}

/// Hash 3 field elements: `hash_two(hash_two(a, b), c)`
pub fn hash_three(a: &FieldElement, b: &FieldElement, c: &FieldElement) -> FieldElement {
    hash_two(&hash_two(a, b), c)
}
