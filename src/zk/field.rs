// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! BN254 field element helpers
//!
//! The verifier contract and snarkjs-style bundles carry every field element
//! as a canonical decimal string: ASCII digits only, no sign, no leading
//! zeros (except `"0"` itself), strictly below the field modulus.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serializer};

/// Render a prime field element as its canonical decimal string
pub fn field_to_decimal<F: PrimeField>(value: &F) -> String {
    BigUint::from_bytes_le(&value.into_bigint().to_bytes_le()).to_str_radix(10)
}

/// Parse a canonical decimal string into a prime field element
///
/// Returns `None` for non-canonical text or values at or above the modulus.
pub fn field_from_decimal<F: PrimeField>(text: &str) -> Option<F> {
    if !is_canonical_decimal(text) {
        return None;
    }
    let value = BigUint::parse_bytes(text.as_bytes(), 10)?;
    if value >= field_modulus::<F>() {
        return None;
    }
    Some(F::from_le_bytes_mod_order(&value.to_bytes_le()))
}

/// Modulus of a prime field as an arbitrary-precision integer
pub fn field_modulus<F: PrimeField>() -> BigUint {
    BigUint::from_bytes_le(&F::MODULUS.to_bytes_le())
}

/// Check the canonical decimal rule used on the wire
pub fn is_canonical_decimal(text: &str) -> bool {
    !text.is_empty()
        && text.bytes().all(|b| b.is_ascii_digit())
        && (text == "0" || !text.starts_with('0'))
}

/// Big-endian 32-byte representation of a scalar
pub fn fr_to_be_bytes(value: &Fr) -> [u8; 32] {
    let bytes = value.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Map arbitrary bytes into the scalar field
///
/// blake3 digest truncated to 248 bits, so the result never wraps.
pub fn bytes_to_field(bytes: &[u8]) -> Fr {
    let digest = blake3::hash(bytes);
    Fr::from_be_bytes_mod_order(&digest.as_bytes()[..31])
}

/// Serde adapter storing an `Fr` as a canonical decimal string
pub mod serde_decimal {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Fr, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&field_to_decimal(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fr, D::Error> {
        let text = String::deserialize(deserializer)?;
        field_from_decimal(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid field element: {}", text)))
    }
}
