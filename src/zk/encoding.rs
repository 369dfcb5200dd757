// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Verifier Wire Format
//!
//! `groth16-json-decimal-v1`: both byte strings are UTF-8 JSON arrays of
//! canonical decimal strings with no whitespace.
//!
//! - proof bytes: the eight affine coordinates in [`PROOF_COMPONENT_ORDER`]
//! - public input bytes: the public signals in circuit order
//!
//! The projective third components of snarkjs proofs (`"1"`, `["1","0"]`)
//! are not transmitted. Reordering any component does not fail locally; the
//! verifier simply rejects the proof, so the order below is the contract.

use super::circuit::CircuitKind;
use super::error::{ZkError, ZkResult};
use super::field::field_from_decimal;
use super::prover::{Groth16Proof, ZkProofBundle};
use ark_bn254::{Fq, Fr};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const PROOF_WIRE_FORMAT: &str = "groth16-json-decimal-v1";

/// Number of coordinates in an encoded proof
pub const PROOF_COMPONENTS: usize = 8;

/// Position of every coordinate in the encoded proof
pub const PROOF_COMPONENT_ORDER: [&str; PROOF_COMPONENTS] = [
    "pi_a[0]",
    "pi_a[1]",
    "pi_b[0][0]",
    "pi_b[0][1]",
    "pi_b[1][0]",
    "pi_b[1][1]",
    "pi_c[0]",
    "pi_c[1]",
];

/// Proof and public inputs ready for the verifier call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedProof {
    pub circuit: CircuitKind,
    pub proof_bytes: Vec<u8>,
    pub public_input_bytes: Vec<u8>,
    /// Carried over from the bundle so submitters can refuse it
    pub placeholder: bool,
}

impl EncodedProof {
    pub fn proof_hex(&self) -> String {
        hex::encode(&self.proof_bytes)
    }

    pub fn public_inputs_hex(&self) -> String {
        hex::encode(&self.public_input_bytes)
    }
}

pub struct ProofEncoder;

impl ProofEncoder {
    /// Encode a bundle; fails only when the bundle is malformed
    pub fn encode(bundle: &ZkProofBundle) -> ZkResult<EncodedProof> {
        let components = flatten_proof(&bundle.proof)?;
        for (i, signal) in bundle.public_signals.iter().enumerate() {
            if field_from_decimal::<Fr>(signal).is_none() {
                return Err(ZkError::encoding_failed(format!(
                    "public signal {} is not a canonical scalar: {:?}",
                    i, signal
                )));
            }
        }
        if !bundle.placeholder && bundle.public_signals.len() != bundle.circuit.public_input_count()
        {
            return Err(ZkError::encoding_failed(format!(
                "{} expects {} public signals, bundle has {}",
                bundle.circuit,
                bundle.circuit.public_input_count(),
                bundle.public_signals.len()
            )));
        }

        let encoded = EncodedProof {
            circuit: bundle.circuit,
            proof_bytes: serde_json::to_vec(&components)?,
            public_input_bytes: serde_json::to_vec(&bundle.public_signals)?,
            placeholder: bundle.placeholder,
        };
        debug!(
            "Encoded {} proof: {} proof bytes, {} public input bytes",
            bundle.circuit,
            encoded.proof_bytes.len(),
            encoded.public_input_bytes.len()
        );
        Ok(encoded)
    }
}

fn coordinate<'a>(values: &'a [String], index: usize, name: &str) -> ZkResult<&'a String> {
    let value = values
        .get(index)
        .ok_or_else(|| ZkError::encoding_failed(format!("missing coordinate {}", name)))?;
    if field_from_decimal::<Fq>(value).is_none() {
        return Err(ZkError::encoding_failed(format!(
            "coordinate {} is not a canonical base field element: {:?}",
            name, value
        )));
    }
    Ok(value)
}

fn pair<'a>(values: &'a [Vec<String>], index: usize, name: &str) -> ZkResult<&'a [String]> {
    values
        .get(index)
        .map(Vec::as_slice)
        .ok_or_else(|| ZkError::encoding_failed(format!("missing coordinate pair {}", name)))
}

/// Proof coordinates in wire order
pub fn flatten_proof(proof: &Groth16Proof) -> ZkResult<[String; PROOF_COMPONENTS]> {
    let b0 = pair(&proof.pi_b, 0, "pi_b[0]")?;
    let b1 = pair(&proof.pi_b, 1, "pi_b[1]")?;
    let ordered = [
        coordinate(&proof.pi_a, 0, PROOF_COMPONENT_ORDER[0])?,
        coordinate(&proof.pi_a, 1, PROOF_COMPONENT_ORDER[1])?,
        coordinate(b0, 0, PROOF_COMPONENT_ORDER[2])?,
        coordinate(b0, 1, PROOF_COMPONENT_ORDER[3])?,
        coordinate(b1, 0, PROOF_COMPONENT_ORDER[4])?,
        coordinate(b1, 1, PROOF_COMPONENT_ORDER[5])?,
        coordinate(&proof.pi_c, 0, PROOF_COMPONENT_ORDER[6])?,
        coordinate(&proof.pi_c, 1, PROOF_COMPONENT_ORDER[7])?,
    ];
    Ok(ordered.map(String::clone))
}

/// Rebuild a snarkjs-layout proof from encoded proof bytes
pub fn decode_proof(bytes: &[u8]) -> ZkResult<Groth16Proof> {
    let components: Vec<String> = serde_json::from_slice(bytes)
        .map_err(|e| ZkError::encoding_failed(format!("proof bytes are not a string array: {}", e)))?;
    if components.len() != PROOF_COMPONENTS {
        return Err(ZkError::encoding_failed(format!(
            "expected {} proof components, found {}",
            PROOF_COMPONENTS,
            components.len()
        )));
    }
    for (value, name) in components.iter().zip(PROOF_COMPONENT_ORDER) {
        if field_from_decimal::<Fq>(value).is_none() {
            return Err(ZkError::encoding_failed(format!(
                "coordinate {} is not canonical: {:?}",
                name, value
            )));
        }
    }

    let c = |i: usize| components[i].clone();
    Ok(Groth16Proof {
        pi_a: vec![c(0), c(1), "1".to_string()],
        pi_b: vec![
            vec![c(2), c(3)],
            vec![c(4), c(5)],
            vec!["1".to_string(), "0".to_string()],
        ],
        pi_c: vec![c(6), c(7), "1".to_string()],
        protocol: "groth16".to_string(),
        curve: "bn128".to_string(),
    })
}

pub fn decode_public_inputs(bytes: &[u8]) -> ZkResult<Vec<String>> {
    let signals: Vec<String> = serde_json::from_slice(bytes).map_err(|e| {
        ZkError::encoding_failed(format!("public input bytes are not a string array: {}", e))
    })?;
    if let Some(bad) = signals.iter().find(|s| field_from_decimal::<Fr>(s).is_none()) {
        return Err(ZkError::encoding_failed(format!(
            "public input is not canonical: {:?}",
            bad
        )));
    }
    Ok(signals)
}
