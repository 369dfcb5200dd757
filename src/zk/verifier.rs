// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Local Groth16 Verification
//!
//! Pre-flight check of a bundle against the circuit's verifying key before
//! it is submitted on-chain, where a rejection costs gas.

use super::circuit::CircuitKind;
use super::error::{ZkError, ZkResult};
use super::field::field_from_decimal;
use super::prover::{Groth16Proof, ZkProofBundle};
use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_groth16::{prepare_verifying_key, Groth16, PreparedVerifyingKey, Proof, VerifyingKey};
use ark_snark::SNARK;
use tracing::{debug, warn};

fn verification_failed(reason: impl Into<String>) -> ZkError {
    ZkError::VerificationFailed {
        reason: reason.into(),
    }
}

fn base_field(value: Option<&String>, name: &str) -> ZkResult<Fq> {
    value
        .and_then(|v| field_from_decimal::<Fq>(v))
        .ok_or_else(|| verification_failed(format!("bad coordinate {}", name)))
}

fn g1_point(coords: &[String], name: &str) -> ZkResult<G1Affine> {
    if coords.get(2).map(String::as_str).unwrap_or("1") != "1" {
        return Err(verification_failed(format!("{} is not in affine form", name)));
    }
    let point = G1Affine::new_unchecked(
        base_field(coords.first(), name)?,
        base_field(coords.get(1), name)?,
    );
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(verification_failed(format!("{} is not a valid G1 point", name)));
    }
    Ok(point)
}

fn g2_point(coords: &[Vec<String>]) -> ZkResult<G2Affine> {
    let limb = |i: usize| -> ZkResult<Fq2> {
        let pair = coords
            .get(i)
            .ok_or_else(|| verification_failed("pi_b is missing a coordinate"))?;
        Ok(Fq2::new(
            base_field(pair.first(), "pi_b")?,
            base_field(pair.get(1), "pi_b")?,
        ))
    };
    if let Some(z) = coords.get(2) {
        if z.as_slice() != ["1", "0"] {
            return Err(verification_failed("pi_b is not in affine form"));
        }
    }
    let point = G2Affine::new_unchecked(limb(0)?, limb(1)?);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(verification_failed("pi_b is not a valid G2 point"));
    }
    Ok(point)
}

/// Convert a snarkjs-layout proof into an arkworks proof
pub fn proof_to_ark(proof: &Groth16Proof) -> ZkResult<Proof<Bn254>> {
    Ok(Proof {
        a: g1_point(&proof.pi_a, "pi_a")?,
        b: g2_point(&proof.pi_b)?,
        c: g1_point(&proof.pi_c, "pi_c")?,
    })
}

pub fn public_inputs_to_ark(signals: &[String]) -> ZkResult<Vec<Fr>> {
    signals
        .iter()
        .map(|s| {
            field_from_decimal::<Fr>(s)
                .ok_or_else(|| verification_failed(format!("bad public signal {:?}", s)))
        })
        .collect()
}

/// Verifier bound to one circuit's verifying key
pub struct ProofVerifier {
    circuit: CircuitKind,
    prepared: PreparedVerifyingKey<Bn254>,
}

impl ProofVerifier {
    pub fn new(circuit: CircuitKind, verifying_key: &VerifyingKey<Bn254>) -> Self {
        Self {
            circuit,
            prepared: prepare_verifying_key(verifying_key),
        }
    }

    pub fn circuit(&self) -> CircuitKind {
        self.circuit
    }

    pub fn verify(&self, bundle: &ZkProofBundle) -> ZkResult<()> {
        if bundle.placeholder {
            warn!("⚠️  Refusing to verify a placeholder {} proof", bundle.circuit);
            return Err(verification_failed("placeholder proofs never verify"));
        }
        if bundle.circuit != self.circuit {
            return Err(verification_failed(format!(
                "bundle is for {}, verifier is for {}",
                bundle.circuit, self.circuit
            )));
        }
        if bundle.public_signals.len() != self.circuit.public_input_count() {
            return Err(verification_failed(format!(
                "expected {} public signals, found {}",
                self.circuit.public_input_count(),
                bundle.public_signals.len()
            )));
        }

        let proof = proof_to_ark(&bundle.proof)?;
        let inputs = public_inputs_to_ark(&bundle.public_signals)?;
        let valid = Groth16::<Bn254>::verify_with_processed_vk(&self.prepared, &inputs, &proof)
            .map_err(|e| verification_failed(e.to_string()))?;

        if valid {
            debug!("Verified {} proof locally", self.circuit);
            Ok(())
        } else {
            Err(verification_failed("pairing check failed"))
        }
    }
}

/// Verify a bundle against a verifying key
pub fn verify_bundle(verifying_key: &VerifyingKey<Bn254>, bundle: &ZkProofBundle) -> ZkResult<()> {
    ProofVerifier::new(bundle.circuit, verifying_key).verify(bundle)
}
