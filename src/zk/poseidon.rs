// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Circom-compatible Poseidon over BN254
//!
//! The native hasher and the R1CS gadget share the `bn254_x5` parameter
//! set (x^5 S-box, width = inputs + 1, capacity element zero), so a value
//! hashed outside the circuit is reproduced bit-for-bit inside it.

use super::error::{ZkError, ZkResult};
use ark_bn254::Fr;
use ark_ff::Zero;
use ark_r1cs_std::fields::{fp::FpVar, FieldVar};
use ark_relations::r1cs::SynthesisError;
use light_poseidon::parameters::bn254_x5::get_poseidon_parameters;
use light_poseidon::{Poseidon, PoseidonHasher, PoseidonParameters};

/// Largest number of inputs supported by the circom parameter set
pub const MAX_POSEIDON_INPUTS: usize = 12;

/// Hash field elements with circom-compatible Poseidon
pub fn poseidon_hash(inputs: &[Fr]) -> ZkResult<Fr> {
    if inputs.is_empty() || inputs.len() > MAX_POSEIDON_INPUTS {
        return Err(ZkError::HashUnavailable {
            reason: format!("unsupported Poseidon arity {}", inputs.len()),
        });
    }
    let mut hasher = Poseidon::<Fr>::new_circom(inputs.len()).map_err(|e| {
        ZkError::HashUnavailable {
            reason: e.to_string(),
        }
    })?;
    hasher.hash(inputs).map_err(|e| ZkError::HashUnavailable {
        reason: e.to_string(),
    })
}

/// Check that the parameter set for `arity` inputs can be loaded
pub fn poseidon_available(arity: usize) -> ZkResult<()> {
    load_parameters(arity).map(|_| ())
}

fn load_parameters(arity: usize) -> ZkResult<PoseidonParameters<Fr>> {
    let width = u8::try_from(arity + 1).map_err(|_| ZkError::HashUnavailable {
        reason: format!("unsupported Poseidon arity {}", arity),
    })?;
    get_poseidon_parameters::<Fr>(width).map_err(|e| ZkError::HashUnavailable {
        reason: e.to_string(),
    })
}

/// In-circuit Poseidon matching [`poseidon_hash`]
///
/// Round layout: half the full rounds, then the partial rounds (S-box on
/// the first element only), then the remaining full rounds. Every round
/// adds round constants, applies the S-box and mixes with the MDS matrix.
pub fn poseidon_gadget(inputs: &[FpVar<Fr>]) -> Result<FpVar<Fr>, SynthesisError> {
    let params = load_parameters(inputs.len()).map_err(|_| SynthesisError::Unsatisfiable)?;
    if params.alpha != 5 {
        return Err(SynthesisError::Unsatisfiable);
    }

    let width = params.width;
    let mut state: Vec<FpVar<Fr>> = Vec::with_capacity(width);
    state.push(FpVar::Constant(Fr::zero()));
    state.extend(inputs.iter().cloned());

    let half_full = params.full_rounds / 2;
    let total_rounds = params.full_rounds + params.partial_rounds;

    for round in 0..total_rounds {
        for (i, element) in state.iter_mut().enumerate() {
            *element = &*element + params.ark[round * width + i];
        }

        let is_full_round = round < half_full || round >= half_full + params.partial_rounds;
        if is_full_round {
            for element in state.iter_mut() {
                *element = sbox(element)?;
            }
        } else {
            state[0] = sbox(&state[0])?;
        }

        state = (0..width)
            .map(|i| {
                state
                    .iter()
                    .enumerate()
                    .fold(FpVar::Constant(Fr::zero()), |acc, (j, element)| {
                        acc + element * params.mds[i][j]
                    })
            })
            .collect();
    }

    Ok(state[0].clone())
}

fn sbox(x: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
    let x2 = x.square()?;
    let x4 = x2.square()?;
    Ok(x4 * x)
}
