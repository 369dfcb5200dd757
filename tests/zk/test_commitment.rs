// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Commitment Hasher Tests
//!
//! - Determinism for identical tuples
//! - Distinct commitments for distinct tuples (random spot checks)
//! - Insecure fallback is flagged and refused by the prover

use rand::Rng;
use std::collections::HashSet;
use suipeer_zk::zk::{
    CircuitInputs, CommitmentHasher, CommitmentSecurity, CredentialTuple, EducationLevel, ZkError,
};

#[test]
fn test_same_tuple_hashes_identically() {
    let hasher = CommitmentHasher::new();
    let tuple = CredentialTuple::new(7, 42, EducationLevel::PhD, 5);

    let first = hasher.try_hash(&tuple).unwrap();
    let second = hasher.try_hash(&tuple).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.to_decimal(), second.to_decimal());
    assert_eq!(first.security(), CommitmentSecurity::Poseidon);
}

#[test]
fn test_distinct_tuples_hash_differently() {
    let hasher = CommitmentHasher::new();
    let mut rng = rand::thread_rng();
    let mut seen = HashSet::new();
    let mut tuples = HashSet::new();

    for _ in 0..200 {
        let tuple = CredentialTuple::new(
            rng.gen_range(0..1_000),
            rng.gen_range(0..1_000_000),
            EducationLevel::try_from(rng.gen_range(1..=3u64)).unwrap(),
            rng.gen_range(0..60),
        );
        if tuples.insert(tuple) {
            assert!(seen.insert(hasher.try_hash(&tuple).unwrap().to_decimal()));
        }
    }
}

#[test]
fn test_single_field_change_changes_commitment() {
    let hasher = CommitmentHasher::new();
    let base = CredentialTuple::new(7, 42, EducationLevel::PhD, 5);
    let variants = [
        CredentialTuple::new(8, 42, EducationLevel::PhD, 5),
        CredentialTuple::new(7, 43, EducationLevel::PhD, 5),
        CredentialTuple::new(7, 42, EducationLevel::Master, 5),
        CredentialTuple::new(7, 42, EducationLevel::PhD, 6),
    ];
    let base_commitment = hasher.try_hash(&base).unwrap();
    for variant in variants {
        assert_ne!(hasher.try_hash(&variant).unwrap(), base_commitment);
    }
}

#[test]
fn test_degraded_hasher_falls_back_insecurely() {
    let hasher = CommitmentHasher::degraded("parameters failed to load");
    let tuple = CredentialTuple::new(7, 42, EducationLevel::PhD, 5);

    assert!(matches!(
        hasher.try_hash(&tuple),
        Err(ZkError::HashUnavailable { .. })
    ));

    let commitment = hasher.hash(&tuple);
    assert!(!commitment.is_secure());
    assert_eq!(commitment, hasher.hash(&tuple));

    let inputs =
        CircuitInputs::credential(tuple, commitment, true, EducationLevel::Master, 3, 2);
    assert!(matches!(inputs.validate(), Err(ZkError::InsecureCommitment)));
}

#[test]
fn test_education_level_domain() {
    assert!(EducationLevel::try_from(0).is_err());
    assert!(EducationLevel::try_from(4).is_err());
    assert_eq!(EducationLevel::try_from(2).unwrap(), EducationLevel::Master);
}
