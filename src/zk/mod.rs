// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Zero-Knowledge Credential Pipeline
//!
//! Commitments, Groth16 proofs over BN254 and the verifier wire format for
//! researcher credentials, reviewer qualification and anonymous reviews.
//!
//! ## Module Structure
//!
//! - `field`: scalar/decimal conversions
//! - `poseidon`: circom-compatible Poseidon (native and in-circuit)
//! - `commitment`: credential commitments with an insecure offline fallback
//! - `circuit`: circuit kinds, artifact locators and constraint systems
//! - `artifacts`: artifact sources and the per-circuit cache
//! - `setup`: key generation and artifact layout
//! - `prover`: proof generation with timeout, cancellation and dev placeholders
//! - `encoding`: verifier wire format
//! - `verifier`: local Groth16 verification
//! - `error`: error taxonomy
//!
//! ## Usage
//!
//! ```ignore
//! use suipeer_zk::zk::*;
//!
//! let commitment = CommitmentHasher::new().try_hash(&tuple)?;
//! let inputs = CircuitInputs::credential(tuple, commitment, true, EducationLevel::Master, 3, 2);
//! let bundle = generator.prove(inputs).await?;
//! let encoded = ProofEncoder::encode(&bundle)?;
//! ```

pub mod artifacts;
pub mod circuit;
pub mod commitment;
pub mod encoding;
pub mod error;
pub mod field;
pub mod poseidon;
pub mod prover;
pub mod setup;
pub mod verifier;

// Re-export commonly used types
pub use artifacts::{ArtifactCache, ArtifactSource, CircuitArtifacts, FileArtifactSource, HttpArtifactSource};
pub use circuit::{check_satisfied, ArtifactLocators, CircuitInputs, CircuitKind, MAX_REVIEW_SCORE};
pub use commitment::{
    hash_credential, CommitmentHasher, CommitmentSecurity, CredentialCommitment, CredentialTuple,
    EducationLevel,
};
pub use encoding::{decode_proof, decode_public_inputs, EncodedProof, ProofEncoder, PROOF_WIRE_FORMAT};
pub use error::{ZkError, ZkResult};
pub use prover::{prove_with_key, Groth16Proof, ProofGenerator, ProverConfig, ZkProofBundle};
pub use setup::{generate_keys, write_artifacts, CircuitKeys, CircuitManifest};
pub use verifier::{verify_bundle, ProofVerifier};

/// Module version
pub const MODULE_VERSION: &str = "0.1.0";
