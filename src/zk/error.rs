// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ZK Pipeline Error Types
//!
//! Errors raised while hashing credentials, fetching circuit artifacts,
//! generating Groth16 proofs and encoding them for the on-chain verifier.
//!
//! ## Classification
//!
//! - **Retryable**: `CircuitAssetUnavailable`, `ProofGenerationFailed`,
//!   `ProofTimeout` (surface to the user as "try again")
//! - **Bug**: `EncodingFailed` (a well-formed bundle never fails to encode)
//! - **Non-fatal**: `HashUnavailable` (triggers the insecure fallback, never
//!   accepted for submission)

use crate::zk::circuit::CircuitKind;
use thiserror::Error;

/// Errors that can occur in the commitment/proof/encoding pipeline
#[derive(Debug, Error)]
pub enum ZkError {
    /// Poseidon primitive could not be initialised
    #[error("Poseidon hash unavailable: {reason}")]
    HashUnavailable { reason: String },

    /// A credential field does not fit the scalar field or its domain
    #[error("Invalid credential field {field}: {reason}")]
    InvalidCredential { field: String, reason: String },

    /// Commitment came from the non-cryptographic fallback
    #[error("Commitment was produced by the insecure fallback and cannot be proven or submitted")]
    InsecureCommitment,

    /// Circuit program descriptor or proving key could not be fetched
    #[error("Circuit asset unavailable for {circuit} ({artifact}): {reason}")]
    CircuitAssetUnavailable {
        circuit: CircuitKind,
        artifact: String,
        reason: String,
    },

    /// Fetched artifact does not match the requested circuit
    #[error("Circuit artifact for {circuit} is invalid: {reason}")]
    InvalidArtifact { circuit: CircuitKind, reason: String },

    /// Proving routine failed (including unsatisfied constraints)
    #[error("Proof generation failed for {circuit}: {reason}")]
    ProofGenerationFailed { circuit: CircuitKind, reason: String },

    /// Proving exceeded the caller's wall-clock ceiling
    #[error("Proof generation for {circuit} timed out after {seconds}s")]
    ProofTimeout { circuit: CircuitKind, seconds: u64 },

    /// Proving was cancelled before it produced a bundle
    #[error("Proof generation for {circuit} was cancelled")]
    ProofCancelled { circuit: CircuitKind },

    /// Bundle shape does not match the verifier wire format
    #[error("Proof encoding failed: {reason}")]
    EncodingFailed { reason: String },

    /// Local Groth16 verification rejected the bundle
    #[error("Proof verification failed: {reason}")]
    VerificationFailed { reason: String },

    /// Prover settings are out of range
    #[error("Invalid prover configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Key generation failed
    #[error("Circuit setup failed for {circuit}: {reason}")]
    SetupFailed { circuit: CircuitKind, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for ZK pipeline operations
pub type ZkResult<T> = Result<T, ZkError>;

impl ZkError {
    /// Create a ProofGenerationFailed error
    pub fn proof_generation_failed(circuit: CircuitKind, reason: impl Into<String>) -> Self {
        Self::ProofGenerationFailed {
            circuit,
            reason: reason.into(),
        }
    }

    /// Create an EncodingFailed error
    pub fn encoding_failed(reason: impl Into<String>) -> Self {
        Self::EncodingFailed {
            reason: reason.into(),
        }
    }

    /// Create a CircuitAssetUnavailable error
    pub fn asset_unavailable(
        circuit: CircuitKind,
        artifact: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::CircuitAssetUnavailable {
            circuit,
            artifact: artifact.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidCredential error
    pub fn invalid_credential(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCredential {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the caller may retry the same operation
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CircuitAssetUnavailable { .. }
                | Self::ProofGenerationFailed { .. }
                | Self::ProofTimeout { .. }
                | Self::ProofCancelled { .. }
                | Self::Io(_)
        )
    }

    /// Whether this error indicates an internal contract violation
    pub fn is_bug(&self) -> bool {
        matches!(self, Self::EncodingFailed { .. })
    }

    /// Message suitable for showing to an end user
    pub fn user_message(&self) -> String {
        match self {
            Self::CircuitAssetUnavailable { .. }
            | Self::ProofGenerationFailed { .. }
            | Self::ProofTimeout { .. } => {
                "Could not generate the zero-knowledge proof. Please try again.".to_string()
            }
            Self::ProofCancelled { .. } => "Proof generation was cancelled.".to_string(),
            Self::InsecureCommitment | Self::HashUnavailable { .. } => {
                "Secure credential hashing is unavailable; verification cannot continue."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }
}
