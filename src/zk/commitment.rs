// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Credential Commitments
//!
//! Hashes a researcher's private credential tuple into a Poseidon
//! commitment that the credential circuits can recompute in-circuit.
//!
//! ## Degraded mode
//!
//! When the Poseidon parameters cannot be loaded the hasher falls back to a
//! weighted positional sum so that forms stay usable offline. Fallback
//! commitments carry [`CommitmentSecurity::InsecureFallback`] and are
//! refused by the prover and the submitter.

use super::error::{ZkError, ZkResult};
use super::field::{field_to_decimal, serde_decimal};
use super::poseidon::{poseidon_available, poseidon_hash};
use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fields hashed into a commitment
pub const CREDENTIAL_ARITY: usize = 4;

/// Highest completed degree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EducationLevel {
    Bachelor = 1,
    Master = 2,
    #[serde(rename = "phd")]
    PhD = 3,
}

impl EducationLevel {
    /// Numeric code used inside the circuits
    pub fn code(self) -> u64 {
        self as u64
    }
}

impl TryFrom<u64> for EducationLevel {
    type Error = ZkError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Bachelor),
            2 => Ok(Self::Master),
            3 => Ok(Self::PhD),
            other => Err(ZkError::invalid_credential(
                "education_level",
                format!("{} is not one of 1 (Bachelor), 2 (Master), 3 (PhD)", other),
            )),
        }
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bachelor => write!(f, "Bachelor"),
            Self::Master => write!(f, "Master"),
            Self::PhD => write!(f, "PhD"),
        }
    }
}

/// Private credential fields, hashed in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialTuple {
    pub institution_id: u64,
    pub researcher_id: u64,
    pub education_level: EducationLevel,
    pub years_experience: u64,
}

impl CredentialTuple {
    pub fn new(
        institution_id: u64,
        researcher_id: u64,
        education_level: EducationLevel,
        years_experience: u64,
    ) -> Self {
        Self {
            institution_id,
            researcher_id,
            education_level,
            years_experience,
        }
    }

    /// Ordered field elements `[institution, researcher, education, years]`
    pub fn to_field_elements(&self) -> [Fr; CREDENTIAL_ARITY] {
        [
            Fr::from(self.institution_id),
            Fr::from(self.researcher_id),
            Fr::from(self.education_level.code()),
            Fr::from(self.years_experience),
        ]
    }
}

/// How a commitment was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentSecurity {
    /// Poseidon hash, safe to prove and submit
    Poseidon,
    /// Weighted positional sum, no collision resistance
    InsecureFallback,
}

/// Hash output of a [`CredentialTuple`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialCommitment {
    #[serde(with = "serde_decimal")]
    value: Fr,
    security: CommitmentSecurity,
}

impl CredentialCommitment {
    /// Wrap a Poseidon output computed elsewhere (e.g. an on-chain record)
    pub fn from_poseidon(value: Fr) -> Self {
        Self {
            value,
            security: CommitmentSecurity::Poseidon,
        }
    }

    pub fn value(&self) -> Fr {
        self.value
    }

    pub fn security(&self) -> CommitmentSecurity {
        self.security
    }

    pub fn is_secure(&self) -> bool {
        self.security == CommitmentSecurity::Poseidon
    }

    /// Decimal representation as used in circuit inputs
    pub fn to_decimal(&self) -> String {
        field_to_decimal(&self.value)
    }

    /// Fail unless the commitment can be used with the verifier
    pub fn ensure_secure(&self) -> ZkResult<()> {
        if self.is_secure() {
            Ok(())
        } else {
            Err(ZkError::InsecureCommitment)
        }
    }
}

impl fmt::Display for CredentialCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

#[derive(Debug, Clone)]
enum HasherState {
    Ready,
    Unavailable(String),
}

/// Computes credential commitments
#[derive(Debug, Clone)]
pub struct CommitmentHasher {
    state: HasherState,
}

impl CommitmentHasher {
    /// Load the 4-input Poseidon parameters, degrading if they are missing
    pub fn new() -> Self {
        match poseidon_available(CREDENTIAL_ARITY) {
            Ok(()) => Self {
                state: HasherState::Ready,
            },
            Err(e) => {
                tracing::warn!("⚠️  Poseidon unavailable, commitments will be insecure: {}", e);
                Self {
                    state: HasherState::Unavailable(e.to_string()),
                }
            }
        }
    }

    /// Hasher that always uses the insecure fallback (offline mode and tests)
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            state: HasherState::Unavailable(reason.into()),
        }
    }

    /// Whether secure commitments can be produced
    pub fn is_available(&self) -> bool {
        matches!(self.state, HasherState::Ready)
    }

    /// Poseidon commitment, or `HashUnavailable`
    pub fn try_hash(&self, tuple: &CredentialTuple) -> ZkResult<CredentialCommitment> {
        match &self.state {
            HasherState::Ready => {
                let value = poseidon_hash(&tuple.to_field_elements())?;
                Ok(CredentialCommitment::from_poseidon(value))
            }
            HasherState::Unavailable(reason) => Err(ZkError::HashUnavailable {
                reason: reason.clone(),
            }),
        }
    }

    /// Commitment for display and offline use
    ///
    /// Never fails: a `HashUnavailable` error degrades to the weighted
    /// positional sum and is logged.
    pub fn hash(&self, tuple: &CredentialTuple) -> CredentialCommitment {
        match self.try_hash(tuple) {
            Ok(commitment) => commitment,
            Err(e) => {
                tracing::warn!(
                    "⚠️  Using INSECURE fallback commitment (test-only, never submit): {}",
                    e
                );
                fallback_commitment(tuple)
            }
        }
    }
}

impl Default for CommitmentHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Poseidon commitment of a credential tuple
pub fn hash_credential(tuple: &CredentialTuple) -> CredentialCommitment {
    CommitmentHasher::new().hash(tuple)
}

/// `institution * 10^10 + researcher * 10^6 + education * 10^3 + years`
fn fallback_commitment(tuple: &CredentialTuple) -> CredentialCommitment {
    let value = Fr::from(tuple.institution_id) * Fr::from(10_000_000_000u64)
        + Fr::from(tuple.researcher_id) * Fr::from(1_000_000u64)
        + Fr::from(tuple.education_level.code()) * Fr::from(1_000u64)
        + Fr::from(tuple.years_experience);
    CredentialCommitment {
        value,
        security: CommitmentSecurity::InsecureFallback,
    }
}
