// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Review Platform Circuits
//!
//! Three Groth16 circuits over BN254:
//!
//! | Circuit | Proves | Public signals |
//! |---|---|---|
//! | `Credential` | Poseidon(credential) == commitment, verified institution, education/experience thresholds | commitment, institution_verified, min_education_level, min_experience, domain_id |
//! | `ReviewerQualification` | commitment opening, at least a Master's degree, enough past reviews | commitment, domain_id, min_reviews |
//! | `AnonymousReview` | review targets the public paper, boolean verdict, score in 0..=10, non-zero reviewer | paper_id, domain_id |
//!
//! Public signals are allocated in table order; that order is what the
//! verifier receives.

use super::commitment::{CredentialCommitment, CredentialTuple, EducationLevel};
use super::error::{ZkError, ZkResult};
use super::field::serde_decimal;
use super::poseidon::poseidon_gadget;
use ark_bn254::Fr;
use ark_ff::One;
use ark_r1cs_std::alloc::AllocVar;
use ark_r1cs_std::eq::EqGadget;
use ark_r1cs_std::fields::{fp::FpVar, FieldVar};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Highest review score accepted by the anonymous review circuit
pub const MAX_REVIEW_SCORE: u64 = 10;

/// Circuits known to the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitKind {
    Credential,
    ReviewerQualification,
    AnonymousReview,
}

/// Static locations of a circuit's two artifacts, relative to the artifact root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactLocators {
    /// Program descriptor (circuit manifest)
    pub program: &'static str,
    /// Proving key
    pub proving_key: &'static str,
    /// Verifying key (published next to the proving key)
    pub verifying_key: &'static str,
}

const ARTIFACT_TABLE: [(CircuitKind, ArtifactLocators); 3] = [
    (
        CircuitKind::Credential,
        ArtifactLocators {
            program: "zk/researcher_credentials.wasm",
            proving_key: "zk/researcher_credentials.zkey",
            verifying_key: "zk/researcher_credentials.vkey",
        },
    ),
    (
        CircuitKind::ReviewerQualification,
        ArtifactLocators {
            program: "zk/reviewer_qual.wasm",
            proving_key: "zk/reviewer_qual.zkey",
            verifying_key: "zk/reviewer_qual.vkey",
        },
    ),
    (
        CircuitKind::AnonymousReview,
        ArtifactLocators {
            program: "zk/anonymous_review.wasm",
            proving_key: "zk/anonymous_review.zkey",
            verifying_key: "zk/anonymous_review.vkey",
        },
    ),
];

impl CircuitKind {
    pub const ALL: [CircuitKind; 3] = [
        CircuitKind::Credential,
        CircuitKind::ReviewerQualification,
        CircuitKind::AnonymousReview,
    ];

    /// Artifact locators from the static lookup table
    pub fn locators(self) -> ArtifactLocators {
        ARTIFACT_TABLE
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, locators)| *locators)
            .unwrap_or(ARTIFACT_TABLE[0].1)
    }

    /// Number of public signals the circuit exposes
    pub fn public_input_count(self) -> usize {
        match self {
            Self::Credential => 5,
            Self::ReviewerQualification => 3,
            Self::AnonymousReview => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credential => "credential",
            Self::ReviewerQualification => "reviewer_qualification",
            Self::AnonymousReview => "anonymous_review",
        }
    }
}

impl fmt::Display for CircuitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CircuitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credential" | "researcher_credentials" => Ok(Self::Credential),
            "reviewer_qualification" | "reviewer_qual" => Ok(Self::ReviewerQualification),
            "anonymous_review" => Ok(Self::AnonymousReview),
            other => Err(format!("unknown circuit: {}", other)),
        }
    }
}

/// Private inputs of the credential circuit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialPrivateInputs {
    #[serde(with = "serde_decimal")]
    pub credential_hash: Fr,
    pub credential: CredentialTuple,
}

/// Public inputs of the credential circuit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialPublicInputs {
    pub commitment: CredentialCommitment,
    pub institution_verified: bool,
    pub min_education_level: EducationLevel,
    pub min_experience: u64,
    pub domain_id: u64,
}

/// Private inputs of the reviewer qualification circuit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerPrivateInputs {
    pub credential: CredentialTuple,
    pub review_count: u64,
}

/// Public inputs of the reviewer qualification circuit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerPublicInputs {
    pub commitment: CredentialCommitment,
    pub domain_id: u64,
    pub min_reviews: u64,
}

/// Private inputs of the anonymous review circuit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymousReviewPrivateInputs {
    pub reviewer_id: u64,
    pub paper_id: u64,
    pub review_score: u64,
    pub approved: bool,
}

/// Public inputs of the anonymous review circuit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymousReviewPublicInputs {
    pub paper_id: u64,
    pub domain_id: u64,
}

/// Inputs for one proving run, tagged by circuit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "circuit", rename_all = "snake_case")]
pub enum CircuitInputs {
    Credential {
        private: CredentialPrivateInputs,
        public: CredentialPublicInputs,
    },
    ReviewerQualification {
        private: ReviewerPrivateInputs,
        public: ReviewerPublicInputs,
    },
    AnonymousReview {
        private: AnonymousReviewPrivateInputs,
        public: AnonymousReviewPublicInputs,
    },
}

impl CircuitInputs {
    /// Credential inputs with `credential_hash` and `commitment` both set to `commitment`
    pub fn credential(
        credential: CredentialTuple,
        commitment: CredentialCommitment,
        institution_verified: bool,
        min_education_level: EducationLevel,
        min_experience: u64,
        domain_id: u64,
    ) -> Self {
        Self::Credential {
            private: CredentialPrivateInputs {
                credential_hash: commitment.value(),
                credential,
            },
            public: CredentialPublicInputs {
                commitment,
                institution_verified,
                min_education_level,
                min_experience,
                domain_id,
            },
        }
    }

    pub fn reviewer_qualification(
        credential: CredentialTuple,
        commitment: CredentialCommitment,
        review_count: u64,
        domain_id: u64,
        min_reviews: u64,
    ) -> Self {
        Self::ReviewerQualification {
            private: ReviewerPrivateInputs {
                credential,
                review_count,
            },
            public: ReviewerPublicInputs {
                commitment,
                domain_id,
                min_reviews,
            },
        }
    }

    pub fn anonymous_review(
        reviewer_id: u64,
        paper_id: u64,
        review_score: u64,
        approved: bool,
        public_paper_id: u64,
        public_domain_id: u64,
    ) -> Self {
        Self::AnonymousReview {
            private: AnonymousReviewPrivateInputs {
                reviewer_id,
                paper_id,
                review_score,
                approved,
            },
            public: AnonymousReviewPublicInputs {
                paper_id: public_paper_id,
                domain_id: public_domain_id,
            },
        }
    }

    /// A satisfying instance, used for key generation and benchmarks
    pub fn sample(kind: CircuitKind) -> Self {
        let credential = CredentialTuple::new(7, 42, EducationLevel::PhD, 5);
        let commitment = super::commitment::hash_credential(&credential);
        match kind {
            CircuitKind::Credential => {
                Self::credential(credential, commitment, true, EducationLevel::Master, 3, 2)
            }
            CircuitKind::ReviewerQualification => {
                Self::reviewer_qualification(credential, commitment, 12, 2, 5)
            }
            CircuitKind::AnonymousReview => Self::anonymous_review(314_159, 17, 8, true, 17, 2),
        }
    }

    pub fn kind(&self) -> CircuitKind {
        match self {
            Self::Credential { .. } => CircuitKind::Credential,
            Self::ReviewerQualification { .. } => CircuitKind::ReviewerQualification,
            Self::AnonymousReview { .. } => CircuitKind::AnonymousReview,
        }
    }

    /// Public signals in allocation order
    pub fn public_signals(&self) -> Vec<Fr> {
        match self {
            Self::Credential { public, .. } => vec![
                public.commitment.value(),
                Fr::from(public.institution_verified as u64),
                Fr::from(public.min_education_level.code()),
                Fr::from(public.min_experience),
                Fr::from(public.domain_id),
            ],
            Self::ReviewerQualification { public, .. } => vec![
                public.commitment.value(),
                Fr::from(public.domain_id),
                Fr::from(public.min_reviews),
            ],
            Self::AnonymousReview { public, .. } => {
                vec![Fr::from(public.paper_id), Fr::from(public.domain_id)]
            }
        }
    }

    /// Reject inputs that must never reach the prover
    pub fn validate(&self) -> ZkResult<()> {
        match self {
            Self::Credential { public, .. } => public.commitment.ensure_secure(),
            Self::ReviewerQualification { public, .. } => public.commitment.ensure_secure(),
            Self::AnonymousReview { .. } => Ok(()),
        }
    }
}

fn witness_u64(cs: &ConstraintSystemRef<Fr>, value: u64) -> Result<FpVar<Fr>, SynthesisError> {
    FpVar::new_witness(cs.clone(), || Ok(Fr::from(value)))
}

fn input_u64(cs: &ConstraintSystemRef<Fr>, value: u64) -> Result<FpVar<Fr>, SynthesisError> {
    FpVar::new_input(cs.clone(), || Ok(Fr::from(value)))
}

fn constant(value: u64) -> FpVar<Fr> {
    FpVar::Constant(Fr::from(value))
}

/// Allocate the credential tuple and return it with its in-circuit Poseidon hash
fn credential_opening(
    cs: &ConstraintSystemRef<Fr>,
    credential: &CredentialTuple,
) -> Result<(Vec<FpVar<Fr>>, FpVar<Fr>), SynthesisError> {
    let fields = credential
        .to_field_elements()
        .iter()
        .map(|v| FpVar::new_witness(cs.clone(), || Ok(*v)))
        .collect::<Result<Vec<_>, _>>()?;
    let hash = poseidon_gadget(&fields)?;
    Ok((fields, hash))
}

impl ConstraintSynthesizer<Fr> for CircuitInputs {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        match self {
            Self::Credential { private, public } => {
                let (fields, computed) = credential_opening(&cs, &private.credential)?;
                let credential_hash =
                    FpVar::new_witness(cs.clone(), || Ok(private.credential_hash))?;

                let commitment = FpVar::new_input(cs.clone(), || Ok(public.commitment.value()))?;
                let institution_verified = input_u64(&cs, public.institution_verified as u64)?;
                let min_education = input_u64(&cs, public.min_education_level.code())?;
                let min_experience = input_u64(&cs, public.min_experience)?;
                let _domain = input_u64(&cs, public.domain_id)?;

                computed.enforce_equal(&credential_hash)?;
                credential_hash.enforce_equal(&commitment)?;
                institution_verified.enforce_equal(&FpVar::one())?;

                let education = &fields[2];
                let years = &fields[3];
                education.enforce_cmp(&constant(EducationLevel::Bachelor.code()), Ordering::Greater, true)?;
                education.enforce_cmp(&constant(EducationLevel::PhD.code()), Ordering::Less, true)?;
                education.enforce_cmp(&min_education, Ordering::Greater, true)?;
                years.enforce_cmp(&min_experience, Ordering::Greater, true)?;
            }
            Self::ReviewerQualification { private, public } => {
                let (fields, computed) = credential_opening(&cs, &private.credential)?;
                let review_count = witness_u64(&cs, private.review_count)?;

                let commitment = FpVar::new_input(cs.clone(), || Ok(public.commitment.value()))?;
                let _domain = input_u64(&cs, public.domain_id)?;
                let min_reviews = input_u64(&cs, public.min_reviews)?;

                computed.enforce_equal(&commitment)?;
                let education = &fields[2];
                education.enforce_cmp(&constant(EducationLevel::Master.code()), Ordering::Greater, true)?;
                education.enforce_cmp(&constant(EducationLevel::PhD.code()), Ordering::Less, true)?;
                review_count.enforce_cmp(&min_reviews, Ordering::Greater, true)?;
            }
            Self::AnonymousReview { private, public } => {
                let reviewer = witness_u64(&cs, private.reviewer_id)?;
                let paper = witness_u64(&cs, private.paper_id)?;
                let score = witness_u64(&cs, private.review_score)?;
                let approved = witness_u64(&cs, private.approved as u64)?;

                let public_paper = input_u64(&cs, public.paper_id)?;
                let _domain = input_u64(&cs, public.domain_id)?;

                paper.enforce_equal(&public_paper)?;
                (&approved * (&approved - Fr::one())).enforce_equal(&FpVar::zero())?;
                score.enforce_cmp(&constant(MAX_REVIEW_SCORE), Ordering::Less, true)?;
                reviewer.enforce_not_equal(&FpVar::zero())?;
            }
        }
        Ok(())
    }
}

/// Check that inputs satisfy their circuit without producing a proof
pub fn check_satisfied(inputs: &CircuitInputs) -> ZkResult<()> {
    use ark_relations::r1cs::ConstraintSystem;

    let kind = inputs.kind();
    let cs = ConstraintSystem::<Fr>::new_ref();
    inputs
        .clone()
        .generate_constraints(cs.clone())
        .map_err(|e| ZkError::proof_generation_failed(kind, e.to_string()))?;
    let satisfied = cs
        .is_satisfied()
        .map_err(|e| ZkError::proof_generation_failed(kind, e.to_string()))?;
    if satisfied {
        Ok(())
    } else {
        let location = cs.which_is_unsatisfied().ok().flatten().unwrap_or_default();
        Err(ZkError::proof_generation_failed(
            kind,
            format!("inputs do not satisfy circuit constraints {}", location),
        ))
    }
}
