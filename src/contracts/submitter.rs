// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Verification Submission
//!
//! Assembles `platform_zk` calls from encoded proofs and hands them to a
//! [`LedgerClient`]. Receipts and ledger failures are returned untouched.
//! Researcher and paper ids travel as Move `String`s. Read-only queries go
//! through `dev_inspect` and decode the first BCS return value.

use super::types::{LedgerError, MoveArg, TransactionReceipt, VerifierCall};
use crate::config::{BuildMode, LedgerConfig};
use crate::zk::{CircuitKind, EncodedProof};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const VERIFY_RESEARCHER_FN: &str = "verify_researcher_with_zk";
pub const SUBMIT_REVIEW_FN: &str = "submit_anonymous_review";
pub const VERIFICATION_STATUS_FN: &str = "get_researcher_verification_status";
pub const RESEARCHER_DOMAINS_FN: &str = "get_researcher_domains";
pub const PAPER_STATUS_FN: &str = "get_paper_status";
pub const PAPER_CITATIONS_FN: &str = "get_paper_citations";

/// Executes calls against the ledger
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Sign and execute a transaction
    async fn execute(&self, call: VerifierCall) -> Result<TransactionReceipt, LedgerError>;

    /// Run a call read-only and return its BCS-encoded return values
    async fn dev_inspect(&self, call: VerifierCall) -> Result<Vec<Vec<u8>>, LedgerError>;
}

/// Verifier entry point a proof is submitted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifierTarget {
    ResearcherCredential {
        researcher: String,
    },
    AnonymousReview {
        paper_id: String,
        review_content_hash: Vec<u8>,
        score: u64,
        approved: bool,
    },
}

impl VerifierTarget {
    pub fn expected_circuit(&self) -> CircuitKind {
        match self {
            VerifierTarget::ResearcherCredential { .. } => CircuitKind::Credential,
            VerifierTarget::AnonymousReview { .. } => CircuitKind::AnonymousReview,
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Placeholder proofs cannot be submitted in production")]
    PlaceholderRejected,

    #[error("Proof for {actual} cannot be submitted to the {expected} verifier")]
    CircuitMismatch {
        expected: CircuitKind,
        actual: CircuitKind,
    },

    #[error("Invalid verifier configuration: {0}")]
    Configuration(String),

    /// Ledger failure, passed through verbatim
    #[error(transparent)]
    SubmissionFailure(#[from] LedgerError),
}

pub struct VerificationSubmitter {
    ledger: Arc<dyn LedgerClient>,
    config: LedgerConfig,
    build_mode: BuildMode,
}

impl VerificationSubmitter {
    pub fn new(ledger: Arc<dyn LedgerClient>, config: LedgerConfig, build_mode: BuildMode) -> Self {
        Self {
            ledger,
            config,
            build_mode,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Build the call for `encoded` without executing it
    pub fn build_call(
        &self,
        encoded: &EncodedProof,
        target: &VerifierTarget,
    ) -> Result<VerifierCall, SubmissionError> {
        if encoded.placeholder {
            if self.build_mode.is_production() {
                return Err(SubmissionError::PlaceholderRejected);
            }
            warn!("⚠️  Submitting a placeholder {} proof (development build)", encoded.circuit);
        }
        let expected = target.expected_circuit();
        if encoded.circuit != expected {
            return Err(SubmissionError::CircuitMismatch {
                expected,
                actual: encoded.circuit,
            });
        }
        self.config
            .validate()
            .map_err(SubmissionError::Configuration)?;

        let proof = MoveArg::Bytes(encoded.proof_bytes.clone());
        let public_inputs = MoveArg::Bytes(encoded.public_input_bytes.clone());
        let verifier = MoveArg::Object(self.config.verifier_object_id.clone());

        let (function, arguments) = match target {
            VerifierTarget::ResearcherCredential { researcher } => (
                VERIFY_RESEARCHER_FN,
                vec![
                    MoveArg::String(researcher.clone()),
                    proof,
                    public_inputs,
                    verifier,
                ],
            ),
            VerifierTarget::AnonymousReview {
                paper_id,
                review_content_hash,
                score,
                approved,
            } => (
                SUBMIT_REVIEW_FN,
                vec![
                    MoveArg::String(paper_id.clone()),
                    MoveArg::Bytes(review_content_hash.clone()),
                    MoveArg::U64(*score),
                    MoveArg::Bool(*approved),
                    proof,
                    public_inputs,
                    verifier,
                ],
            ),
        };

        Ok(VerifierCall {
            target: self.config.target(function),
            arguments,
            gas_budget: self.config.gas_budget,
        })
    }

    pub async fn submit(
        &self,
        encoded: &EncodedProof,
        target: &VerifierTarget,
    ) -> Result<TransactionReceipt, SubmissionError> {
        let call = self.build_call(encoded, target)?;
        let function = call.function().to_string();
        let receipt = self.ledger.execute(call).await?;
        info!(
            "📤 {} submitted: {} (success: {})",
            function, receipt.digest, receipt.success
        );
        Ok(receipt)
    }

    pub async fn submit_credential_verification(
        &self,
        researcher: &str,
        encoded: &EncodedProof,
    ) -> Result<TransactionReceipt, SubmissionError> {
        let target = VerifierTarget::ResearcherCredential {
            researcher: researcher.to_string(),
        };
        self.submit(encoded, &target).await
    }

    pub async fn submit_anonymous_review(
        &self,
        paper_id: &str,
        review_content_hash: &[u8],
        score: u64,
        approved: bool,
        encoded: &EncodedProof,
    ) -> Result<TransactionReceipt, SubmissionError> {
        let target = VerifierTarget::AnonymousReview {
            paper_id: paper_id.to_string(),
            review_content_hash: review_content_hash.to_vec(),
            score,
            approved,
        };
        self.submit(encoded, &target).await
    }

    /// Run `function(id)` read-only and return its first return value
    async fn inspect(&self, function: &str, id: &str) -> Result<Vec<u8>, SubmissionError> {
        let call = VerifierCall {
            target: self.config.target(function),
            arguments: vec![MoveArg::String(id.to_string())],
            gas_budget: self.config.gas_budget,
        };
        let mut values = self.ledger.dev_inspect(call).await?;
        if values.is_empty() {
            return Err(
                LedgerError::InvalidResponse(format!("{} returned no values", function)).into(),
            );
        }
        Ok(values.swap_remove(0))
    }

    /// Read-only verification status of a researcher
    pub async fn query_verification_status(&self, researcher: &str) -> Result<bool, SubmissionError> {
        let value = self.inspect(VERIFICATION_STATUS_FN, researcher).await?;
        match value.as_slice() {
            [0] => Ok(false),
            [1] => Ok(true),
            other => Err(LedgerError::InvalidResponse(format!(
                "expected a BCS bool, got {:?}",
                other
            ))
            .into()),
        }
    }

    /// Domain ids a researcher is verified for (`vector<u64>`)
    pub async fn query_researcher_domains(
        &self,
        researcher: &str,
    ) -> Result<Vec<u64>, SubmissionError> {
        let value = self.inspect(RESEARCHER_DOMAINS_FN, researcher).await?;
        Ok(bcs::u64_vector(&value)?)
    }

    /// Review status code of a paper (`u8`)
    pub async fn query_paper_status(&self, paper_id: &str) -> Result<u8, SubmissionError> {
        let value = self.inspect(PAPER_STATUS_FN, paper_id).await?;
        match value.as_slice() {
            [status] => Ok(*status),
            other => Err(LedgerError::InvalidResponse(format!(
                "expected a BCS u8, got {:?}",
                other
            ))
            .into()),
        }
    }

    /// Citation count of a paper (`u64`)
    pub async fn query_paper_citations(&self, paper_id: &str) -> Result<u64, SubmissionError> {
        let value = self.inspect(PAPER_CITATIONS_FN, paper_id).await?;
        let (count, rest) = bcs::u64_le(&value)?;
        if !rest.is_empty() {
            return Err(LedgerError::InvalidResponse(format!(
                "{} trailing bytes after u64",
                rest.len()
            ))
            .into());
        }
        Ok(count)
    }
}

/// Minimal BCS readers for the query return types
mod bcs {
    use super::LedgerError;

    pub(super) fn u64_le(bytes: &[u8]) -> Result<(u64, &[u8]), LedgerError> {
        if bytes.len() < 8 {
            return Err(LedgerError::InvalidResponse(format!(
                "expected 8 bytes for u64, got {}",
                bytes.len()
            )));
        }
        let (head, rest) = bytes.split_at(8);
        let mut word = [0u8; 8];
        word.copy_from_slice(head);
        Ok((u64::from_le_bytes(word), rest))
    }

    /// ULEB128 length prefix
    fn uleb128(bytes: &[u8]) -> Result<(usize, &[u8]), LedgerError> {
        let mut value: u64 = 0;
        for (i, byte) in bytes.iter().enumerate().take(5) {
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                let len = u32::try_from(value).map_err(|_| {
                    LedgerError::InvalidResponse("vector length overflows u32".to_string())
                })?;
                return Ok((len as usize, &bytes[i + 1..]));
            }
        }
        Err(LedgerError::InvalidResponse(
            "malformed ULEB128 length".to_string(),
        ))
    }

    pub(super) fn u64_vector(bytes: &[u8]) -> Result<Vec<u64>, LedgerError> {
        let (len, mut rest) = uleb128(bytes)?;
        if rest.len() != len.saturating_mul(8) {
            return Err(LedgerError::InvalidResponse(format!(
                "vector<u64> of {} elements needs {} bytes, got {}",
                len,
                len.saturating_mul(8),
                rest.len()
            )));
        }
        let mut values = Vec::with_capacity(len);
        while !rest.is_empty() {
            let (value, tail) = u64_le(rest)?;
            values.push(value);
            rest = tail;
        }
        Ok(values)
    }
}

/// Ledger client that records calls instead of sending them
#[derive(Default)]
pub struct DryRunLedger {
    calls: tokio::sync::Mutex<Vec<VerifierCall>>,
}

impl DryRunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn calls(&self) -> Vec<VerifierCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl LedgerClient for DryRunLedger {
    async fn execute(&self, call: VerifierCall) -> Result<TransactionReceipt, LedgerError> {
        let digest = blake3::hash(&serde_json::to_vec(&call).map_err(|e| {
            LedgerError::InvalidResponse(e.to_string())
        })?)
        .to_hex()
        .to_string();
        self.calls.lock().await.push(call);
        Ok(TransactionReceipt {
            digest: format!("dry-run-{}", &digest[..16]),
            success: true,
            gas_used: None,
            error: None,
        })
    }

    async fn dev_inspect(&self, call: VerifierCall) -> Result<Vec<Vec<u8>>, LedgerError> {
        Err(LedgerError::Transport(format!(
            "dry run cannot inspect {}",
            call.target
        )))
    }
}
