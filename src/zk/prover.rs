// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Groth16 Proof Generation
//!
//! [`ProofGenerator`] fetches a circuit's artifacts through the shared
//! [`ArtifactCache`], checks the inputs against the circuit and proves on the
//! blocking thread pool. Every run is bounded by [`ProverConfig::timeout`]
//! and can be cancelled through a [`CancellationToken`]; a cancelled run
//! never yields a bundle.
//!
//! In [`BuildMode::Development`] a failed `AnonymousReview` proof is replaced
//! by a placeholder bundle (flagged `placeholder = true`) so local review
//! submission keeps working without artifacts. Production never does this.

use super::artifacts::ArtifactCache;
use super::circuit::{check_satisfied, CircuitInputs, CircuitKind};
use super::error::{ZkError, ZkResult};
use super::field::field_to_decimal;
use crate::config::{BuildMode, ZkConfig, DEFAULT_PROOF_TIMEOUT_SECS, MAX_PROOF_TIMEOUT_SECS};
use ark_bn254::{Bn254, G1Affine, G2Affine};
use ark_groth16::{Groth16, Proof, ProvingKey};
use ark_snark::SNARK;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Coordinate used by development placeholder proofs
pub const PLACEHOLDER_COORDINATE: &str = "12345678901234567890";

#[derive(Debug, Clone, Copy)]
pub struct ProverConfig {
    pub build_mode: BuildMode,
    pub timeout: Duration,
}

impl ProverConfig {
    pub fn new(build_mode: BuildMode) -> Self {
        Self {
            build_mode,
            timeout: Duration::from_secs(DEFAULT_PROOF_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reject timeouts that would fail every run or never bound one
    pub fn validate(&self) -> ZkResult<()> {
        if self.timeout.is_zero() {
            return Err(ZkError::InvalidConfig {
                reason: "proof timeout must be > 0".to_string(),
            });
        }
        if self.timeout > Duration::from_secs(MAX_PROOF_TIMEOUT_SECS) {
            return Err(ZkError::InvalidConfig {
                reason: format!("proof timeout too large (max {}s)", MAX_PROOF_TIMEOUT_SECS),
            });
        }
        Ok(())
    }
}

impl From<&ZkConfig> for ProverConfig {
    fn from(config: &ZkConfig) -> Self {
        Self {
            build_mode: config.build_mode,
            timeout: config.proof_timeout,
        }
    }
}

/// Groth16 proof in snarkjs JSON layout (projective coordinates, decimal strings)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    pub pi_a: Vec<String>,
    pub pi_b: Vec<Vec<String>>,
    pub pi_c: Vec<String>,
    pub protocol: String,
    pub curve: String,
}

impl Groth16Proof {
    pub fn from_ark(proof: &Proof<Bn254>) -> Self {
        Self {
            pi_a: g1_to_strings(&proof.a),
            pi_b: g2_to_strings(&proof.b),
            pi_c: g1_to_strings(&proof.c),
            protocol: "groth16".to_string(),
            curve: "bn128".to_string(),
        }
    }

    fn placeholder() -> Self {
        let c = || PLACEHOLDER_COORDINATE.to_string();
        Self {
            pi_a: vec![c(), c(), "1".to_string()],
            pi_b: vec![
                vec![c(), c()],
                vec![c(), c()],
                vec!["1".to_string(), "0".to_string()],
            ],
            pi_c: vec![c(), c(), "1".to_string()],
            protocol: "groth16".to_string(),
            curve: "bn128".to_string(),
        }
    }
}

fn g1_to_strings(point: &G1Affine) -> Vec<String> {
    if point.infinity {
        return vec!["0".to_string(), "1".to_string(), "0".to_string()];
    }
    vec![
        field_to_decimal(&point.x),
        field_to_decimal(&point.y),
        "1".to_string(),
    ]
}

fn g2_to_strings(point: &G2Affine) -> Vec<Vec<String>> {
    if point.infinity {
        return vec![
            vec!["0".to_string(), "0".to_string()],
            vec!["1".to_string(), "0".to_string()],
            vec!["0".to_string(), "0".to_string()],
        ];
    }
    vec![
        vec![field_to_decimal(&point.x.c0), field_to_decimal(&point.x.c1)],
        vec![field_to_decimal(&point.y.c0), field_to_decimal(&point.y.c1)],
        vec!["1".to_string(), "0".to_string()],
    ]
}

/// A proof plus the public signals it was produced against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkProofBundle {
    pub circuit: CircuitKind,
    pub proof: Groth16Proof,
    #[serde(rename = "publicSignals")]
    pub public_signals: Vec<String>,
    /// Development-only stand-in that no verifier accepts
    #[serde(default)]
    pub placeholder: bool,
}

impl ZkProofBundle {
    /// Build a bundle from snarkjs `proof.json` / `public.json` documents
    pub fn from_snarkjs_json(
        circuit: CircuitKind,
        proof_json: &str,
        public_json: &str,
    ) -> ZkResult<Self> {
        Ok(Self {
            circuit,
            proof: serde_json::from_str(proof_json)?,
            public_signals: serde_json::from_str(public_json)?,
            placeholder: false,
        })
    }

    fn placeholder_for(inputs: &CircuitInputs) -> Self {
        Self {
            circuit: inputs.kind(),
            proof: Groth16Proof::placeholder(),
            public_signals: public_signal_strings(inputs),
            placeholder: true,
        }
    }
}

fn public_signal_strings(inputs: &CircuitInputs) -> Vec<String> {
    inputs
        .public_signals()
        .iter()
        .map(field_to_decimal)
        .collect()
}

/// Prove `inputs` with an already loaded proving key, on the current thread
pub fn prove_with_key(
    proving_key: &ProvingKey<Bn254>,
    inputs: CircuitInputs,
) -> ZkResult<ZkProofBundle> {
    let circuit = inputs.kind();
    check_satisfied(&inputs)?;

    let public_signals = public_signal_strings(&inputs);
    let proof = Groth16::<Bn254>::prove(proving_key, inputs, &mut OsRng)
        .map_err(|e| ZkError::proof_generation_failed(circuit, e.to_string()))?;

    Ok(ZkProofBundle {
        circuit,
        proof: Groth16Proof::from_ark(&proof),
        public_signals,
        placeholder: false,
    })
}

pub struct ProofGenerator {
    config: ProverConfig,
    artifacts: Arc<ArtifactCache>,
}

impl ProofGenerator {
    pub fn new(config: ProverConfig, artifacts: Arc<ArtifactCache>) -> Self {
        Self { config, artifacts }
    }

    /// Build from runtime configuration, refusing out-of-range settings
    pub fn from_config(config: &ZkConfig, artifacts: Arc<ArtifactCache>) -> ZkResult<Self> {
        let config = ProverConfig::from(config);
        config.validate()?;
        Ok(Self::new(config, artifacts))
    }

    pub fn config(&self) -> &ProverConfig {
        &self.config
    }

    pub fn artifacts(&self) -> &Arc<ArtifactCache> {
        &self.artifacts
    }

    pub async fn prove(&self, inputs: CircuitInputs) -> ZkResult<ZkProofBundle> {
        self.prove_with_cancel(inputs, CancellationToken::new()).await
    }

    pub async fn prove_with_cancel(
        &self,
        inputs: CircuitInputs,
        cancel: CancellationToken,
    ) -> ZkResult<ZkProofBundle> {
        let circuit = inputs.kind();
        inputs.validate()?;

        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ZkError::ProofCancelled { circuit }),
            timed = tokio::time::timeout(self.config.timeout, self.generate(inputs.clone(), cancel.clone())) => {
                timed.unwrap_or(Err(ZkError::ProofTimeout {
                    circuit,
                    seconds: self.config.timeout.as_secs(),
                }))
            }
        };

        if cancel.is_cancelled() {
            debug!("Discarding {} proof result after cancellation", circuit);
            return Err(ZkError::ProofCancelled { circuit });
        }

        match outcome {
            Ok(bundle) => {
                info!(
                    "✅ Generated {} proof in {}ms",
                    circuit,
                    started.elapsed().as_millis()
                );
                Ok(bundle)
            }
            Err(e) if self.placeholder_allowed(circuit, &e) => {
                warn!(
                    "⚠️  {} proof failed ({}); substituting development placeholder proof",
                    circuit, e
                );
                Ok(ZkProofBundle::placeholder_for(&inputs))
            }
            Err(e) => {
                warn!("❌ {} proof failed: {}", circuit, e);
                Err(e)
            }
        }
    }

    fn placeholder_allowed(&self, circuit: CircuitKind, error: &ZkError) -> bool {
        circuit == CircuitKind::AnonymousReview
            && self.config.build_mode.allows_placeholder_proofs()
            && matches!(
                error,
                ZkError::ProofGenerationFailed { .. }
                    | ZkError::CircuitAssetUnavailable { .. }
                    | ZkError::InvalidArtifact { .. }
            )
    }

    async fn generate(
        &self,
        inputs: CircuitInputs,
        cancel: CancellationToken,
    ) -> ZkResult<ZkProofBundle> {
        let circuit = inputs.kind();
        let artifacts = self.artifacts.get(circuit).await?;

        let task = tokio::task::spawn_blocking(move || {
            if cancel.is_cancelled() {
                return Err(ZkError::ProofCancelled { circuit });
            }
            let bundle = prove_with_key(&artifacts.proving_key, inputs)?;
            if cancel.is_cancelled() {
                return Err(ZkError::ProofCancelled { circuit });
            }
            Ok(bundle)
        });

        task.await
            .map_err(|e| ZkError::proof_generation_failed(circuit, format!("proving task failed: {}", e)))?
    }
}
