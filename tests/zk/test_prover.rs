// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Proof Generator Tests
//!
//! - Full credential pipeline: setup, prove, encode, verify
//! - Unsatisfiable inputs fail in production without a placeholder
//! - Development placeholder proofs never verify or reach production
//! - Timeout and cancellation

use async_trait::async_trait;
use rand::rngs::OsRng;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use suipeer_zk::config::{BuildMode, LedgerConfig, SuiNetwork};
use suipeer_zk::contracts::{DryRunLedger, SubmissionError, VerificationSubmitter};
use suipeer_zk::zk::{
    decode_proof, generate_keys, hash_credential, verify_bundle, write_artifacts, ArtifactCache,
    ArtifactSource, CircuitInputs, CircuitKind, CommitmentHasher, CredentialTuple, EducationLevel,
    FileArtifactSource, ProofEncoder, ProofGenerator, ProverConfig, ZkError, ZkResult,
};
use tokio_util::sync::CancellationToken;

async fn setup_circuit(kind: CircuitKind, root: &Path) -> ark_groth16::VerifyingKey<ark_bn254::Bn254> {
    let keys = generate_keys(kind, &mut OsRng).unwrap();
    write_artifacts(&keys, root).await.unwrap();
    keys.verifying_key().clone()
}

fn file_generator(mode: BuildMode, root: &Path) -> ProofGenerator {
    ProofGenerator::new(
        ProverConfig::new(mode),
        Arc::new(ArtifactCache::new(Arc::new(FileArtifactSource::new(root)))),
    )
}

/// Never answers within any sensible timeout
struct StalledSource;

#[async_trait]
impl ArtifactSource for StalledSource {
    async fn fetch(&self, _circuit: CircuitKind, _locator: &str) -> ZkResult<Vec<u8>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }

    fn describe(&self) -> String {
        "stalled".to_string()
    }
}

fn stalled_generator(mode: BuildMode, timeout: Duration) -> ProofGenerator {
    ProofGenerator::new(
        ProverConfig::new(mode).with_timeout(timeout),
        Arc::new(ArtifactCache::new(Arc::new(StalledSource))),
    )
}

#[tokio::test]
async fn test_credential_pipeline_verifies() {
    let dir = tempfile::tempdir().unwrap();
    let vk = setup_circuit(CircuitKind::Credential, dir.path()).await;
    let generator = file_generator(BuildMode::Production, dir.path());

    let credential = CredentialTuple::new(11, 99, EducationLevel::Master, 4);
    let commitment = hash_credential(&credential);
    let inputs = CircuitInputs::credential(credential, commitment, true, EducationLevel::Bachelor, 2, 5);

    let bundle = generator.prove(inputs).await.unwrap();
    assert!(!bundle.placeholder);
    assert_eq!(bundle.public_signals.len(), 5);
    assert_eq!(bundle.public_signals[0], commitment.to_decimal());
    assert_eq!(&bundle.public_signals[1..], ["1", "1", "2", "5"]);

    verify_bundle(&vk, &bundle).unwrap();

    let encoded = ProofEncoder::encode(&bundle).unwrap();
    assert_eq!(decode_proof(&encoded.proof_bytes).unwrap(), bundle.proof);
}

#[tokio::test]
async fn test_tampered_public_signal_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let vk = setup_circuit(CircuitKind::AnonymousReview, dir.path()).await;
    let generator = file_generator(BuildMode::Production, dir.path());

    let mut bundle = generator
        .prove(CircuitInputs::sample(CircuitKind::AnonymousReview))
        .await
        .unwrap();
    verify_bundle(&vk, &bundle).unwrap();

    bundle.public_signals[0] = "18".to_string();
    assert!(matches!(
        verify_bundle(&vk, &bundle),
        Err(ZkError::VerificationFailed { .. })
    ));
}

#[tokio::test]
async fn test_unsatisfiable_review_fails_in_production() {
    let dir = tempfile::tempdir().unwrap();
    setup_circuit(CircuitKind::AnonymousReview, dir.path()).await;
    let generator = file_generator(BuildMode::Production, dir.path());

    // Private paper id differs from the public one
    let inputs = CircuitInputs::anonymous_review(314_159, 17, 8, true, 18, 2);
    let result = generator.prove(inputs).await;
    match result {
        Err(ZkError::ProofGenerationFailed { circuit, .. }) => {
            assert_eq!(circuit, CircuitKind::AnonymousReview)
        }
        Err(other) => panic!("expected ProofGenerationFailed, got {other:?}"),
        Ok(bundle) => panic!("expected an error, got placeholder={}", bundle.placeholder),
    }
}

#[tokio::test]
async fn test_missing_artifacts_in_production() {
    let dir = tempfile::tempdir().unwrap();
    let generator = file_generator(BuildMode::Production, dir.path());
    let result = generator
        .prove(CircuitInputs::sample(CircuitKind::AnonymousReview))
        .await;
    assert!(matches!(result, Err(ZkError::CircuitAssetUnavailable { .. })));
}

#[tokio::test]
async fn test_development_placeholder_is_never_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let vk = setup_circuit(CircuitKind::AnonymousReview, dir.path()).await;
    let generator = file_generator(BuildMode::Development, dir.path());

    let inputs = CircuitInputs::anonymous_review(314_159, 17, 8, true, 18, 2);
    let bundle = generator.prove(inputs).await.unwrap();
    assert!(bundle.placeholder);
    assert_eq!(bundle.public_signals, vec!["18".to_string(), "2".to_string()]);

    assert!(matches!(
        verify_bundle(&vk, &bundle),
        Err(ZkError::VerificationFailed { .. })
    ));

    let encoded = ProofEncoder::encode(&bundle).unwrap();
    assert!(encoded.placeholder);

    let config = LedgerConfig::new(SuiNetwork::Localnet, "http://127.0.0.1:9000", "0xabc", "0xdef");
    let ledger = Arc::new(DryRunLedger::new());
    let production = VerificationSubmitter::new(ledger.clone(), config, BuildMode::Production);
    let result = production
        .submit_anonymous_review("18", &[0u8; 32], 8, true, &encoded)
        .await;
    assert!(matches!(result, Err(SubmissionError::PlaceholderRejected)));
    assert!(ledger.calls().await.is_empty());
}

#[tokio::test]
async fn test_insecure_commitment_never_reaches_prover() {
    let dir = tempfile::tempdir().unwrap();
    let generator = file_generator(BuildMode::Development, dir.path());

    let credential = CredentialTuple::new(1, 2, EducationLevel::PhD, 3);
    let commitment = CommitmentHasher::degraded("test").hash(&credential);
    let inputs = CircuitInputs::credential(credential, commitment, true, EducationLevel::Master, 1, 1);

    assert!(matches!(
        generator.prove(inputs).await,
        Err(ZkError::InsecureCommitment)
    ));
}

#[tokio::test]
async fn test_timeout() {
    let generator = stalled_generator(BuildMode::Production, Duration::from_millis(100));
    let result = generator
        .prove(CircuitInputs::sample(CircuitKind::Credential))
        .await;
    assert!(matches!(
        result,
        Err(ZkError::ProofTimeout {
            circuit: CircuitKind::Credential,
            ..
        })
    ));
}

#[tokio::test]
async fn test_timeout_gets_no_placeholder_in_development() {
    let generator = stalled_generator(BuildMode::Development, Duration::from_millis(100));
    let result = generator
        .prove(CircuitInputs::sample(CircuitKind::AnonymousReview))
        .await;
    assert!(matches!(result, Err(ZkError::ProofTimeout { .. })));
}

#[tokio::test]
async fn test_cancel_during_fetch() {
    let generator = stalled_generator(BuildMode::Development, Duration::from_secs(30));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = generator
        .prove_with_cancel(CircuitInputs::sample(CircuitKind::AnonymousReview), cancel)
        .await;
    assert!(matches!(result, Err(ZkError::ProofCancelled { .. })));
}

#[tokio::test]
async fn test_public_signals_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    setup_circuit(CircuitKind::ReviewerQualification, dir.path()).await;
    let generator = file_generator(BuildMode::Production, dir.path());

    let first = generator
        .prove(CircuitInputs::sample(CircuitKind::ReviewerQualification))
        .await
        .unwrap();
    let second = generator
        .prove(CircuitInputs::sample(CircuitKind::ReviewerQualification))
        .await
        .unwrap();

    assert_eq!(first.public_signals, second.public_signals);
    // Groth16 proofs are randomized
    assert_ne!(first.proof, second.proof);
    assert_eq!(generator.artifacts().fetch_count(), 1);
}
