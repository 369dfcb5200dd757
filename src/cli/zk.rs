// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Args;
use rand::rngs::OsRng;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ZkConfig;
use crate::contracts::{DryRunLedger, VerificationSubmitter, VerifierTarget};
use crate::zk::{
    generate_keys, setup::load_verifying_key, verify_bundle, write_artifacts, ArtifactCache,
    CircuitInputs, CircuitKind, CommitmentHasher, CredentialTuple, EducationLevel, ProofEncoder,
    ProofGenerator, ZkProofBundle, PROOF_WIRE_FORMAT,
};

/// Arguments for hash command
#[derive(Args, Debug)]
pub struct HashArgs {
    #[arg(long)]
    pub institution: u64,

    #[arg(long)]
    pub researcher: u64,

    /// 1 = Bachelor, 2 = Master, 3 = PhD
    #[arg(long)]
    pub education: u64,

    #[arg(long)]
    pub years: u64,
}

/// Arguments for setup command
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Artifact root directory
    #[arg(long, default_value = "./public")]
    pub out: PathBuf,

    /// Only set up this circuit (default: all)
    #[arg(long)]
    pub circuit: Option<CircuitKind>,
}

/// Arguments for prove command
#[derive(Args, Debug)]
pub struct ProveArgs {
    /// JSON file with tagged circuit inputs
    #[arg(long)]
    pub inputs: PathBuf,

    /// Write the bundle here instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Arguments for encode command
#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[arg(long)]
    pub bundle: PathBuf,
}

/// Arguments for verify command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[arg(long)]
    pub bundle: PathBuf,

    /// Verifying key written by `setup`
    #[arg(long)]
    pub vkey: PathBuf,
}

/// Arguments for submit command
#[derive(Args, Debug)]
pub struct SubmitArgs {
    #[arg(long)]
    pub bundle: PathBuf,

    /// Researcher id (credential proofs)
    #[arg(long, conflicts_with = "paper")]
    pub researcher: Option<String>,

    /// Paper id (anonymous review proofs)
    #[arg(long, requires = "score")]
    pub paper: Option<String>,

    /// Review content, hashed with sha256
    #[arg(long, default_value = "")]
    pub content: String,

    #[arg(long)]
    pub score: Option<u64>,

    #[arg(long)]
    pub approved: bool,
}

async fn read_bundle(path: &PathBuf) -> Result<ZkProofBundle> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

pub async fn hash(args: HashArgs) -> Result<()> {
    let tuple = CredentialTuple::new(
        args.institution,
        args.researcher,
        EducationLevel::try_from(args.education)?,
        args.years,
    );
    let commitment = CommitmentHasher::new().hash(&tuple);
    if !commitment.is_secure() {
        warn!("Commitment is NOT secure and must not be submitted");
    }
    println!("{}", commitment);
    Ok(())
}

pub async fn setup(args: SetupArgs) -> Result<()> {
    let circuits: Vec<CircuitKind> = match args.circuit {
        Some(circuit) => vec![circuit],
        None => CircuitKind::ALL.to_vec(),
    };
    for circuit in circuits {
        let keys = tokio::task::spawn_blocking(move || generate_keys(circuit, &mut OsRng)).await??;
        let manifest = write_artifacts(&keys, &args.out).await?;
        println!(
            "{}: {} public inputs, proving key {}",
            circuit, manifest.public_inputs, manifest.proving_key_blake3
        );
    }
    Ok(())
}

pub async fn prove(args: ProveArgs, config: &ZkConfig) -> Result<()> {
    let raw = tokio::fs::read(&args.inputs)
        .await
        .with_context(|| format!("reading {}", args.inputs.display()))?;
    let inputs: CircuitInputs = serde_json::from_slice(&raw)?;

    let cache = Arc::new(ArtifactCache::from_location(&config.artifacts)?);
    info!("Using circuit artifacts from {}", cache.source());
    let generator = ProofGenerator::from_config(config, cache)?;

    let bundle = generator
        .prove(inputs)
        .await
        .map_err(|e| anyhow!("{}", e.user_message()).context(e.to_string()))?;
    let json = serde_json::to_string_pretty(&bundle)?;
    match args.out {
        Some(path) => tokio::fs::write(&path, json).await?,
        None => println!("{}", json),
    }
    Ok(())
}

pub async fn encode(args: EncodeArgs) -> Result<()> {
    let bundle = read_bundle(&args.bundle).await?;
    let encoded = ProofEncoder::encode(&bundle)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "format": PROOF_WIRE_FORMAT,
            "circuit": encoded.circuit,
            "proof": String::from_utf8_lossy(&encoded.proof_bytes),
            "proofHex": encoded.proof_hex(),
            "publicInputs": String::from_utf8_lossy(&encoded.public_input_bytes),
            "publicInputsHex": encoded.public_inputs_hex(),
            "placeholder": encoded.placeholder,
        }))?
    );
    Ok(())
}

pub async fn verify(args: VerifyArgs) -> Result<()> {
    let bundle = read_bundle(&args.bundle).await?;
    let bytes = tokio::fs::read(&args.vkey).await?;
    let vk = load_verifying_key(bundle.circuit, &bytes)?;
    verify_bundle(&vk, &bundle)?;
    println!("✅ {} proof is valid", bundle.circuit);
    Ok(())
}

pub async fn submit(args: SubmitArgs, config: &ZkConfig) -> Result<()> {
    let bundle = read_bundle(&args.bundle).await?;
    let encoded = ProofEncoder::encode(&bundle)?;

    let target = match (args.researcher, args.paper, args.score) {
        (Some(researcher), None, _) => VerifierTarget::ResearcherCredential { researcher },
        (None, Some(paper_id), Some(score)) => {
            use sha2::{Digest, Sha256};
            VerifierTarget::AnonymousReview {
                paper_id,
                review_content_hash: Sha256::digest(args.content.as_bytes()).to_vec(),
                score,
                approved: args.approved,
            }
        }
        _ => return Err(anyhow!("pass either --researcher or --paper with --score")),
    };

    let submitter = VerificationSubmitter::new(
        Arc::new(DryRunLedger::new()),
        config.ledger.clone(),
        config.build_mode,
    );
    let call = submitter.build_call(&encoded, &target)?;
    println!("{}", serde_json::to_string_pretty(&call)?);
    Ok(())
}
