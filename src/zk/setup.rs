// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Circuit Setup and Key Generation
//!
//! Circuit-specific Groth16 setup for each [`CircuitKind`] and the artifact
//! layout the proof generator fetches from:
//!
//! - `<program>`: JSON [`CircuitManifest`]
//! - `<proving_key>`: uncompressed arkworks `ProvingKey<Bn254>`
//! - `<verifying_key>`: uncompressed arkworks `VerifyingKey<Bn254>`
//!
//! ## Usage
//!
//! ```ignore
//! use suipeer_zk::zk::setup::{generate_keys, write_artifacts};
//!
//! let keys = generate_keys(CircuitKind::Credential, &mut rand::rngs::OsRng)?;
//! write_artifacts(&keys, Path::new("./public")).await?;
//! ```

use super::circuit::{CircuitInputs, CircuitKind};
use super::error::{ZkError, ZkResult};
use ark_bn254::Bn254;
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use chrono::{DateTime, Utc};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Manifest format version
pub const MANIFEST_VERSION: &str = "1";

/// Program descriptor stored in a circuit's `.wasm` slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitManifest {
    pub circuit: CircuitKind,
    pub version: String,
    pub public_inputs: usize,
    /// Hex blake3 digest of the serialized proving key
    pub proving_key_blake3: String,
    pub created_at: DateTime<Utc>,
}

impl CircuitManifest {
    pub fn for_proving_key(circuit: CircuitKind, proving_key_bytes: &[u8]) -> Self {
        Self {
            circuit,
            version: MANIFEST_VERSION.to_string(),
            public_inputs: circuit.public_input_count(),
            proving_key_blake3: blake3::hash(proving_key_bytes).to_hex().to_string(),
            created_at: Utc::now(),
        }
    }

    /// Check that the manifest describes `expected` and matches the fetched key bytes
    pub fn check(&self, expected: CircuitKind, proving_key_bytes: &[u8]) -> ZkResult<()> {
        if self.circuit != expected {
            return Err(ZkError::InvalidArtifact {
                circuit: expected,
                reason: format!("manifest describes {}", self.circuit),
            });
        }
        if self.version != MANIFEST_VERSION {
            return Err(ZkError::InvalidArtifact {
                circuit: expected,
                reason: format!("unsupported manifest version {}", self.version),
            });
        }
        if self.public_inputs != expected.public_input_count() {
            return Err(ZkError::InvalidArtifact {
                circuit: expected,
                reason: format!(
                    "manifest declares {} public inputs, circuit has {}",
                    self.public_inputs,
                    expected.public_input_count()
                ),
            });
        }
        let digest = blake3::hash(proving_key_bytes).to_hex().to_string();
        if digest != self.proving_key_blake3 {
            return Err(ZkError::InvalidArtifact {
                circuit: expected,
                reason: "proving key digest does not match manifest".to_string(),
            });
        }
        Ok(())
    }
}

/// Proving and verifying key for one circuit
#[derive(Clone)]
pub struct CircuitKeys {
    pub circuit: CircuitKind,
    pub proving_key: ProvingKey<Bn254>,
}

impl CircuitKeys {
    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.proving_key.vk
    }

    pub fn proving_key_bytes(&self) -> ZkResult<Vec<u8>> {
        serialize_key(self.circuit, &self.proving_key)
    }

    pub fn verifying_key_bytes(&self) -> ZkResult<Vec<u8>> {
        serialize_key(self.circuit, &self.proving_key.vk)
    }
}

impl std::fmt::Debug for CircuitKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitKeys")
            .field("circuit", &self.circuit)
            .finish_non_exhaustive()
    }
}

fn serialize_key<T: CanonicalSerialize>(circuit: CircuitKind, key: &T) -> ZkResult<Vec<u8>> {
    let mut bytes = Vec::with_capacity(key.uncompressed_size());
    key.serialize_uncompressed(&mut bytes)
        .map_err(|e| ZkError::SetupFailed {
            circuit,
            reason: e.to_string(),
        })?;
    Ok(bytes)
}

/// Run the circuit-specific Groth16 setup
pub fn generate_keys<R: RngCore + CryptoRng>(
    circuit: CircuitKind,
    rng: &mut R,
) -> ZkResult<CircuitKeys> {
    let (proving_key, _) =
        Groth16::<Bn254>::circuit_specific_setup(CircuitInputs::sample(circuit), rng).map_err(
            |e| ZkError::SetupFailed {
                circuit,
                reason: e.to_string(),
            },
        )?;
    info!("🔑 Generated Groth16 keys for {} circuit", circuit);
    Ok(CircuitKeys {
        circuit,
        proving_key,
    })
}

pub fn load_proving_key(circuit: CircuitKind, bytes: &[u8]) -> ZkResult<ProvingKey<Bn254>> {
    ProvingKey::<Bn254>::deserialize_uncompressed(bytes).map_err(|e| ZkError::InvalidArtifact {
        circuit,
        reason: format!("proving key does not deserialize: {}", e),
    })
}

pub fn load_verifying_key(circuit: CircuitKind, bytes: &[u8]) -> ZkResult<VerifyingKey<Bn254>> {
    VerifyingKey::<Bn254>::deserialize_uncompressed(bytes).map_err(|e| {
        ZkError::InvalidArtifact {
            circuit,
            reason: format!("verifying key does not deserialize: {}", e),
        }
    })
}

/// Write manifest, proving key and verifying key under `root`
pub async fn write_artifacts(keys: &CircuitKeys, root: &Path) -> ZkResult<CircuitManifest> {
    let locators = keys.circuit.locators();
    let proving_key = keys.proving_key_bytes()?;
    let verifying_key = keys.verifying_key_bytes()?;
    let manifest = CircuitManifest::for_proving_key(keys.circuit, &proving_key);

    let program_path = root.join(locators.program);
    if let Some(parent) = program_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&program_path, serde_json::to_vec_pretty(&manifest)?).await?;
    tokio::fs::write(root.join(locators.proving_key), &proving_key).await?;
    tokio::fs::write(root.join(locators.verifying_key), &verifying_key).await?;

    info!(
        "📦 Wrote {} artifacts to {} ({} byte proving key)",
        keys.circuit,
        root.display(),
        proving_key.len()
    );
    Ok(manifest)
}

/// Generate and write artifacts for every circuit
pub async fn setup_all<R: RngCore + CryptoRng>(
    root: &Path,
    rng: &mut R,
) -> ZkResult<Vec<(CircuitKind, PathBuf)>> {
    let mut written = Vec::new();
    for circuit in CircuitKind::ALL {
        let keys = generate_keys(circuit, rng)?;
        write_artifacts(&keys, root).await?;
        written.push((circuit, root.join(circuit.locators().proving_key)));
    }
    Ok(written)
}
