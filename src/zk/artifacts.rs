// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Circuit Artifact Loading
//!
//! Fetches a circuit's manifest and proving key from an [`ArtifactSource`]
//! and keeps the parsed result for the lifetime of the process. Concurrent
//! requests for the same uncached circuit share a single fetch.

use super::circuit::CircuitKind;
use super::error::{ZkError, ZkResult};
use super::setup::{load_proving_key, CircuitManifest};
use crate::config::ArtifactLocation;
use ark_bn254::Bn254;
use ark_groth16::{ProvingKey, VerifyingKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};
use url::Url;

/// Where circuit artifacts come from
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Fetch the raw bytes at `locator` for `circuit`
    async fn fetch(&self, circuit: CircuitKind, locator: &str) -> ZkResult<Vec<u8>>;

    fn describe(&self) -> String;
}

/// Static HTTP(S) artifact host
pub struct HttpArtifactSource {
    client: reqwest::Client,
    base: Url,
}

impl HttpArtifactSource {
    pub fn new(base: Url) -> ZkResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ZkError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        Ok(Self::with_client(client, base))
    }

    pub fn with_client(client: reqwest::Client, mut base: Url) -> Self {
        // Url::join drops the last path segment unless the base ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { client, base }
    }
}

#[async_trait]
impl ArtifactSource for HttpArtifactSource {
    async fn fetch(&self, circuit: CircuitKind, locator: &str) -> ZkResult<Vec<u8>> {
        let url = self
            .base
            .join(locator)
            .map_err(|e| ZkError::asset_unavailable(circuit, locator, e.to_string()))?;

        debug!("Fetching {} artifact from {}", circuit, url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ZkError::asset_unavailable(circuit, locator, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ZkError::asset_unavailable(
                circuit,
                locator,
                format!("GET {} returned {}", url, status),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ZkError::asset_unavailable(circuit, locator, e.to_string()))?;
        Ok(body.to_vec())
    }

    fn describe(&self) -> String {
        self.base.to_string()
    }
}

/// Artifacts on the local filesystem
pub struct FileArtifactSource {
    root: PathBuf,
}

impl FileArtifactSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactSource for FileArtifactSource {
    async fn fetch(&self, circuit: CircuitKind, locator: &str) -> ZkResult<Vec<u8>> {
        let path = self.root.join(locator);
        tokio::fs::read(&path).await.map_err(|e| {
            ZkError::asset_unavailable(circuit, locator, format!("{}: {}", path.display(), e))
        })
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Parsed artifacts of one circuit
pub struct CircuitArtifacts {
    pub circuit: CircuitKind,
    pub manifest: CircuitManifest,
    pub proving_key: ProvingKey<Bn254>,
}

impl CircuitArtifacts {
    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.proving_key.vk
    }
}

/// Process-wide artifact cache keyed by circuit
pub struct ArtifactCache {
    source: Arc<dyn ArtifactSource>,
    cells: Mutex<HashMap<CircuitKind, Arc<OnceCell<Arc<CircuitArtifacts>>>>>,
    fetches: AtomicU64,
}

impl ArtifactCache {
    pub fn new(source: Arc<dyn ArtifactSource>) -> Self {
        Self {
            source,
            cells: Mutex::new(HashMap::new()),
            fetches: AtomicU64::new(0),
        }
    }

    pub fn from_location(location: &ArtifactLocation) -> ZkResult<Self> {
        let source: Arc<dyn ArtifactSource> = match location {
            ArtifactLocation::Http(url) => Arc::new(HttpArtifactSource::new(url.clone())?),
            ArtifactLocation::Directory(dir) => Arc::new(FileArtifactSource::new(dir.clone())),
        };
        Ok(Self::new(source))
    }

    /// Artifacts for `circuit`, fetching them on first use
    ///
    /// A failed fetch is not cached; the next call tries again.
    pub async fn get(&self, circuit: CircuitKind) -> ZkResult<Arc<CircuitArtifacts>> {
        let cell = {
            let mut cells = self.cells.lock().await;
            cells.entry(circuit).or_default().clone()
        };

        cell.get_or_try_init(|| self.load(circuit))
            .await
            .map(Arc::clone)
    }

    pub async fn is_cached(&self, circuit: CircuitKind) -> bool {
        let cells = self.cells.lock().await;
        cells
            .get(&circuit)
            .map(|cell| cell.initialized())
            .unwrap_or(false)
    }

    /// Number of artifact loads that reached the source
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn source(&self) -> String {
        self.source.describe()
    }

    /// Load every circuit, logging failures instead of returning them
    pub async fn preload_all(&self) -> usize {
        let mut loaded = 0;
        for circuit in CircuitKind::ALL {
            match self.get(circuit).await {
                Ok(_) => loaded += 1,
                Err(e) => warn!("⚠️  Could not preload {} artifacts: {}", circuit, e),
            }
        }
        loaded
    }

    async fn load(&self, circuit: CircuitKind) -> ZkResult<Arc<CircuitArtifacts>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let locators = circuit.locators();

        let (program, key_bytes) = tokio::try_join!(
            self.source.fetch(circuit, locators.program),
            self.source.fetch(circuit, locators.proving_key),
        )?;

        let manifest: CircuitManifest =
            serde_json::from_slice(&program).map_err(|e| ZkError::InvalidArtifact {
                circuit,
                reason: format!("program descriptor is not a manifest: {}", e),
            })?;
        manifest.check(circuit, &key_bytes)?;

        let size = key_bytes.len();
        let proving_key = tokio::task::spawn_blocking(move || load_proving_key(circuit, &key_bytes))
            .await
            .map_err(|e| ZkError::InvalidArtifact {
                circuit,
                reason: format!("key loading task failed: {}", e),
            })??;

        info!(
            "✅ Loaded {} artifacts from {} ({} bytes)",
            circuit,
            self.source.describe(),
            size
        );
        Ok(Arc::new(CircuitArtifacts {
            circuit,
            manifest,
            proving_key,
        }))
    }
}
