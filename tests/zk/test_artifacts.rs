// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Circuit Artifact Tests
//!
//! - Non-success HTTP status surfaces as CircuitAssetUnavailable
//! - Artifacts served over HTTP load and verify against the manifest
//! - Concurrent first requests share one fetch

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use rand::rngs::OsRng;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use suipeer_zk::zk::{
    generate_keys, write_artifacts, ArtifactCache, ArtifactSource, CircuitKind,
    FileArtifactSource, HttpArtifactSource, ZkError, ZkResult,
};
use url::Url;

type Files = Arc<HashMap<String, Vec<u8>>>;

async fn serve_file(State(files): State<Files>, Path(path): Path<String>) -> (StatusCode, Vec<u8>) {
    match files.get(&path) {
        Some(bytes) => (StatusCode::OK, bytes.clone()),
        None => (StatusCode::NOT_FOUND, Vec::new()),
    }
}

/// Serve `files` (keyed by path relative to the root) on an ephemeral port
async fn spawn_server(files: HashMap<String, Vec<u8>>) -> SocketAddr {
    let app = Router::new()
        .route("/*path", get(serve_file))
        .with_state(Arc::new(files));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn http_cache(addr: SocketAddr) -> ArtifactCache {
    let base = Url::parse(&format!("http://{}/", addr)).unwrap();
    ArtifactCache::new(Arc::new(HttpArtifactSource::new(base).unwrap()))
}

#[tokio::test]
async fn test_not_found_is_circuit_asset_unavailable() {
    let addr = spawn_server(HashMap::new()).await;
    let cache = http_cache(addr);

    let err = cache.get(CircuitKind::Credential).await.err().unwrap();
    assert!(err.is_retryable());
    match err {
        ZkError::CircuitAssetUnavailable { circuit, reason, .. } => {
            assert_eq!(circuit, CircuitKind::Credential);
            assert!(reason.contains("404"), "reason was: {}", reason);
        }
        other => panic!("expected CircuitAssetUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_artifacts_load() {
    let dir = tempfile::tempdir().unwrap();
    let keys = generate_keys(CircuitKind::AnonymousReview, &mut OsRng).unwrap();
    write_artifacts(&keys, dir.path()).await.unwrap();

    let locators = CircuitKind::AnonymousReview.locators();
    let mut files = HashMap::new();
    for locator in [locators.program, locators.proving_key] {
        files.insert(
            locator.to_string(),
            std::fs::read(dir.path().join(locator)).unwrap(),
        );
    }
    let addr = spawn_server(files).await;
    let cache = http_cache(addr);

    let artifacts = cache.get(CircuitKind::AnonymousReview).await.unwrap();
    assert_eq!(artifacts.manifest.circuit, CircuitKind::AnonymousReview);
    assert_eq!(artifacts.verifying_key(), keys.verifying_key());
    assert!(cache.is_cached(CircuitKind::AnonymousReview).await);
}

#[tokio::test]
async fn test_manifest_for_wrong_circuit_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let keys = generate_keys(CircuitKind::AnonymousReview, &mut OsRng).unwrap();
    write_artifacts(&keys, dir.path()).await.unwrap();

    // Put the anonymous review artifacts where the credential circuit looks
    let from = CircuitKind::AnonymousReview.locators();
    let to = CircuitKind::Credential.locators();
    std::fs::copy(dir.path().join(from.program), dir.path().join(to.program)).unwrap();
    std::fs::copy(dir.path().join(from.proving_key), dir.path().join(to.proving_key)).unwrap();

    let cache = ArtifactCache::new(Arc::new(FileArtifactSource::new(dir.path())));
    assert!(matches!(
        cache.get(CircuitKind::Credential).await,
        Err(ZkError::InvalidArtifact { .. })
    ));
}

struct CountingSource {
    inner: FileArtifactSource,
    fetches: AtomicUsize,
}

#[async_trait]
impl ArtifactSource for CountingSource {
    async fn fetch(&self, circuit: CircuitKind, locator: &str) -> ZkResult<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.inner.fetch(circuit, locator).await
    }

    fn describe(&self) -> String {
        "counting".to_string()
    }
}

#[tokio::test]
async fn test_concurrent_requests_coalesce() {
    let dir = tempfile::tempdir().unwrap();
    let keys = generate_keys(CircuitKind::AnonymousReview, &mut OsRng).unwrap();
    write_artifacts(&keys, dir.path()).await.unwrap();

    let source = Arc::new(CountingSource {
        inner: FileArtifactSource::new(dir.path()),
        fetches: AtomicUsize::new(0),
    });
    let cache = Arc::new(ArtifactCache::new(source.clone()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(CircuitKind::AnonymousReview).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    // One manifest fetch and one proving key fetch
    assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    assert_eq!(cache.fetch_count(), 1);

    // Cached from here on
    cache.get(CircuitKind::AnonymousReview).await.unwrap();
    assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_preload_all_reports_loaded_count() {
    let dir = tempfile::tempdir().unwrap();
    let keys = generate_keys(CircuitKind::AnonymousReview, &mut OsRng).unwrap();
    write_artifacts(&keys, dir.path()).await.unwrap();

    let cache = ArtifactCache::new(Arc::new(FileArtifactSource::new(dir.path())));
    assert_eq!(cache.preload_all().await, 1);
}
